//! Analysis layer
//!
//! Turns raw OCR text into structured label fields and checks them
//! against the Legal Metrology rule set. Both steps are pure functions;
//! all I/O lives in the orchestration and remote layers.

pub mod fields;
pub mod rules;

pub use fields::{extract, ExtractedFields};
pub use rules::{validate, ComplianceSummary, RuleKey, RuleResult};

/// Run extraction and rule evaluation over raw OCR text in one step.
pub fn analyze(raw_text: &str) -> (ExtractedFields, Vec<RuleResult>, ComplianceSummary) {
    let fields = extract(raw_text);
    let (results, summary) = validate(&fields);
    (fields, results, summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_wires_extraction_into_validation() {
        let (fields, results, summary) = analyze("MRP ₹99 Net Qty: 100 g helpline 1800-425-1234");

        assert_eq!(fields.mrp.as_deref(), Some("₹99"));
        assert_eq!(results.len(), 10);
        assert!(!summary.compliant);
        assert!(summary.violations.contains(&RuleKey::GenericNamePresent));
        assert!(!summary.violations.contains(&RuleKey::MrpPresent));
    }
}
