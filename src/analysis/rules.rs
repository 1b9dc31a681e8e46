//! Legal Metrology rule evaluation
//!
//! Checks a structured field record against the fixed labeling rule set
//! and produces per-rule pass/fail results plus an aggregate compliance
//! summary. Evaluation is pure and deterministic; a rule that cannot
//! confirm its condition fails, it never raises.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::analysis::fields::ExtractedFields;

/// Confidence attached to a passing rule. A fixed heuristic constant,
/// not a calibrated probability.
pub const PASS_CONFIDENCE: f64 = 0.95;
/// Confidence attached to a failing rule.
pub const FAIL_CONFIDENCE: f64 = 0.70;

/// Unit codes accepted by the net-quantity unit rule.
pub const VALID_UNITS: [&str; 7] = ["g", "kg", "ml", "L", "cm", "m", "pcs"];

/// Identifier of one labeling rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKey {
    ManufacturerAddressPresent,
    GenericNamePresent,
    NetQuantityPresent,
    NetQuantityNumeric,
    NetQuantityUnitValid,
    MonthYearPresent,
    MrpPresent,
    MrpFormatValid,
    MrpProminentInText,
    ConsumerCarePresent,
}

impl RuleKey {
    /// All rules in evaluation order. This order determines the ordering
    /// of `ComplianceSummary::violations`.
    pub const ALL: [RuleKey; 10] = [
        RuleKey::ManufacturerAddressPresent,
        RuleKey::GenericNamePresent,
        RuleKey::NetQuantityPresent,
        RuleKey::NetQuantityNumeric,
        RuleKey::NetQuantityUnitValid,
        RuleKey::MonthYearPresent,
        RuleKey::MrpPresent,
        RuleKey::MrpFormatValid,
        RuleKey::MrpProminentInText,
        RuleKey::ConsumerCarePresent,
    ];

    /// Stable snake_case identifier for this rule.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKey::ManufacturerAddressPresent => "manufacturer_address_present",
            RuleKey::GenericNamePresent => "generic_name_present",
            RuleKey::NetQuantityPresent => "net_quantity_present",
            RuleKey::NetQuantityNumeric => "net_quantity_numeric",
            RuleKey::NetQuantityUnitValid => "net_quantity_unit_valid",
            RuleKey::MonthYearPresent => "month_year_present",
            RuleKey::MrpPresent => "mrp_present",
            RuleKey::MrpFormatValid => "mrp_format_valid",
            RuleKey::MrpProminentInText => "mrp_prominent_in_text",
            RuleKey::ConsumerCarePresent => "consumer_care_present",
        }
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of evaluating a single rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    /// Rule that was evaluated
    pub rule_key: RuleKey,
    /// Whether the rule passed
    pub passed: bool,
    /// Fixed heuristic confidence for this outcome
    pub confidence: f64,
}

/// Aggregate compliance summary over all rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceSummary {
    /// True iff no rule failed
    pub compliant: bool,
    /// Keys of all failed rules, in rule evaluation order
    pub violations: Vec<RuleKey>,
    /// Number of failed rules
    pub violation_count: usize,
}

fn numeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+(?:\.[0-9]+)?$").expect("numeric pattern"))
}

fn rs_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\brs\b").expect("rs token pattern"))
}

/// Evaluate the full rule set against a field record.
///
/// Returns the per-rule results in evaluation order together with the
/// derived summary. `compliant` holds exactly when `violations` is empty.
pub fn validate(fields: &ExtractedFields) -> (Vec<RuleResult>, ComplianceSummary) {
    let results: Vec<RuleResult> = RuleKey::ALL
        .iter()
        .map(|&rule_key| {
            let passed = rule_passes(rule_key, fields);
            RuleResult {
                rule_key,
                passed,
                confidence: if passed { PASS_CONFIDENCE } else { FAIL_CONFIDENCE },
            }
        })
        .collect();

    let violations: Vec<RuleKey> = results
        .iter()
        .filter(|r| !r.passed)
        .map(|r| r.rule_key)
        .collect();

    let summary = ComplianceSummary {
        compliant: violations.is_empty(),
        violation_count: violations.len(),
        violations,
    };

    (results, summary)
}

fn rule_passes(rule: RuleKey, fields: &ExtractedFields) -> bool {
    match rule {
        RuleKey::ManufacturerAddressPresent => {
            fields.manufacturer_name.is_some() || fields.manufacturer_address.is_some()
        }
        RuleKey::GenericNamePresent => fields.generic_name.is_some(),
        RuleKey::NetQuantityPresent => fields.net_quantity.is_some(),
        RuleKey::NetQuantityNumeric => fields
            .net_quantity
            .as_deref()
            .is_some_and(|qty| numeric_re().is_match(qty)),
        RuleKey::NetQuantityUnitValid => fields
            .unit
            .as_deref()
            .is_some_and(|unit| VALID_UNITS.contains(&unit)),
        RuleKey::MonthYearPresent => fields.month_year.is_some(),
        RuleKey::MrpPresent => fields.mrp.is_some(),
        RuleKey::MrpFormatValid => fields
            .mrp
            .as_deref()
            .is_some_and(|mrp| mrp.chars().any(|c| c.is_ascii_digit())),
        RuleKey::MrpProminentInText => mrp_prominent(&fields.raw_text),
        RuleKey::ConsumerCarePresent => fields.consumer_care.is_some(),
    }
}

/// An MRP declaration counts as prominent when the full text mentions
/// `mrp`, `price`, the rupee symbol, or a standalone `rs` token.
fn mrp_prominent(raw_text: &str) -> bool {
    let lower = raw_text.to_lowercase();
    lower.contains("mrp")
        || lower.contains("price")
        || raw_text.contains('₹')
        || rs_token_re().is_match(raw_text)
}
