//! Label field extraction
//!
//! Parses raw OCR text into a structured record of label fields using
//! pattern recognition and normalization. Extraction is pure and
//! infallible: a field that cannot be recognized is simply absent.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Structured fields recognized on a product label.
///
/// Every optional field is either absent (no match) or a non-empty string
/// in its normalized shape. `raw_text` always equals the exact OCR input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractedFields {
    /// Product's common name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic_name: Option<String>,
    /// Maximum retail price, may retain a currency marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrp: Option<String>,
    /// Declared quantity magnitude only, no unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_quantity: Option<String>,
    /// Canonical unit code (g, kg, ml, L, cm, m, pcs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Manufacturer, packer or importer name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer_name: Option<String>,
    /// Address line adjacent to the manufacturer name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer_address: Option<String>,
    /// Month/year of manufacture, normalized MM/YYYY
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month_year: Option<String>,
    /// Consumer care phone number, toll-free or 10-digit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_care: Option<String>,
    /// Verbatim OCR input, retained for provenance and full-text rules
    pub raw_text: String,
}

fn mrp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:₹|rs\.?)\s*([0-9]{1,5}(?:[.,][0-9]{2})?)").expect("mrp pattern")
    })
}

fn quantity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)([0-9]{1,4}(?:,[0-9]{3})*(?:\.[0-9]{1,2})?)\s*(kg|grams?|g|ml|lt|liters?|litres?|l|pcs|pieces?)\b",
        )
        .expect("quantity pattern")
    })
}

fn month_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(0[1-9]|1[0-2])\s*[/.\-]\s*((?:19|20)[0-9]{2})\b").expect("date pattern")
    })
}

fn toll_free_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b1[89]00[\- ]?[0-9]{3}[\- ]?[0-9]{3,4}\b").expect("toll-free pattern"))
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[0-9]{10}\b").expect("phone pattern"))
}

fn manufacturer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)manufact|mfg by|packer|importer").expect("manufacturer pattern"))
}

fn label_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^:]*:\s*").expect("label prefix pattern"))
}

fn generic_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)name:\s*(.+)").expect("generic name pattern"))
}

/// Extract structured label fields from raw OCR text.
///
/// Each field is recognized independently; a missing match for one field
/// never blocks extraction of another. All matches are first-match-wins.
pub fn extract(raw_text: &str) -> ExtractedFields {
    let (manufacturer_name, manufacturer_address) = extract_manufacturer(raw_text);
    let (net_quantity, unit) = match extract_quantity(raw_text) {
        Some((qty, unit)) => (Some(qty), Some(unit)),
        None => (None, None),
    };

    ExtractedFields {
        generic_name: extract_generic_name(raw_text),
        mrp: extract_mrp(raw_text),
        net_quantity,
        unit,
        manufacturer_name,
        manufacturer_address,
        month_year: extract_month_year(raw_text),
        consumer_care: extract_consumer_care(raw_text),
        raw_text: raw_text.to_string(),
    }
}

/// Recognize an MRP declaration: rupee symbol or Rs/Rs. prefix followed by
/// an amount with up to 5 integer digits and an optional 2-digit decimal
/// part. Output is normalized to `₹<amount>` when the rupee symbol was
/// present in the matched span.
fn extract_mrp(text: &str) -> Option<String> {
    let caps = mrp_re().captures(text)?;
    let span = caps.get(0)?.as_str();
    let amount = caps.get(1)?.as_str();

    if span.contains('₹') {
        Some(format!("₹{amount}"))
    } else {
        Some(span.trim().to_string())
    }
}

/// Recognize a quantity declaration and split it into a bare magnitude
/// (thousands separators stripped) and a canonical unit code.
fn extract_quantity(text: &str) -> Option<(String, String)> {
    let caps = quantity_re().captures(text)?;
    let magnitude = caps.get(1)?.as_str().replace(',', "");
    let unit = canonical_unit(caps.get(2)?.as_str());
    Some((magnitude, unit))
}

/// Map a recognized unit token to its canonical code. Unrecognized tokens
/// pass through lower-cased.
fn canonical_unit(token: &str) -> String {
    let lower = token.to_lowercase();
    match lower.as_str() {
        "kg" => "kg".to_string(),
        "g" | "gram" | "grams" => "g".to_string(),
        "ml" => "ml".to_string(),
        "l" | "lt" | "liter" | "litre" | "liters" | "litres" => "L".to_string(),
        "pcs" | "piece" | "pieces" => "pcs".to_string(),
        _ => lower,
    }
}

/// Recognize a month/year of manufacture (MM separated from a 4-digit year
/// by `/`, `.` or `-`) and normalize it to `MM/YYYY`.
fn extract_month_year(text: &str) -> Option<String> {
    let caps = month_year_re().captures(text)?;
    let month = caps.get(1)?.as_str();
    let year = caps.get(2)?.as_str();
    Some(format!("{month}/{year}"))
}

/// Recognize a consumer-care contact: a toll-free 1800/1900 number first,
/// falling back to any standalone 10-digit number.
fn extract_consumer_care(text: &str) -> Option<String> {
    if let Some(m) = toll_free_re().find(text) {
        return Some(m.as_str().to_string());
    }
    phone_re().find(text).map(|m| m.as_str().to_string())
}

/// Select the first line carrying a manufacturer indicator. The name is
/// that line with any leading `label:` prefix stripped; the following line
/// is taken as the address when it contains a digit or comma.
fn extract_manufacturer(text: &str) -> (Option<String>, Option<String>) {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    for (idx, line) in lines.iter().enumerate() {
        if !manufacturer_re().is_match(line) {
            continue;
        }

        let stripped = label_prefix_re().replace(line, "");
        let name = if stripped.trim().is_empty() {
            line.to_string()
        } else {
            stripped.trim().to_string()
        };

        let address = lines
            .get(idx + 1)
            .filter(|next| next.chars().any(|c| c.is_ascii_digit() || c == ','))
            .map(|next| next.to_string());

        return (Some(name), address);
    }

    (None, None)
}

/// Select the first line matching `name:` and take the remainder after the
/// colon. Lines with nothing after the colon are skipped.
fn extract_generic_name(text: &str) -> Option<String> {
    for line in text.lines() {
        if let Some(caps) = generic_name_re().captures(line) {
            let rest = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str =
        "MRP ₹199.00 Net Qty: 250 g Mfg by: Acme Foods Ltd 12/2025 Consumer Care: 1800-123-4567";

    #[test]
    fn test_sample_label() {
        let fields = extract(SAMPLE);

        assert_eq!(fields.mrp.as_deref(), Some("₹199.00"));
        assert_eq!(fields.net_quantity.as_deref(), Some("250"));
        assert_eq!(fields.unit.as_deref(), Some("g"));
        assert!(fields
            .manufacturer_name
            .as_deref()
            .unwrap()
            .contains("Acme Foods Ltd"));
        assert_eq!(fields.month_year.as_deref(), Some("12/2025"));
        assert!(fields
            .consumer_care
            .as_deref()
            .unwrap()
            .contains("1800-123-4567"));
        assert_eq!(fields.raw_text, SAMPLE);
    }

    #[test]
    fn test_unrecognizable_text_yields_absent_fields() {
        for input in ["", "lorem ipsum dolor sit amet", "???!!!"] {
            let fields = extract(input);
            assert_eq!(fields.generic_name, None);
            assert_eq!(fields.mrp, None);
            assert_eq!(fields.net_quantity, None);
            assert_eq!(fields.unit, None);
            assert_eq!(fields.manufacturer_name, None);
            assert_eq!(fields.manufacturer_address, None);
            assert_eq!(fields.month_year, None);
            assert_eq!(fields.consumer_care, None);
            assert_eq!(fields.raw_text, input);
        }
    }

    #[test]
    fn test_mrp_rs_prefix_kept_verbatim() {
        let fields = extract("Price Rs. 450,00 incl. taxes");
        assert_eq!(fields.mrp.as_deref(), Some("Rs. 450,00"));
    }

    #[test]
    fn test_mrp_rupee_symbol_normalized() {
        let fields = extract("Offer: ₹ 99");
        assert_eq!(fields.mrp.as_deref(), Some("₹99"));
    }

    #[test]
    fn test_quantity_thousands_separator_stripped() {
        let fields = extract("Contents: 1,000 ml approx");
        assert_eq!(fields.net_quantity.as_deref(), Some("1000"));
        assert_eq!(fields.unit.as_deref(), Some("ml"));
    }

    #[test]
    fn test_unit_canonicalization() {
        assert_eq!(canonical_unit("GRAM"), "g");
        assert_eq!(canonical_unit("grams"), "g");
        assert_eq!(canonical_unit("L"), "L");
        assert_eq!(canonical_unit("litres"), "L");
        assert_eq!(canonical_unit("lt"), "L");
        assert_eq!(canonical_unit("Piece"), "pcs");
        assert_eq!(canonical_unit("kg"), "kg");
        // unrecognized tokens pass through lower-cased
        assert_eq!(canonical_unit("Dozen"), "dozen");
    }

    #[test]
    fn test_quantity_decimal_with_word_unit() {
        let fields = extract("Net weight 1.5 Litre pack");
        assert_eq!(fields.net_quantity.as_deref(), Some("1.5"));
        assert_eq!(fields.unit.as_deref(), Some("L"));
    }

    #[test]
    fn test_unit_is_word_bounded() {
        // "gross" must not be read as a gram declaration
        let fields = extract("12 gross of boxes");
        assert_eq!(fields.net_quantity, None);
        assert_eq!(fields.unit, None);
    }

    #[test]
    fn test_month_year_separator_variants() {
        assert_eq!(extract("mfd 03-2024").month_year.as_deref(), Some("03/2024"));
        assert_eq!(extract("mfd 03.2024").month_year.as_deref(), Some("03/2024"));
        assert_eq!(extract("mfd 03 / 2024").month_year.as_deref(), Some("03/2024"));
    }

    #[test]
    fn test_month_year_rejects_invalid_month() {
        assert_eq!(extract("batch 13/2024").month_year, None);
        assert_eq!(extract("batch 00/2024").month_year, None);
    }

    #[test]
    fn test_month_year_rejects_implausible_year() {
        assert_eq!(extract("ref 12/3024").month_year, None);
    }

    #[test]
    fn test_consumer_care_plain_ten_digits() {
        let fields = extract("helpline 9876543210 toll applies");
        assert_eq!(fields.consumer_care.as_deref(), Some("9876543210"));
    }

    #[test]
    fn test_consumer_care_prefers_toll_free() {
        let fields = extract("call 9876543210 or 1800 425 1234");
        assert_eq!(fields.consumer_care.as_deref(), Some("1800 425 1234"));
    }

    #[test]
    fn test_manufacturer_with_address_line() {
        let text = "Ingredients: sugar, cocoa\nMfg by: Sunrise Confectionery\n14 Industrial Estate, Pune 411001\nBest before 6 months";
        let fields = extract(text);
        assert_eq!(fields.manufacturer_name.as_deref(), Some("Sunrise Confectionery"));
        assert_eq!(
            fields.manufacturer_address.as_deref(),
            Some("14 Industrial Estate, Pune 411001")
        );
    }

    #[test]
    fn test_manufacturer_without_address_line() {
        let text = "Packed by Fresh Farms\nStore in a cool dry place";
        let fields = extract(text);
        // "packer" indicator is absent, "Packed" does not match; manufact/packer/importer only
        assert_eq!(fields.manufacturer_name, None);

        let text = "Packer: Fresh Farms\nStore in a cool dry place";
        let fields = extract(text);
        assert_eq!(fields.manufacturer_name.as_deref(), Some("Fresh Farms"));
        assert_eq!(fields.manufacturer_address, None);
    }

    #[test]
    fn test_manufacturer_line_without_colon_kept_whole() {
        let text = "Imported and marketed in India\nPlot 7, MIDC";
        let fields = extract(text);
        // "importer" substring is absent here; "Imported" does not contain it
        assert_eq!(fields.manufacturer_name, None);

        let text = "Importer XYZ Traders\nPlot 7, MIDC";
        let fields = extract(text);
        assert_eq!(fields.manufacturer_name.as_deref(), Some("Importer XYZ Traders"));
        assert_eq!(fields.manufacturer_address.as_deref(), Some("Plot 7, MIDC"));
    }

    #[test]
    fn test_generic_name_after_colon() {
        let text = "Name: Instant Coffee\nNet Qty 50 g";
        let fields = extract(text);
        assert_eq!(fields.generic_name.as_deref(), Some("Instant Coffee"));
    }

    #[test]
    fn test_generic_name_empty_remainder_skipped() {
        let text = "Name:\nBrand Name: Morning Brew";
        let fields = extract(text);
        assert_eq!(fields.generic_name.as_deref(), Some("Morning Brew"));
    }

    #[test]
    fn test_fields_are_never_empty_strings() {
        let fields = extract(SAMPLE);
        let optional = [
            &fields.generic_name,
            &fields.mrp,
            &fields.net_quantity,
            &fields.unit,
            &fields.manufacturer_name,
            &fields.manufacturer_address,
            &fields.month_year,
            &fields.consumer_care,
        ];
        for field in optional {
            if let Some(value) = field {
                assert!(!value.is_empty());
            }
        }
    }
}
