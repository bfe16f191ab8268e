//! Profile detection and canonical field mapping.
//!
//! A profile is the schema variant a file's headers match. Rules are
//! written against canonical field names; the [`FieldMapping`] translates
//! those to whatever the file actually calls its columns.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ChargecheckError;

/// Named schema variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Hospital price-transparency standard charges file.
    Standard,
    /// Minimal code/price file.
    Simple,
}

impl Profile {
    pub const ALL: [Profile; 2] = [Profile::Standard, Profile::Simple];

    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Standard => "standard",
            Profile::Simple => "simple",
        }
    }

    /// Legacy key accepted in rule documents for this profile.
    pub fn alias(&self) -> &'static str {
        match self {
            Profile::Standard => "cms_csv",
            Profile::Simple => "simple_csv",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Profile::Standard => "Hospital Price Transparency standard charges CSV",
            Profile::Simple => "Simple CSV format",
        }
    }

    /// Ordered header synonyms for each canonical field.
    fn candidates(&self, field: CanonicalField) -> &'static [&'static str] {
        use CanonicalField::*;
        match (self, field) {
            (Profile::Standard, Code) => &["billing_code", "code"],
            (Profile::Standard, CodeSystem) => &["billing_code_type", "code_system"],
            (Profile::Standard, GrossPrice) => &[
                "standard_charge",
                "gross_price",
                "gross_charge",
                "standard_charge|gross",
            ],
            (Profile::Standard, CashPrice) => &[
                "cash_price",
                "cash_discount_price",
                "cash_charge",
                "standard_charge|discounted_cash",
            ],
            (Profile::Standard, Description) => &["description", "drug_information"],
            (Profile::Standard, Date) => &["date", "effective_date", "last_updated"],
            (Profile::Simple, Code) => &["code", "billing_code"],
            (Profile::Simple, CodeSystem) => &["code_system", "billing_code_type"],
            (Profile::Simple, GrossPrice) => &["gross_price", "standard_charge"],
            (Profile::Simple, CashPrice) => &["cash_price"],
            (Profile::Simple, Description) => &["description"],
            (Profile::Simple, Date) => &["date", "effective_date"],
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = ChargecheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Profile::ALL
            .into_iter()
            .find(|p| p.as_str() == key || p.alias() == key)
            .ok_or_else(|| ChargecheckError::Config(format!("unknown profile '{key}'")))
    }
}

/// Stable internal field names rules are written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Code,
    CodeSystem,
    GrossPrice,
    CashPrice,
    Description,
    Date,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 6] = [
        CanonicalField::Code,
        CanonicalField::CodeSystem,
        CanonicalField::GrossPrice,
        CanonicalField::CashPrice,
        CanonicalField::Description,
        CanonicalField::Date,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Code => "code",
            CanonicalField::CodeSystem => "code_system",
            CanonicalField::GrossPrice => "gross_price",
            CanonicalField::CashPrice => "cash_price",
            CanonicalField::Description => "description",
            CanonicalField::Date => "date",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

/// Partial map from canonical field to actual column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping(IndexMap<CanonicalField, String>);

impl FieldMapping {
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Look up by canonical name, e.g. `"gross_price"`.
    pub fn get_by_name(&self, name: &str) -> Option<&str> {
        CanonicalField::from_name(name).and_then(|f| self.get(f))
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Lower-case, trim, and turn spaces and hyphens into underscores.
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace([' ', '-'], "_")
}

const STANDARD_INDICATORS: [&str; 5] = [
    "billing_code",
    "billing_code_type",
    "billing_code_type_version",
    "standard_charge",
    "payer_name",
];

/// Pick the profile whose indicator vocabulary the headers overlap.
pub fn detect_profile(headers: &[String]) -> Profile {
    let normalized: HashSet<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let matches = STANDARD_INDICATORS
        .iter()
        .filter(|indicator| normalized.contains(**indicator))
        .count();

    if matches >= 2 {
        Profile::Standard
    } else {
        Profile::Simple
    }
}

/// Map each canonical field to the first matching header synonym.
///
/// On duplicate normalized headers the first occurrence wins.
pub fn map_to_canonical(headers: &[String], profile: Profile) -> FieldMapping {
    let mut by_normalized: IndexMap<String, &str> = IndexMap::new();
    for header in headers {
        by_normalized
            .entry(normalize_header(header))
            .or_insert(header.as_str());
    }

    let mut mapping = IndexMap::new();
    for field in CanonicalField::ALL {
        let hit = profile
            .candidates(field)
            .iter()
            .find_map(|candidate| by_normalized.get(*candidate));
        if let Some(actual) = hit {
            mapping.insert(field, actual.to_string());
        }
    }
    FieldMapping(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_detect_standard_with_variations() {
        let h = headers(&[
            "Billing Code",
            "billing-code-type",
            "Description",
            "STANDARD_CHARGE",
            "Payer Name",
        ]);
        assert_eq!(detect_profile(&h), Profile::Standard);
    }

    #[test]
    fn test_detect_simple() {
        let h = headers(&["code", "code_system", "gross_price", "cash_price", "date"]);
        assert_eq!(detect_profile(&h), Profile::Simple);
    }

    #[test]
    fn test_single_indicator_is_simple() {
        let h = headers(&["billing_code", "code_system", "gross_price", "cash_price"]);
        assert_eq!(detect_profile(&h), Profile::Simple);
    }

    #[test]
    fn test_map_standard_headers() {
        let h = headers(&["billing_code", "billing_code_type", "description", "standard_charge"]);
        let mapping = map_to_canonical(&h, Profile::Standard);

        assert_eq!(mapping.get(CanonicalField::Code), Some("billing_code"));
        assert_eq!(mapping.get(CanonicalField::CodeSystem), Some("billing_code_type"));
        assert_eq!(mapping.get(CanonicalField::GrossPrice), Some("standard_charge"));
        assert_eq!(mapping.get(CanonicalField::Description), Some("description"));
        assert!(!mapping.contains(CanonicalField::CashPrice));
    }

    #[test]
    fn test_mapping_keeps_actual_names() {
        let h = headers(&["Code", "Gross Price", "Cash-Price"]);
        let mapping = map_to_canonical(&h, Profile::Simple);

        assert_eq!(mapping.get_by_name("code"), Some("Code"));
        assert_eq!(mapping.get_by_name("gross_price"), Some("Gross Price"));
        assert_eq!(mapping.get_by_name("cash_price"), Some("Cash-Price"));
        assert_eq!(mapping.get_by_name("not_a_field"), None);
    }

    #[test]
    fn test_first_duplicate_header_wins() {
        let h = headers(&["CODE", "code"]);
        let mapping = map_to_canonical(&h, Profile::Simple);
        assert_eq!(mapping.get(CanonicalField::Code), Some("CODE"));
    }

    #[test]
    fn test_candidate_order_decides() {
        let h = headers(&["code", "billing_code"]);
        assert_eq!(
            map_to_canonical(&h, Profile::Standard).get(CanonicalField::Code),
            Some("billing_code")
        );
        assert_eq!(
            map_to_canonical(&h, Profile::Simple).get(CanonicalField::Code),
            Some("code")
        );
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Billing Code-Type "), "billing_code_type");
    }

    #[test]
    fn test_profile_from_str_accepts_aliases() {
        assert_eq!("cms_csv".parse::<Profile>().unwrap(), Profile::Standard);
        assert_eq!("Simple".parse::<Profile>().unwrap(), Profile::Simple);
        assert!("other".parse::<Profile>().is_err());
    }

    #[test]
    fn test_alias_and_name_round_trip() {
        for profile in Profile::ALL {
            assert_eq!(profile.alias().parse::<Profile>().unwrap(), profile);
            assert_eq!(profile.as_str().parse::<Profile>().unwrap(), profile);
            assert_ne!(profile.alias(), profile.as_str());
        }
    }

    #[test]
    fn test_mapping_serializes_as_object() {
        let h = headers(&["code", "gross_price"]);
        let json = serde_json::to_value(map_to_canonical(&h, Profile::Simple)).unwrap();
        assert_eq!(json["code"], "code");
        assert_eq!(json["gross_price"], "gross_price");
    }
}
