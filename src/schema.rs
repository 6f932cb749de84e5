use crate::error::{FinancialRatioError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Sentinel the extraction collaborator returns for values it could not find.
pub const NOT_FOUND: &str = "NOT_FOUND";

/// The closed vocabulary of financial-statement fields.
///
/// Variants serialize as their statement labels (e.g. `"Cost of Goods Sold"`),
/// which is also the key format used by the extraction collaborator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum CanonicalEntity {
    #[serde(rename = "Revenue")]
    #[schemars(description = "Revenue from operations, excluding other income")]
    Revenue,

    #[serde(rename = "Cost of Goods Sold")]
    Cogs,

    #[serde(rename = "EBITDA")]
    #[schemars(description = "Protected: always Revenue - Operating Expenses + Depreciation + Amortization")]
    Ebitda,

    #[serde(rename = "Operating Expenses")]
    OperatingExpenses,

    #[serde(rename = "Depreciation")]
    Depreciation,

    #[serde(rename = "Amortization")]
    Amortization,

    #[serde(rename = "Profit After Tax")]
    Pat,

    #[serde(rename = "Beginning Share Holders Equity")]
    BegEquity,

    #[serde(rename = "Ending Share Holders Equity")]
    EndEquity,

    #[serde(rename = "Long Term Debt")]
    LtDebt,

    #[serde(rename = "PBIT")]
    #[schemars(description = "Protected: always EBITDA - Depreciation - Amortization")]
    Pbit,

    #[serde(rename = "Beginning Assets")]
    BegAssets,

    #[serde(rename = "Ending Assets")]
    EndAssets,

    #[serde(rename = "Current Assets")]
    CurrentAssets,

    #[serde(rename = "Current Liabilities")]
    CurrentLiabilities,

    #[serde(rename = "Inventories")]
    Inventories,

    #[serde(rename = "Cash & Cash Equivalents")]
    CashEquivalents,

    #[serde(rename = "Beginning Fixed Assets")]
    BegFixedAssets,

    #[serde(rename = "Ending Fixed Assets")]
    EndFixedAssets,

    #[serde(rename = "Beginning Current Assets")]
    BegCurrentAssets,

    #[serde(rename = "Beginning Current Liabilities")]
    BegCurrentLiabs,

    #[serde(rename = "Ending Current Assets")]
    EndCurrentAssets,

    #[serde(rename = "Ending Current Liabilities")]
    EndCurrentLiabs,

    #[serde(rename = "Interest Expense")]
    InterestExpense,

    #[serde(rename = "Short Term Debt")]
    StDebt,

    #[serde(rename = "Total Assets")]
    TotalAssets,

    #[serde(rename = "Share Price")]
    SharePrice,

    #[serde(rename = "Number of Outstanding Shares")]
    OutstandingShares,
}

impl CanonicalEntity {
    /// Every entity, in statement-grid order.
    pub const ALL: [CanonicalEntity; 28] = [
        CanonicalEntity::Revenue,
        CanonicalEntity::Cogs,
        CanonicalEntity::Ebitda,
        CanonicalEntity::OperatingExpenses,
        CanonicalEntity::Depreciation,
        CanonicalEntity::Amortization,
        CanonicalEntity::Pat,
        CanonicalEntity::BegEquity,
        CanonicalEntity::EndEquity,
        CanonicalEntity::LtDebt,
        CanonicalEntity::Pbit,
        CanonicalEntity::BegAssets,
        CanonicalEntity::EndAssets,
        CanonicalEntity::CurrentAssets,
        CanonicalEntity::CurrentLiabilities,
        CanonicalEntity::Inventories,
        CanonicalEntity::CashEquivalents,
        CanonicalEntity::BegFixedAssets,
        CanonicalEntity::EndFixedAssets,
        CanonicalEntity::BegCurrentAssets,
        CanonicalEntity::BegCurrentLiabs,
        CanonicalEntity::EndCurrentAssets,
        CanonicalEntity::EndCurrentLiabs,
        CanonicalEntity::InterestExpense,
        CanonicalEntity::StDebt,
        CanonicalEntity::TotalAssets,
        CanonicalEntity::SharePrice,
        CanonicalEntity::OutstandingShares,
    ];

    /// The four inputs of the EBITDA/PBIT derivation.
    pub const PROTECTED_INPUTS: [CanonicalEntity; 4] = [
        CanonicalEntity::Revenue,
        CanonicalEntity::OperatingExpenses,
        CanonicalEntity::Depreciation,
        CanonicalEntity::Amortization,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CanonicalEntity::Revenue => "Revenue",
            CanonicalEntity::Cogs => "Cost of Goods Sold",
            CanonicalEntity::Ebitda => "EBITDA",
            CanonicalEntity::OperatingExpenses => "Operating Expenses",
            CanonicalEntity::Depreciation => "Depreciation",
            CanonicalEntity::Amortization => "Amortization",
            CanonicalEntity::Pat => "Profit After Tax",
            CanonicalEntity::BegEquity => "Beginning Share Holders Equity",
            CanonicalEntity::EndEquity => "Ending Share Holders Equity",
            CanonicalEntity::LtDebt => "Long Term Debt",
            CanonicalEntity::Pbit => "PBIT",
            CanonicalEntity::BegAssets => "Beginning Assets",
            CanonicalEntity::EndAssets => "Ending Assets",
            CanonicalEntity::CurrentAssets => "Current Assets",
            CanonicalEntity::CurrentLiabilities => "Current Liabilities",
            CanonicalEntity::Inventories => "Inventories",
            CanonicalEntity::CashEquivalents => "Cash & Cash Equivalents",
            CanonicalEntity::BegFixedAssets => "Beginning Fixed Assets",
            CanonicalEntity::EndFixedAssets => "Ending Fixed Assets",
            CanonicalEntity::BegCurrentAssets => "Beginning Current Assets",
            CanonicalEntity::BegCurrentLiabs => "Beginning Current Liabilities",
            CanonicalEntity::EndCurrentAssets => "Ending Current Assets",
            CanonicalEntity::EndCurrentLiabs => "Ending Current Liabilities",
            CanonicalEntity::InterestExpense => "Interest Expense",
            CanonicalEntity::StDebt => "Short Term Debt",
            CanonicalEntity::TotalAssets => "Total Assets",
            CanonicalEntity::SharePrice => "Share Price",
            CanonicalEntity::OutstandingShares => "Number of Outstanding Shares",
        }
    }

    /// EBITDA and PBIT are never accepted from input; they are always re-derived.
    pub fn is_protected(&self) -> bool {
        matches!(self, CanonicalEntity::Ebitda | CanonicalEntity::Pbit)
    }

    pub fn feeds_protected(&self) -> bool {
        Self::PROTECTED_INPUTS.contains(self)
    }
}

impl fmt::Display for CanonicalEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CanonicalEntity {
    type Err = FinancialRatioError;

    /// Matches a display label exactly, the same way serde does.
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|entity| entity.label() == s)
            .ok_or_else(|| FinancialRatioError::UnknownEntity(s.to_string()))
    }
}

/// A value as typed by a user or returned by the extraction collaborator,
/// before sanitization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    Text(String),
    /// The `"NOT_FOUND"` sentinel.
    NotFound,
    Null,
}

impl RawValue {
    /// The blank cell a fresh sheet starts with.
    pub fn empty() -> Self {
        RawValue::Text(String::new())
    }
}

impl Default for RawValue {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::from(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        if value == NOT_FOUND {
            RawValue::NotFound
        } else {
            RawValue::Text(value)
        }
    }
}

impl From<serde_json::Value> for RawValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RawValue::Null,
            serde_json::Value::Number(n) => n.as_f64().map(RawValue::Number).unwrap_or(RawValue::Null),
            serde_json::Value::String(s) => RawValue::from(s),
            other => RawValue::Text(other.to_string()),
        }
    }
}

impl Serialize for RawValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            RawValue::Number(n) => serializer.serialize_f64(*n),
            RawValue::Text(s) => serializer.serialize_str(s),
            RawValue::NotFound => serializer.serialize_str(NOT_FOUND),
            RawValue::Null => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for RawValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(RawValue::from)
    }
}

/// A single snapshot of entity values, as fed to the ratio engine.
pub type EntitySnapshot = BTreeMap<CanonicalEntity, RawValue>;

/// The editable value of an entity alongside the last value extraction produced for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub value: RawValue,
    pub extracted: RawValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip_through_from_str() {
        for entity in CanonicalEntity::ALL {
            let parsed: CanonicalEntity = entity.label().parse().unwrap();
            assert_eq!(parsed, entity);
        }
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let err = "Total Income".parse::<CanonicalEntity>().unwrap_err();
        assert!(matches!(err, FinancialRatioError::UnknownEntity(ref name) if name == "Total Income"));
    }

    #[test]
    fn test_from_str_requires_exact_label() {
        assert!(" Revenue ".parse::<CanonicalEntity>().is_err());
        assert!("revenue".parse::<CanonicalEntity>().is_err());
        assert_eq!("Revenue".parse::<CanonicalEntity>().unwrap(), CanonicalEntity::Revenue);

        let padded: std::result::Result<EntitySnapshot, _> =
            serde_json::from_str(r#"{" Revenue ": "10"}"#);
        assert!(padded.is_err());
    }

    #[test]
    fn test_serde_uses_statement_labels() {
        let json = serde_json::to_string(&CanonicalEntity::CashEquivalents).unwrap();
        assert_eq!(json, "\"Cash & Cash Equivalents\"");

        let snapshot: EntitySnapshot = serde_json::from_str(
            r#"{"Revenue": "1,000", "Cost of Goods Sold": 400, "Inventories": "NOT_FOUND", "Total Assets": null}"#,
        )
        .unwrap();
        assert_eq!(snapshot[&CanonicalEntity::Revenue], RawValue::Text("1,000".to_string()));
        assert_eq!(snapshot[&CanonicalEntity::Cogs], RawValue::Number(400.0));
        assert_eq!(snapshot[&CanonicalEntity::Inventories], RawValue::NotFound);
        assert_eq!(snapshot[&CanonicalEntity::TotalAssets], RawValue::Null);
    }

    #[test]
    fn test_unknown_key_fails_snapshot_deserialization() {
        let result: std::result::Result<EntitySnapshot, _> =
            serde_json::from_str(r#"{"Other Income": "50"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_protected_entities() {
        let protected: Vec<_> = CanonicalEntity::ALL
            .iter()
            .filter(|e| e.is_protected())
            .collect();
        assert_eq!(protected, vec![&CanonicalEntity::Ebitda, &CanonicalEntity::Pbit]);
        assert!(CanonicalEntity::Depreciation.feeds_protected());
        assert!(!CanonicalEntity::Cogs.feeds_protected());
    }

    #[test]
    fn test_not_found_serializes_as_sentinel() {
        let json = serde_json::to_string(&RawValue::NotFound).unwrap();
        assert_eq!(json, "\"NOT_FOUND\"");
    }
}
