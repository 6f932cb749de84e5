//! Label-matching configuration for the extraction collaborator.
//!
//! The ratio engine never reads these tables. They define which document
//! labels may satisfy a canonical entity and which must never do so.

use crate::schema::CanonicalEntity;
use std::collections::BTreeMap;

/// Synonyms under which an entity may appear in a source document.
pub const ENTITY_ALIASES: &[(CanonicalEntity, &[&str])] = &[
    (
        CanonicalEntity::Revenue,
        &[
            "Revenue from Operations",
            "Income from Operations",
            "Operating Revenue",
            "Net Sales",
            "Sales",
            "Turnover",
        ],
    ),
    (
        CanonicalEntity::Cogs,
        &[
            "Cost of Sales",
            "Direct Costs",
            "Cost of Revenue",
            "Purchase of Stock-in-Trade",
        ],
    ),
    (
        CanonicalEntity::Ebitda,
        &["OPBDIT", "Operating EBITDA", "Cash Operating Profit"],
    ),
    (
        CanonicalEntity::OperatingExpenses,
        &["Operating Costs", "Total Operating Expenses", "OpEx"],
    ),
    (CanonicalEntity::Depreciation, &["Depreciation and Depletion"]),
    (
        CanonicalEntity::Amortization,
        &["Amortization of Intangible Assets"],
    ),
    (CanonicalEntity::Pbit, &["EBIT", "Operating Profit"]),
    (
        CanonicalEntity::BegEquity,
        &["Net Worth", "Shareholders\u{2019} Funds", "Owners\u{2019} Equity"],
    ),
    (
        CanonicalEntity::LtDebt,
        &["Non-Current Borrowings", "Term Loans"],
    ),
    (
        CanonicalEntity::StDebt,
        &["Short-Term Borrowings", "Current Borrowings"],
    ),
    (
        CanonicalEntity::BegAssets,
        &[
            "Property Plant & Equipment",
            "PPE",
            "Net Block",
            "Fixed Assets",
        ],
    ),
];

/// Labels that must never be mapped to any canonical entity.
pub const REJECTED_ALIASES: &[&str] = &["Total Revenue", "Total Income", "Other Income"];

pub fn aliases_for(entity: CanonicalEntity) -> &'static [&'static str] {
    ENTITY_ALIASES
        .iter()
        .find(|(e, _)| *e == entity)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[])
}

pub fn is_rejected_alias(label: &str) -> bool {
    let label = label.trim();
    REJECTED_ALIASES
        .iter()
        .any(|rejected| rejected.eq_ignore_ascii_case(label))
}

/// The alias table keyed by entity label, as embedded in extraction prompts.
pub fn alias_table_json() -> serde_json::Value {
    let table: BTreeMap<&str, &[&str]> = ENTITY_ALIASES
        .iter()
        .map(|(entity, aliases)| (entity.label(), *aliases))
        .collect();
    serde_json::json!(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_for_known_and_unlisted_entities() {
        assert!(aliases_for(CanonicalEntity::Revenue).contains(&"Net Sales"));
        assert!(aliases_for(CanonicalEntity::SharePrice).is_empty());
    }

    #[test]
    fn test_rejected_aliases() {
        assert!(is_rejected_alias("Total Income"));
        assert!(is_rejected_alias("  other income "));
        assert!(!is_rejected_alias("Revenue from Operations"));
    }

    #[test]
    fn test_no_rejected_label_is_an_alias() {
        for (_, aliases) in ENTITY_ALIASES {
            for alias in aliases.iter() {
                assert!(!is_rejected_alias(alias), "{} is both accepted and rejected", alias);
            }
        }
    }

    #[test]
    fn test_each_entity_listed_once() {
        let mut seen = std::collections::HashSet::new();
        for (entity, _) in ENTITY_ALIASES {
            assert!(seen.insert(*entity), "{} listed twice", entity);
        }
    }

    #[test]
    fn test_alias_table_json_uses_labels() {
        let json = alias_table_json();
        assert_eq!(json["Long Term Debt"][1], "Term Loans");
        assert!(json.get("Cost of Goods Sold").is_some());
    }
}
