// Prompts and response schema for single-pass entity extraction.

use crate::aliases::{alias_table_json, REJECTED_ALIASES};
use crate::extraction::target_entities;
use crate::schema::{CanonicalEntity, NOT_FOUND};
use serde_json::json;

pub const SYSTEM_PROMPT_ENTITY_EXTRACT: &str = r#"
You are a Financial Statement Extraction Specialist working on Profit & Loss statements and Balance Sheets.

## EXTRACTION RULES

### Revenue
- Use ONLY "Total Revenue from operations" (often labelled "(A)").
- NEVER include "Other Income". Map the value to "Revenue".

### Operating Expenses
- Use "Total expenses". Map the value to "Operating Expenses".

### Depreciation & Amortization
- Use "Depreciation and amortisation expense". Do NOT skip this line.
- If the two are reported as one combined figure, put the total in "Depreciation" and "0" in "Amortization".

### Prohibited Fields
- NEVER extract "EBITDA", "EBIT" or "PBIT", even when the document labels or highlights them.
- These figures are derived downstream and document values for them are not trusted.

### Missing Values
- If a value is not explicitly present, return "NOT_FOUND". DO NOT INFER OR CALCULATE.

### Period
- Return values for the LATEST financial period in the document only.

## OUTPUT FORMAT
Return a single JSON object whose keys are the requested field names and whose values are the
numbers exactly as printed (as strings), or "NOT_FOUND".
"#;

/// The per-request instruction listing fields, aliases and rejected labels.
pub fn entity_extraction_prompt() -> String {
    let fields: Vec<&str> = target_entities().iter().map(CanonicalEntity::label).collect();

    format!(
        "Analyze the attached financial document and extract entities for the LATEST financial period.\n\
        Focus on these fields:\n{}\n\n\
        RECAP OF REQUIRED MAPPINGS:\n\
        - Revenue = \"Total Revenue from operations (A)\"\n\
        - Operating Expenses = \"Total expenses\"\n\
        - Depreciation & Amortization = \"Depreciation and amortisation expense\"\n\n\
        IGNORE any EBITDA and PBIT values in the document.\n\n\
        Use these aliases for mapping:\n{}\n\n\
        Explicitly avoid: {}\n\n\
        Use \"{}\" for any field you cannot find.",
        fields.join(", "),
        alias_table_json(),
        REJECTED_ALIASES.join(", "),
        NOT_FOUND
    )
}

/// Gemini response schema: one required string property per requested entity.
pub fn entity_response_schema() -> serde_json::Value {
    let targets = target_entities();

    let properties: serde_json::Map<String, serde_json::Value> = targets
        .iter()
        .map(|entity| {
            (
                entity.label().to_string(),
                json!({
                    "type": "STRING",
                    "description": format!("Extracted value for {}", entity.label()),
                }),
            )
        })
        .collect();
    let required: Vec<&str> = targets.iter().map(CanonicalEntity::label).collect();

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_targets_but_not_protected() {
        let prompt = entity_extraction_prompt();
        assert!(prompt.contains("Cost of Goods Sold"));
        assert!(prompt.contains("Number of Outstanding Shares"));
        assert!(prompt.contains("Explicitly avoid: Total Revenue, Total Income, Other Income"));
        assert!(!prompt.contains("Focus on these fields:\nRevenue, Cost of Goods Sold, EBITDA"));
    }

    #[test]
    fn test_response_schema_requires_every_target() {
        let schema = entity_response_schema();
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), target_entities().len());
        assert!(schema["properties"].get("Revenue").is_some());
        assert!(schema["properties"].get("EBITDA").is_none());
        assert!(schema["properties"].get("PBIT").is_none());
    }
}
