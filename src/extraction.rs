use crate::error::{FinancialRatioError, Result};
use crate::sanitize::{assess, Provenance};
use crate::schema::{CanonicalEntity, RawValue};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entity values returned by the extraction collaborator for one document.
pub type ExtractedEntities = BTreeMap<CanonicalEntity, RawValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractionStatus {
    /// Every requested entity was found.
    Success,
    /// Some requested entities came back as `NOT_FOUND`.
    Partial,
    /// No requested entity was found.
    NothingFound,
}

impl ExtractionStatus {
    pub fn classify(entities: &ExtractedEntities) -> Self {
        let targets = target_entities();
        let found = targets
            .iter()
            .filter(|e| assess(entities.get(*e)) == Provenance::Present)
            .count();

        if found == targets.len() {
            ExtractionStatus::Success
        } else if found == 0 {
            ExtractionStatus::NothingFound
        } else {
            ExtractionStatus::Partial
        }
    }
}

/// The entities requested from the collaborator: everything except EBITDA and PBIT.
pub fn target_entities() -> Vec<CanonicalEntity> {
    CanonicalEntity::ALL
        .iter()
        .copied()
        .filter(|e| !e.is_protected())
        .collect()
}

/// Parses and validates a collaborator response.
///
/// The response must be a JSON object keyed by entity label. Keys outside the
/// canonical set are rejected. Values for EBITDA or PBIT are discarded. Any
/// requested entity missing from the response, or reported as `null`, is
/// recorded as `NOT_FOUND`.
pub fn parse_extraction_response(raw: &str) -> Result<ExtractedEntities> {
    let cleaned = clean_json_output(raw);
    let value: serde_json::Value = serde_json::from_str(&cleaned).map_err(|e| {
        FinancialRatioError::ExtractionFailed(format!("Response is not valid JSON: {}", e))
    })?;

    let object = match value {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(FinancialRatioError::ExtractionFailed(format!(
                "Expected a JSON object of entity values, got: {}",
                other
            )))
        }
    };

    let mut entities = ExtractedEntities::new();
    for (key, value) in object {
        let entity: CanonicalEntity = key.parse()?;
        if entity.is_protected() {
            warn!(
                "Discarding extracted value for protected entity {}: {}",
                entity, value
            );
            continue;
        }
        let raw = match RawValue::from(value) {
            RawValue::Null => RawValue::NotFound,
            other => other,
        };
        entities.insert(entity, raw);
    }

    for entity in target_entities() {
        entities.entry(entity).or_insert_with(|| {
            debug!("Entity {} missing from extraction response; recording NOT_FOUND", entity);
            RawValue::NotFound
        });
    }

    Ok(entities)
}

/// Strips markdown fences or prose around the JSON object in a model reply.
pub(crate) fn clean_json_output(raw: &str) -> String {
    if let Some(start) = raw.find('{') {
        if let Some(end) = raw.rfind('}') {
            if end > start {
                return raw[start..=end].to_string();
            }
        }
    }
    raw.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_entities_exclude_protected() {
        let targets = target_entities();
        assert_eq!(targets.len(), CanonicalEntity::ALL.len() - 2);
        assert!(!targets.contains(&CanonicalEntity::Ebitda));
        assert!(!targets.contains(&CanonicalEntity::Pbit));
    }

    #[test]
    fn test_parse_fills_missing_with_not_found() {
        let entities = parse_extraction_response(r#"{"Revenue": "12,500", "Depreciation": 300}"#).unwrap();

        assert_eq!(entities.len(), target_entities().len());
        assert_eq!(entities[&CanonicalEntity::Revenue], RawValue::from("12,500"));
        assert_eq!(entities[&CanonicalEntity::Depreciation], RawValue::Number(300.0));
        assert_eq!(entities[&CanonicalEntity::Cogs], RawValue::NotFound);
    }

    #[test]
    fn test_parse_discards_protected_values() {
        let entities =
            parse_extraction_response(r#"{"Revenue": "100", "EBITDA": "5000", "PBIT": "4000"}"#).unwrap();
        assert!(!entities.contains_key(&CanonicalEntity::Ebitda));
        assert!(!entities.contains_key(&CanonicalEntity::Pbit));
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        let err = parse_extraction_response(r#"{"Other Income": "50"}"#).unwrap_err();
        assert!(matches!(err, FinancialRatioError::UnknownEntity(_)));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        let err = parse_extraction_response("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, FinancialRatioError::ExtractionFailed(_)));
        assert!(parse_extraction_response("not json").is_err());
    }

    #[test]
    fn test_parse_strips_code_fences_and_nulls() {
        let raw = "```json\n{\"Share Price\": null, \"Revenue\": \"NOT_FOUND\"}\n```";
        let entities = parse_extraction_response(raw).unwrap();
        assert_eq!(entities[&CanonicalEntity::SharePrice], RawValue::NotFound);
        assert_eq!(entities[&CanonicalEntity::Revenue], RawValue::NotFound);
    }

    #[test]
    fn test_status_classification() {
        let nothing = parse_extraction_response("{}").unwrap();
        assert_eq!(ExtractionStatus::classify(&nothing), ExtractionStatus::NothingFound);

        let some = parse_extraction_response(r#"{"Revenue": "100"}"#).unwrap();
        assert_eq!(ExtractionStatus::classify(&some), ExtractionStatus::Partial);

        let all: ExtractedEntities = target_entities()
            .into_iter()
            .map(|e| (e, RawValue::from("1")))
            .collect();
        assert_eq!(ExtractionStatus::classify(&all), ExtractionStatus::Success);
    }
}
