use crate::engine::{RatioEngine, RatioResultSet};
use crate::error::{FinancialRatioError, Result};
use crate::extraction::{ExtractedEntities, ExtractionStatus};
use crate::protected::ProtectedEntities;
use crate::sanitize::{assess_snapshot, Provenance};
use crate::schema::{CanonicalEntity, EntityRecord, EntitySnapshot, RawValue};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LockState {
    Locked,
    #[default]
    Unlocked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionStamp {
    /// Document name or other label identifying where the values came from.
    pub source: String,
    pub extracted_at: DateTime<Utc>,
    pub status: ExtractionStatus,
}

/// The editable set of entity records behind a ratio computation.
///
/// Every mutation is rejected while the sheet is locked. EBITDA and PBIT
/// cannot be edited directly; they are re-derived whenever one of their inputs
/// changes and after every bulk update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySheet {
    #[serde(deserialize_with = "deserialize_records")]
    records: BTreeMap<CanonicalEntity, EntityRecord>,
    lock: LockState,
    last_extraction: Option<ExtractionStamp>,
}

/// Saved sheets may predate an entity or omit blank ones; every entity gets a record.
fn deserialize_records<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<CanonicalEntity, EntityRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut records = BTreeMap::<CanonicalEntity, EntityRecord>::deserialize(deserializer)?;
    for entity in CanonicalEntity::ALL {
        records.entry(entity).or_default();
    }
    Ok(records)
}

impl Default for EntitySheet {
    fn default() -> Self {
        Self::new()
    }
}

impl EntitySheet {
    pub fn new() -> Self {
        let records = CanonicalEntity::ALL
            .iter()
            .map(|entity| (*entity, EntityRecord::default()))
            .collect();
        let mut sheet = Self {
            records,
            lock: LockState::Unlocked,
            last_extraction: None,
        };
        sheet.recompute_protected(true);
        sheet
    }

    pub fn lock_state(&self) -> LockState {
        self.lock
    }

    pub fn is_locked(&self) -> bool {
        self.lock == LockState::Locked
    }

    pub fn lock(&mut self) {
        self.lock = LockState::Locked;
    }

    pub fn unlock(&mut self) {
        self.lock = LockState::Unlocked;
    }

    pub fn toggle_lock(&mut self) -> LockState {
        self.lock = match self.lock {
            LockState::Locked => LockState::Unlocked,
            LockState::Unlocked => LockState::Locked,
        };
        debug!("Sheet lock state is now {:?}", self.lock);
        self.lock
    }

    pub fn record(&self, entity: CanonicalEntity) -> &EntityRecord {
        // Records are created for every entity in `new`.
        &self.records[&entity]
    }

    pub fn value(&self, entity: CanonicalEntity) -> &RawValue {
        &self.record(entity).value
    }

    pub fn last_extraction(&self) -> Option<&ExtractionStamp> {
        self.last_extraction.as_ref()
    }

    /// Edits the current value of a single entity.
    pub fn set_value(&mut self, entity: CanonicalEntity, value: impl Into<RawValue>) -> Result<()> {
        self.ensure_unlocked()?;
        if entity.is_protected() {
            return Err(FinancialRatioError::ProtectedEntity(entity));
        }

        self.record_mut(entity).value = value.into();

        if entity.feeds_protected() {
            self.recompute_protected(false);
        }
        Ok(())
    }

    /// Applies several manual edits at once.
    ///
    /// Values supplied for EBITDA or PBIT are ignored; both are recomputed afterwards.
    pub fn apply_batch(&mut self, values: EntitySnapshot) -> Result<ProtectedEntities> {
        self.ensure_unlocked()?;

        for (entity, value) in values {
            if entity.is_protected() {
                warn!("Ignoring manual value for protected entity {}", entity);
                continue;
            }
            self.record_mut(entity).value = value;
        }

        Ok(self.recompute_protected(false))
    }

    /// Merges an extraction result into both the current and extracted values.
    ///
    /// EBITDA and PBIT are then derived from the merged current values and
    /// written to both fields, whatever the collaborator returned for them.
    pub fn apply_extraction(
        &mut self,
        entities: ExtractedEntities,
        source: impl Into<String>,
    ) -> Result<ExtractionStatus> {
        self.ensure_unlocked()?;

        let status = ExtractionStatus::classify(&entities);
        let source = source.into();
        info!(
            "Applying extraction from '{}' ({} entities, status {:?})",
            source,
            entities.len(),
            status
        );

        for (entity, value) in entities {
            if entity.is_protected() {
                warn!("Discarding extracted value for protected entity {}", entity);
                continue;
            }
            let record = self.record_mut(entity);
            record.value = value.clone();
            record.extracted = value;
        }

        self.recompute_protected(true);
        self.last_extraction = Some(ExtractionStamp {
            source,
            extracted_at: Utc::now(),
            status,
        });

        Ok(status)
    }

    /// Discards manual edits, restoring every entity to its extracted value.
    pub fn reset_to_extracted(&mut self) -> Result<()> {
        self.ensure_unlocked()?;

        for record in self.records.values_mut() {
            record.value = record.extracted.clone();
        }
        self.recompute_protected(false);
        Ok(())
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        self.records
            .iter()
            .map(|(entity, record)| (*entity, record.value.clone()))
            .collect()
    }

    pub fn extracted_snapshot(&self) -> EntitySnapshot {
        self.records
            .iter()
            .map(|(entity, record)| (*entity, record.extracted.clone()))
            .collect()
    }

    pub fn provenance(&self) -> BTreeMap<CanonicalEntity, Provenance> {
        assess_snapshot(&self.snapshot())
    }

    /// Computes ratios over the current values. Allowed while locked.
    pub fn compute_ratios(&self, engine: &RatioEngine) -> RatioResultSet {
        engine.compute(&self.snapshot())
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.is_locked() {
            return Err(FinancialRatioError::SheetLocked);
        }
        Ok(())
    }

    fn record_mut(&mut self, entity: CanonicalEntity) -> &mut EntityRecord {
        self.records.entry(entity).or_default()
    }

    fn recompute_protected(&mut self, include_extracted: bool) -> ProtectedEntities {
        let derived = ProtectedEntities::from_snapshot(&self.snapshot());
        let pairs = [
            (CanonicalEntity::Ebitda, derived.formatted_ebitda()),
            (CanonicalEntity::Pbit, derived.formatted_pbit()),
        ];

        for (entity, formatted) in pairs {
            let record = self.record_mut(entity);
            record.value = RawValue::Text(formatted.clone());
            if include_extracted {
                record.extracted = RawValue::Text(formatted);
            }
        }
        derived
    }
}
