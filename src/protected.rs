use crate::sanitize::read_entity;
use crate::schema::{CanonicalEntity, EntitySnapshot, RawValue};
use crate::utils::format_fixed2;
use log::debug;
use serde::{Deserialize, Serialize};

/// EBITDA and PBIT derived by the strict formula, never taken from a document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProtectedEntities {
    pub ebitda: f64,
    pub pbit: f64,
}

impl ProtectedEntities {
    /// `EBITDA = Revenue - Operating Expenses + Depreciation + Amortization`
    /// and `PBIT = EBITDA - Depreciation - Amortization`.
    pub fn derive(revenue: f64, operating_expenses: f64, depreciation: f64, amortization: f64) -> Self {
        let ebitda = revenue - operating_expenses + depreciation + amortization;
        let pbit = ebitda - depreciation - amortization;
        Self { ebitda, pbit }
    }

    pub fn from_snapshot(values: &EntitySnapshot) -> Self {
        let derived = Self::derive(
            read_entity(values, CanonicalEntity::Revenue),
            read_entity(values, CanonicalEntity::OperatingExpenses),
            read_entity(values, CanonicalEntity::Depreciation),
            read_entity(values, CanonicalEntity::Amortization),
        );
        debug!(
            "Derived protected entities: EBITDA={}, PBIT={}",
            derived.ebitda, derived.pbit
        );
        derived
    }

    pub fn formatted_ebitda(&self) -> String {
        format_fixed2(self.ebitda)
    }

    pub fn formatted_pbit(&self) -> String {
        format_fixed2(self.pbit)
    }
}

/// Overwrites EBITDA and PBIT in `values` with their derived, formatted values.
///
/// Whatever was stored for the two entities beforehand is discarded.
pub fn apply_protected(values: &mut EntitySnapshot) -> ProtectedEntities {
    let derived = ProtectedEntities::from_snapshot(values);
    values.insert(
        CanonicalEntity::Ebitda,
        RawValue::Text(derived.formatted_ebitda()),
    );
    values.insert(CanonicalEntity::Pbit, RawValue::Text(derived.formatted_pbit()));
    derived
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(entries: &[(CanonicalEntity, &str)]) -> EntitySnapshot {
        entries
            .iter()
            .map(|(entity, value)| (*entity, RawValue::from(*value)))
            .collect()
    }

    #[test]
    fn test_strict_formula() {
        let derived = ProtectedEntities::derive(1000.0, 600.0, 50.0, 10.0);
        assert_eq!(derived.formatted_ebitda(), "460.00");
        assert_eq!(derived.formatted_pbit(), "400.00");
    }

    #[test]
    fn test_missing_inputs_derive_zero() {
        let derived = ProtectedEntities::from_snapshot(&EntitySnapshot::new());
        assert_eq!(derived.formatted_ebitda(), "0.00");
        assert_eq!(derived.formatted_pbit(), "0.00");
    }

    #[test]
    fn test_supplied_values_are_overwritten() {
        let mut values = snapshot(&[
            (CanonicalEntity::Revenue, "1,000"),
            (CanonicalEntity::OperatingExpenses, "600"),
            (CanonicalEntity::Depreciation, "50"),
            (CanonicalEntity::Amortization, "10"),
            (CanonicalEntity::Ebitda, "9999"),
            (CanonicalEntity::Pbit, "NOT_FOUND"),
        ]);

        apply_protected(&mut values);

        assert_eq!(values[&CanonicalEntity::Ebitda], RawValue::from("460.00"));
        assert_eq!(values[&CanonicalEntity::Pbit], RawValue::from("400.00"));
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut values = snapshot(&[
            (CanonicalEntity::Revenue, "1234.567"),
            (CanonicalEntity::OperatingExpenses, "987.654"),
            (CanonicalEntity::Depreciation, "12.3"),
        ]);

        apply_protected(&mut values);
        let first = values.clone();
        apply_protected(&mut values);

        assert_eq!(first, values);
    }
}
