//! # Financial Ratio Builder
//!
//! A library for deriving a fixed catalogue of accounting and market ratios from
//! a sparse, possibly malformed set of financial-statement line items (typed in
//! by hand or extracted from PDFs/images via LLM).
//!
//! ## Core Concepts
//!
//! - **Canonical Entities**: A closed vocabulary of statement fields (Revenue, Current Assets, ...)
//! - **Sanitization**: Every raw value becomes a finite number; missing or unparseable input reads as zero
//! - **Protected Entities**: EBITDA and PBIT are always derived by formula, never trusted from a document
//! - **Zero-guard**: Any ratio whose denominator is zero evaluates to zero instead of failing
//! - **Entity Sheet**: Current/extracted values per entity behind a Locked/Unlocked state
//!
//! ## Example
//!
//! ```rust
//! use financial_ratio_builder::*;
//!
//! let mut values = EntitySnapshot::new();
//! values.insert(CanonicalEntity::Revenue, RawValue::from("1,000"));
//! values.insert(CanonicalEntity::OperatingExpenses, RawValue::from(600.0));
//! values.insert(CanonicalEntity::Depreciation, RawValue::from("50"));
//! values.insert(CanonicalEntity::Amortization, RawValue::from("10"));
//!
//! let ratios = compute_ratios(&values, DEFAULT_TAX_RATE);
//! assert_eq!(ratios.get(RatioMetric::Ebitda), "460.00");
//! assert_eq!(ratios.get(RatioMetric::Pbit), "400.00");
//! ```

pub mod aliases;
pub mod engine;
pub mod error;
pub mod extraction;
pub mod protected;
pub mod report;
pub mod sanitize;
pub mod schema;
pub mod sheet;
pub mod utils;

#[cfg(feature = "gemini")]
pub mod llm;

pub use aliases::{aliases_for, is_rejected_alias, ENTITY_ALIASES, REJECTED_ALIASES};
pub use engine::{
    compute_ratios, EngineConfig, RatioEngine, RatioMetric, RatioResultSet, RatioValue,
    DEFAULT_TAX_RATE,
};
pub use error::{FinancialRatioError, Result};
pub use extraction::{parse_extraction_response, target_entities, ExtractedEntities, ExtractionStatus};
pub use protected::{apply_protected, ProtectedEntities};
pub use report::{RatioLine, RatioReport};
pub use sanitize::{assess, assess_snapshot, sanitize, sanitize_opt, Provenance};
pub use schema::*;
pub use sheet::{EntitySheet, ExtractionStamp, LockState};
pub use utils::format_fixed2;

use log::info;

/// Sanitizes a snapshot, overwrites EBITDA/PBIT with their derived values and
/// computes the ratio catalogue with the default tax rate.
///
/// Returns the normalized snapshot alongside the ratios so callers can show
/// exactly what the ratios were computed from.
pub fn process_snapshot(values: &EntitySnapshot) -> (EntitySnapshot, RatioResultSet) {
    process_snapshot_with(values, &RatioEngine::default())
}

pub fn process_snapshot_with(
    values: &EntitySnapshot,
    engine: &RatioEngine,
) -> (EntitySnapshot, RatioResultSet) {
    info!(
        "Processing snapshot with {} supplied entities",
        values.len()
    );
    let mut normalized = values.clone();
    apply_protected(&mut normalized);
    let ratios = engine.compute(&normalized);
    (normalized, ratios)
}
