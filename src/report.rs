use crate::engine::{RatioEngine, RatioMetric, RatioResultSet};
use crate::sanitize::{assess_snapshot, Provenance};
use crate::schema::{CanonicalEntity, EntitySnapshot};
use crate::sheet::EntitySheet;
use chrono::{DateTime, Utc};
use log::info;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RatioLine {
    #[schemars(description = "Metric label, e.g. 'ROE (%)'")]
    pub metric: RatioMetric,

    #[schemars(description = "Value formatted with exactly two decimal places, e.g. '12.50'")]
    pub value: String,
}

/// Computed ratios together with what was actually known about each input.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RatioReport {
    #[schemars(description = "When the report was computed")]
    pub generated_at: DateTime<Utc>,

    #[schemars(description = "Document the inputs were last extracted from, if any")]
    pub source: Option<String>,

    #[schemars(description = "Tax rate used for ROA")]
    pub tax_rate: f64,

    #[schemars(description = "Every metric of the catalogue, in presentation order")]
    pub ratios: Vec<RatioLine>,

    #[schemars(
        description = "Per-entity provenance. Anything other than Present was read as zero."
    )]
    pub provenance: BTreeMap<CanonicalEntity, Provenance>,
}

impl RatioReport {
    pub fn build(values: &EntitySnapshot, engine: &RatioEngine) -> Self {
        let result = engine.compute(values);
        let mut provenance = assess_snapshot(values);
        // The engine derives these itself, so their input state is irrelevant.
        provenance.insert(CanonicalEntity::Ebitda, Provenance::Present);
        provenance.insert(CanonicalEntity::Pbit, Provenance::Present);

        let report = Self {
            generated_at: Utc::now(),
            source: None,
            tax_rate: engine.config().tax_rate,
            ratios: lines(&result),
            provenance,
        };
        info!(
            "Built ratio report: {} metrics, {} defaulted inputs",
            report.ratios.len(),
            report.defaulted_entities().len()
        );
        report
    }

    pub fn from_sheet(sheet: &EntitySheet, engine: &RatioEngine) -> Self {
        let mut report = Self::build(&sheet.snapshot(), engine);
        report.source = sheet.last_extraction().map(|stamp| stamp.source.clone());
        report
    }

    /// Entities whose value was missing or unusable and therefore read as zero.
    pub fn defaulted_entities(&self) -> Vec<CanonicalEntity> {
        self.provenance
            .iter()
            .filter(|(_, p)| **p != Provenance::Present)
            .map(|(entity, _)| *entity)
            .collect()
    }

    pub fn get(&self, metric: RatioMetric) -> Option<&str> {
        self.ratios
            .iter()
            .find(|line| line.metric == metric)
            .map(|line| line.value.as_str())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RatioReport)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str("Metric,Value\n");

        for line in &self.ratios {
            output.push_str(&format!("\"{}\",{}\n", line.metric.label(), line.value));
        }

        output
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str("# Financial Ratios\n\n");
        if let Some(source) = &self.source {
            output.push_str(&format!("**Source:** {}\n\n", source));
        }
        output.push_str(&format!("**Tax Rate:** {:.2}\n\n", self.tax_rate));

        output.push_str("| Metric | Value |\n|---|---|\n");
        for line in &self.ratios {
            output.push_str(&format!("| {} | {} |\n", line.metric.label(), line.value));
        }
        output.push('\n');

        let defaulted = self.defaulted_entities();
        if !defaulted.is_empty() {
            output.push_str("## Inputs Read As Zero\n\n");
            for entity in defaulted {
                output.push_str(&format!("- {} ({:?})\n", entity, self.provenance[&entity]));
            }
            output.push('\n');
        }

        output
    }
}

fn lines(result: &RatioResultSet) -> Vec<RatioLine> {
    result
        .iter()
        .map(|(metric, value)| RatioLine {
            metric,
            value: value.to_string(),
        })
        .collect()
}
