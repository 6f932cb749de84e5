use crate::error::{FinancialRatioError, Result};
use crate::protected::ProtectedEntities;
use crate::sanitize::read_entity;
use crate::schema::{CanonicalEntity, EntitySnapshot};
use crate::utils::{average, format_fixed2, safe_div};
use log::debug;
use schemars::JsonSchema;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_TAX_RATE: f64 = 0.25;

/// The fixed catalogue of computed metrics, in presentation order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum RatioMetric {
    #[serde(rename = "Gross Profit")]
    GrossProfit,
    #[serde(rename = "GP Margin (%)")]
    GrossProfitMargin,
    #[serde(rename = "EBITDA")]
    Ebitda,
    #[serde(rename = "EBITDA Margin (%)")]
    EbitdaMargin,
    #[serde(rename = "PBIT (EBIT)")]
    Pbit,
    #[serde(rename = "PAT Margin (%)")]
    PatMargin,
    #[serde(rename = "ROE (%)")]
    ReturnOnEquity,
    #[serde(rename = "ROCE (%)")]
    ReturnOnCapitalEmployed,
    #[serde(rename = "ROA (%)")]
    ReturnOnAssets,
    #[serde(rename = "Current Ratio")]
    CurrentRatio,
    #[serde(rename = "Quick Ratio")]
    QuickRatio,
    #[serde(rename = "Cash Ratio")]
    CashRatio,
    #[serde(rename = "FA Turnover")]
    FixedAssetTurnover,
    #[serde(rename = "WC Turnover")]
    WorkingCapitalTurnover,
    #[serde(rename = "Total Asset Turnover")]
    TotalAssetTurnover,
    #[serde(rename = "Interest Coverage")]
    InterestCoverage,
    #[serde(rename = "Debt-Equity")]
    DebtEquity,
    #[serde(rename = "Debt-Asset")]
    DebtAsset,
    #[serde(rename = "P/E Ratio")]
    PriceEarnings,
    #[serde(rename = "P/B Ratio")]
    PriceBook,
    #[serde(rename = "EV/EBITDA")]
    EvEbitda,
}

impl RatioMetric {
    pub const ALL: [RatioMetric; 21] = [
        RatioMetric::GrossProfit,
        RatioMetric::GrossProfitMargin,
        RatioMetric::Ebitda,
        RatioMetric::EbitdaMargin,
        RatioMetric::Pbit,
        RatioMetric::PatMargin,
        RatioMetric::ReturnOnEquity,
        RatioMetric::ReturnOnCapitalEmployed,
        RatioMetric::ReturnOnAssets,
        RatioMetric::CurrentRatio,
        RatioMetric::QuickRatio,
        RatioMetric::CashRatio,
        RatioMetric::FixedAssetTurnover,
        RatioMetric::WorkingCapitalTurnover,
        RatioMetric::TotalAssetTurnover,
        RatioMetric::InterestCoverage,
        RatioMetric::DebtEquity,
        RatioMetric::DebtAsset,
        RatioMetric::PriceEarnings,
        RatioMetric::PriceBook,
        RatioMetric::EvEbitda,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RatioMetric::GrossProfit => "Gross Profit",
            RatioMetric::GrossProfitMargin => "GP Margin (%)",
            RatioMetric::Ebitda => "EBITDA",
            RatioMetric::EbitdaMargin => "EBITDA Margin (%)",
            RatioMetric::Pbit => "PBIT (EBIT)",
            RatioMetric::PatMargin => "PAT Margin (%)",
            RatioMetric::ReturnOnEquity => "ROE (%)",
            RatioMetric::ReturnOnCapitalEmployed => "ROCE (%)",
            RatioMetric::ReturnOnAssets => "ROA (%)",
            RatioMetric::CurrentRatio => "Current Ratio",
            RatioMetric::QuickRatio => "Quick Ratio",
            RatioMetric::CashRatio => "Cash Ratio",
            RatioMetric::FixedAssetTurnover => "FA Turnover",
            RatioMetric::WorkingCapitalTurnover => "WC Turnover",
            RatioMetric::TotalAssetTurnover => "Total Asset Turnover",
            RatioMetric::InterestCoverage => "Interest Coverage",
            RatioMetric::DebtEquity => "Debt-Equity",
            RatioMetric::DebtAsset => "Debt-Asset",
            RatioMetric::PriceEarnings => "P/E Ratio",
            RatioMetric::PriceBook => "P/B Ratio",
            RatioMetric::EvEbitda => "EV/EBITDA",
        }
    }
}

impl fmt::Display for RatioMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatioValue {
    pub value: f64,
    pub formatted: String,
}

/// One complete evaluation of the ratio catalogue.
///
/// Serializes as an ordered map of metric label to two-decimal string.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioResultSet {
    values: BTreeMap<RatioMetric, RatioValue>,
}

impl RatioResultSet {
    fn from_values(values: impl IntoIterator<Item = (RatioMetric, f64)>) -> Self {
        let values = values
            .into_iter()
            .map(|(metric, value)| {
                (
                    metric,
                    RatioValue {
                        value,
                        formatted: format_fixed2(value),
                    },
                )
            })
            .collect();
        Self { values }
    }

    /// The formatted string for `metric`.
    pub fn get(&self, metric: RatioMetric) -> &str {
        self.values
            .get(&metric)
            .map(|v| v.formatted.as_str())
            .unwrap_or("0.00")
    }

    /// The unrounded value for `metric`.
    pub fn value(&self, metric: RatioMetric) -> f64 {
        self.values.get(&metric).map(|v| v.value).unwrap_or(0.0)
    }

    pub fn get_by_label(&self, label: &str) -> Option<&str> {
        RatioMetric::ALL
            .iter()
            .find(|m| m.label() == label)
            .map(|m| self.get(*m))
    }

    pub fn iter(&self) -> impl Iterator<Item = (RatioMetric, &str)> {
        self.values
            .iter()
            .map(|(metric, v)| (*metric, v.formatted.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Label to formatted string, in catalogue order.
    pub fn to_labelled_pairs(&self) -> Vec<(&'static str, String)> {
        self.values
            .iter()
            .map(|(metric, v)| (metric.label(), v.formatted.clone()))
            .collect()
    }
}

impl Serialize for RatioResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (metric, v) in &self.values {
            map.serialize_entry(metric.label(), &v.formatted)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EngineConfig {
    #[serde(default = "default_tax_rate")]
    #[schemars(
        description = "Tax rate applied to interest expense in ROA, as a fraction (0.25 = 25%)"
    )]
    pub tax_rate: f64,
}

fn default_tax_rate() -> f64 {
    DEFAULT_TAX_RATE
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tax_rate: DEFAULT_TAX_RATE,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.tax_rate.is_finite() || !(0.0..=1.0).contains(&self.tax_rate) {
            return Err(FinancialRatioError::InvalidTaxRate(self.tax_rate));
        }
        Ok(())
    }
}

/// Stateless evaluator of the ratio catalogue.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatioEngine {
    config: EngineConfig,
}

impl RatioEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_tax_rate(tax_rate: f64) -> Result<Self> {
        Self::new(EngineConfig { tax_rate })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn compute(&self, values: &EntitySnapshot) -> RatioResultSet {
        compute_ratios(values, self.config.tax_rate)
    }
}

/// Computes the full ratio catalogue from a snapshot of raw entity values.
///
/// Never fails: missing or malformed inputs read as zero, and any ratio whose
/// denominator is zero evaluates to zero. EBITDA and PBIT are always derived
/// from Revenue, Operating Expenses, Depreciation and Amortization; any values
/// supplied for them in `values` are ignored.
pub fn compute_ratios(values: &EntitySnapshot, tax_rate: f64) -> RatioResultSet {
    use CanonicalEntity as E;
    let r = |entity: CanonicalEntity| read_entity(values, entity);

    let revenue = r(E::Revenue);
    let ProtectedEntities { ebitda, pbit } = ProtectedEntities::from_snapshot(values);

    let pat = r(E::Pat);
    let interest = r(E::InterestExpense);
    let end_equity = r(E::EndEquity);
    let lt_debt = r(E::LtDebt);
    let total_debt = lt_debt + r(E::StDebt);
    let current_liabilities = r(E::CurrentLiabilities);
    let current_assets = r(E::CurrentAssets);
    let cash = r(E::CashEquivalents);
    let shares = r(E::OutstandingShares);
    let share_price = r(E::SharePrice);

    let gross_profit = revenue - r(E::Cogs);

    let avg_equity = average(r(E::BegEquity), end_equity);
    let capital_employed = end_equity + lt_debt;
    let avg_assets = average(r(E::BegAssets), r(E::EndAssets));
    let avg_fixed_assets = average(r(E::BegFixedAssets), r(E::EndFixedAssets));

    let beg_wc = r(E::BegCurrentAssets) - r(E::BegCurrentLiabs);
    let end_wc = r(E::EndCurrentAssets) - r(E::EndCurrentLiabs);
    let avg_wc = average(beg_wc, end_wc);

    let eps = safe_div(pat, shares);
    let book_value_per_share = if end_equity != 0.0 && shares != 0.0 {
        end_equity / shares
    } else {
        0.0
    };
    let market_cap = share_price * shares;

    debug!(
        "Computing ratios: revenue={}, EBITDA={}, PBIT={}, tax_rate={}",
        revenue, ebitda, pbit, tax_rate
    );

    RatioResultSet::from_values([
        (RatioMetric::GrossProfit, gross_profit),
        (RatioMetric::GrossProfitMargin, safe_div(gross_profit, revenue) * 100.0),
        (RatioMetric::Ebitda, ebitda),
        (RatioMetric::EbitdaMargin, safe_div(ebitda, revenue) * 100.0),
        (RatioMetric::Pbit, pbit),
        (RatioMetric::PatMargin, safe_div(pat, revenue) * 100.0),
        (RatioMetric::ReturnOnEquity, safe_div(pat, avg_equity) * 100.0),
        (
            RatioMetric::ReturnOnCapitalEmployed,
            safe_div(pbit, capital_employed) * 100.0,
        ),
        (
            RatioMetric::ReturnOnAssets,
            safe_div(pat + interest * (1.0 - tax_rate), avg_assets) * 100.0,
        ),
        (
            RatioMetric::CurrentRatio,
            safe_div(current_assets, current_liabilities),
        ),
        (
            RatioMetric::QuickRatio,
            safe_div(current_assets - r(E::Inventories), current_liabilities),
        ),
        (RatioMetric::CashRatio, safe_div(cash, current_liabilities)),
        (
            RatioMetric::FixedAssetTurnover,
            safe_div(revenue, avg_fixed_assets),
        ),
        (RatioMetric::WorkingCapitalTurnover, safe_div(revenue, avg_wc)),
        (
            RatioMetric::TotalAssetTurnover,
            safe_div(revenue, r(E::EndAssets)),
        ),
        (RatioMetric::InterestCoverage, safe_div(pbit, interest)),
        (RatioMetric::DebtEquity, safe_div(total_debt, end_equity)),
        (RatioMetric::DebtAsset, safe_div(total_debt, r(E::TotalAssets))),
        (RatioMetric::PriceEarnings, safe_div(share_price, eps)),
        (
            RatioMetric::PriceBook,
            safe_div(share_price, book_value_per_share),
        ),
        (
            RatioMetric::EvEbitda,
            safe_div(market_cap + total_debt - cash, ebitda),
        ),
    ])
}
