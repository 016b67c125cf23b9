use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::allocation::{BatteryEstimate, CostAllocator, CostBreakdown, SolarCostFallback};
use super::benchmark::{
    BenchmarkSource, InstallerBand, PriceBand, PriceTier, OTHER_BATTERY_ID,
};
use super::domain::{QuoteInput, QuoteSummary, QuoteValidationError, ValidatedQuote};
use super::verdict::{Verdict, VerdictEngine};
use crate::workflows::usage::AnalysisCounter;

/// Everything produced for one quote. This is also the snapshot a magic link carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteAnalysis {
    pub quote: QuoteSummary,
    pub breakdown: CostBreakdown,
    pub verdict: Verdict,
    pub analyzed_at: DateTime<Utc>,
}

/// Analysis returned to the quote form, with the requester's running count when tracked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedAnalysis {
    #[serde(flatten)]
    pub analysis: QuoteAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_count: Option<u32>,
}

/// Catalogue row exposed to quote forms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatteryOption {
    pub id: String,
    pub label: String,
    pub capacity_kwh: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fair_price: Option<PriceBand>,
}

/// Published benchmark tables of the active ruleset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingBenchmarksView {
    pub ruleset: String,
    pub installers: Vec<InstallerBand>,
    pub solar_market_per_kwp: PriceBand,
    pub battery_market_per_kwh: PriceBand,
    pub solar_tiers: Vec<PriceTier>,
    pub battery_tiers: Vec<PriceTier>,
}

/// Facade over the allocator and verdict engine backed by a benchmark source.
pub struct QuoteAnalysisService<B> {
    benchmarks: Arc<B>,
    engine: VerdictEngine,
    usage: Option<Arc<dyn AnalysisCounter>>,
}

impl<B> QuoteAnalysisService<B>
where
    B: BenchmarkSource + 'static,
{
    pub fn new(benchmarks: Arc<B>, fallback: SolarCostFallback) -> Self {
        Self {
            benchmarks,
            engine: VerdictEngine::new(CostAllocator::new(fallback)),
            usage: None,
        }
    }

    /// Count analyses that carry a requester identifier.
    pub fn with_usage(mut self, counter: Arc<dyn AnalysisCounter>) -> Self {
        self.usage = Some(counter);
        self
    }

    /// Analyse a quote, rejecting missing, non-positive or unpriceable inputs.
    pub fn analyze(&self, input: QuoteInput) -> Result<QuoteAnalysis, QuoteAnalysisError> {
        let quote = input.validate()?;
        let ruleset = self.benchmarks.ruleset();

        let breakdown = self.engine.price(ruleset, &quote)?;
        if breakdown.fallback_applied {
            debug!(
                total_price = quote.total_price,
                battery_cost = breakdown.battery_cost,
                policy = ?self.engine.allocator().fallback(),
                "component estimates exceeded quoted total"
            );
        }
        let verdict = self.engine.classify(ruleset, &quote, &breakdown);

        info!(
            ruleset = %ruleset.name,
            category = ?verdict.category,
            grade = verdict.grade.map(|grade| grade.label()).unwrap_or("-"),
            price_per_kwp = breakdown.price_per_kwp,
            "quote analysed"
        );

        Ok(QuoteAnalysis {
            quote: summarize(&quote, &breakdown),
            breakdown,
            verdict,
            analyzed_at: Utc::now(),
        })
    }

    /// Analyse a quote and count it against `user_email` when usage tracking is enabled.
    /// Counting is best effort: a failing usage store never fails the analysis.
    pub fn analyze_tracked(
        &self,
        input: QuoteInput,
    ) -> Result<TrackedAnalysis, QuoteAnalysisError> {
        let requester = input.user_email.clone();
        let analysis = self.analyze(input)?;

        let analysis_count = match (&self.usage, requester.as_deref()) {
            (Some(counter), Some(requester)) => counter
                .count_analysis(requester)
                .unwrap_or_else(|error| {
                    warn!(%error, "analysis count unavailable");
                    None
                }),
            _ => None,
        };

        Ok(TrackedAnalysis {
            analysis,
            analysis_count,
        })
    }

    pub fn battery_options(&self) -> Vec<BatteryOption> {
        let ruleset = self.benchmarks.ruleset();
        ruleset
            .batteries
            .iter()
            .map(|battery| BatteryOption {
                id: battery.id.clone(),
                label: battery.label.clone(),
                capacity_kwh: battery.capacity_kwh,
                fair_price: Some(battery.fair_price),
            })
            .chain(std::iter::once(BatteryOption {
                id: OTHER_BATTERY_ID.to_string(),
                label: "Other (specify capacity)".to_string(),
                capacity_kwh: 0.0,
                fair_price: None,
            }))
            .collect()
    }

    pub fn pricing_benchmarks(&self) -> PricingBenchmarksView {
        let ruleset = self.benchmarks.ruleset();
        PricingBenchmarksView {
            ruleset: ruleset.name.clone(),
            installers: ruleset.installers.clone(),
            solar_market_per_kwp: ruleset.solar_market_per_kwp,
            battery_market_per_kwh: ruleset.battery_market_per_kwh,
            solar_tiers: ruleset.solar_tiers.clone(),
            battery_tiers: ruleset.battery_tiers.clone(),
        }
    }
}

fn summarize(quote: &ValidatedQuote, breakdown: &CostBreakdown) -> QuoteSummary {
    let battery_label = match &breakdown.battery_estimate {
        BatteryEstimate::Catalogue { label, .. } => Some(label.clone()),
        BatteryEstimate::NoBattery => None,
        _ => quote
            .battery
            .as_ref()
            .map(|battery| {
                battery
                    .identifier
                    .clone()
                    .unwrap_or_else(|| "Unspecified battery".to_string())
            }),
    };

    QuoteSummary {
        system_size_kw: quote.system_size_kw,
        total_price: quote.total_price,
        has_battery: quote.battery.is_some(),
        battery_label,
        battery_quantity: quote.battery.as_ref().map_or(0, |battery| battery.quantity),
        total_capacity_kwh: breakdown.total_capacity_kwh,
    }
}

/// Error raised by the quote analysis service.
#[derive(Debug, thiserror::Error)]
pub enum QuoteAnalysisError {
    #[error(transparent)]
    Validation(#[from] QuoteValidationError),
}
