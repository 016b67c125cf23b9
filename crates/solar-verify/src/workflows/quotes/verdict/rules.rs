use serde::{Deserialize, Serialize};

use super::super::allocation::CostBreakdown;
use super::super::benchmark::{PriceBand, PriceTier, Ruleset};
use super::super::domain::ValidatedQuote;
use super::super::grade::LetterGrade;
use super::{ComponentAssessment, PricedComponent};

/// Independent price signals behind the category decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSignals {
    pub solar_below_low: bool,
    /// `None` when the quote has no battery or its capacity is unknown.
    #[serde(default)]
    pub battery_below_low: Option<bool>,
    pub total_well_below_expected: bool,
    pub solar_above_high: bool,
    #[serde(default)]
    pub battery_above_high: Option<bool>,
    pub total_well_above_expected: bool,
    pub expected_total: f64,
}

impl PriceSignals {
    pub fn underpriced_votes(&self) -> usize {
        [
            self.solar_below_low,
            self.battery_below_low.unwrap_or(false),
            self.total_well_below_expected,
        ]
        .into_iter()
        .filter(|signal| *signal)
        .count()
    }

    pub fn any_overpriced(&self) -> bool {
        self.solar_above_high
            || self.battery_above_high.unwrap_or(false)
            || self.total_well_above_expected
    }
}

/// Lower edge inclusive; below the first tier is the best grade, at or above the last is the worst.
pub(crate) fn tier_for(tiers: &[PriceTier], value: f64) -> Option<&PriceTier> {
    tiers
        .iter()
        .rev()
        .find(|tier| value >= tier.min)
        .or_else(|| tiers.first())
}

fn assess(
    component: PricedComponent,
    tiers: &[PriceTier],
    market: PriceBand,
    unit_price: f64,
) -> ComponentAssessment {
    let (grade, description) = match tier_for(tiers, unit_price) {
        Some(tier) => (tier.grade, tier.description.clone()),
        None => (LetterGrade::C, "No benchmark tiers configured".to_string()),
    };
    let midpoint = market.midpoint();
    ComponentAssessment {
        component,
        unit_price,
        market_midpoint: midpoint,
        percent_of_market: if midpoint > 0.0 {
            unit_price / midpoint * 100.0
        } else {
            0.0
        },
        grade,
        description,
    }
}

pub(crate) fn assess_solar(ruleset: &Ruleset, breakdown: &CostBreakdown) -> ComponentAssessment {
    assess(
        PricedComponent::Solar,
        &ruleset.solar_tiers,
        ruleset.solar_market_per_kwp,
        breakdown.price_per_kwp,
    )
}

pub(crate) fn assess_battery(
    ruleset: &Ruleset,
    breakdown: &CostBreakdown,
) -> Option<ComponentAssessment> {
    breakdown.price_per_kwh.map(|per_kwh| {
        assess(
            PricedComponent::Battery,
            &ruleset.battery_tiers,
            ruleset.battery_market_per_kwh,
            per_kwh,
        )
    })
}

/// Mid-market price of the same installation: solar at the band midpoint, storage at the
/// per-kWh midpoint (or the allocator's estimate when capacity is unknown), plus the fee.
pub(crate) fn expected_total(
    ruleset: &Ruleset,
    quote: &ValidatedQuote,
    breakdown: &CostBreakdown,
) -> f64 {
    let solar = quote.system_size_kw * ruleset.solar_market_per_kwp.midpoint();
    let battery = match (quote.battery.is_some(), breakdown.total_capacity_kwh) {
        (false, _) => 0.0,
        (true, Some(capacity)) => capacity * ruleset.battery_market_per_kwh.midpoint(),
        (true, None) => breakdown.battery_cost,
    };
    solar + battery + breakdown.installation_cost
}

pub(crate) fn price_signals(
    ruleset: &Ruleset,
    quote: &ValidatedQuote,
    breakdown: &CostBreakdown,
) -> PriceSignals {
    let thresholds = &ruleset.signals;
    let expected_total = expected_total(ruleset, quote, breakdown);
    let battery_price = breakdown
        .price_per_kwh
        .filter(|_| quote.battery.is_some());

    PriceSignals {
        solar_below_low: breakdown.price_per_kwp < thresholds.solar_low_per_kwp,
        battery_below_low: battery_price.map(|price| price < thresholds.battery_low_per_kwh),
        total_well_below_expected: quote.total_price
            < expected_total * (1.0 - thresholds.underpriced_margin),
        solar_above_high: breakdown.price_per_kwp > thresholds.solar_high_per_kwp,
        battery_above_high: battery_price.map(|price| price > thresholds.battery_high_per_kwh),
        total_well_above_expected: quote.total_price
            > expected_total * (1.0 + thresholds.overpriced_margin),
        expected_total,
    }
}
