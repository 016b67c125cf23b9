use serde::{Deserialize, Serialize};

use super::benchmark::{BatteryLookup, Ruleset};
use super::domain::{BatterySpec, ValidatedQuote};

/// Share of the total price attributed to solar when the component estimates exceed the quote.
pub const FALLBACK_SOLAR_SHARE: f64 = 0.6;

/// What to do when `total - battery - installation` comes out negative.
///
/// `FloorAtZero` keeps solar cost continuous in the quoted total, so raising the price never
/// improves the grade. `ShareOfTotal` jumps from `0.6 * total` down to the small positive residual
/// where the subtraction crosses zero, which can make a dearer quote grade better.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SolarCostFallback {
    /// Substitute `total_price * 0.6` so the solar grade ignores the battery estimate.
    ShareOfTotal,
    /// Clamp solar cost to zero and keep the battery estimate.
    #[default]
    FloorAtZero,
}

impl SolarCostFallback {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "share-of-total" | "share_of_total" => Some(Self::ShareOfTotal),
            "floor" | "floor-at-zero" => Some(Self::FloorAtZero),
            _ => None,
        }
    }
}

/// How the battery portion of the quote was priced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum BatteryEstimate {
    NoBattery,
    Catalogue { id: String, label: String },
    CapacityRate { per_kwh: f64 },
    FlatUnitRate { per_unit: f64 },
}

/// Split of the quoted total into solar, battery, and installation components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub solar_cost: f64,
    pub battery_cost: f64,
    pub installation_cost: f64,
    pub price_per_kwp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_kwh: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_capacity_kwh: Option<f64>,
    pub battery_estimate: BatteryEstimate,
    /// Set when the subtraction went negative and the configured fallback was used; the three
    /// components then no longer sum to the total.
    #[serde(default)]
    pub fallback_applied: bool,
}

impl CostBreakdown {
    pub fn component_total(&self) -> f64 {
        self.solar_cost + self.battery_cost + self.installation_cost
    }

    /// False when an extreme input overflowed one of the derived figures.
    pub fn is_finite(&self) -> bool {
        [
            self.solar_cost,
            self.battery_cost,
            self.installation_cost,
            self.price_per_kwp,
        ]
        .into_iter()
        .chain(self.price_per_kwh)
        .chain(self.total_capacity_kwh)
        .all(f64::is_finite)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CostAllocator {
    fallback: SolarCostFallback,
}

struct BatteryCost {
    cost: f64,
    capacity_kwh: Option<f64>,
    estimate: BatteryEstimate,
}

impl CostAllocator {
    pub fn new(fallback: SolarCostFallback) -> Self {
        Self { fallback }
    }

    pub fn fallback(&self) -> SolarCostFallback {
        self.fallback
    }

    pub fn allocate(&self, quote: &ValidatedQuote, ruleset: &Ruleset) -> CostBreakdown {
        let battery = match &quote.battery {
            Some(spec) => estimate_battery(spec, ruleset),
            None => BatteryCost {
                cost: 0.0,
                capacity_kwh: None,
                estimate: BatteryEstimate::NoBattery,
            },
        };
        let installation_cost = if quote.battery.is_some() {
            ruleset.installation_fee
        } else {
            0.0
        };

        let residual = quote.total_price - battery.cost - installation_cost;
        let (solar_cost, fallback_applied) = if residual >= 0.0 {
            (residual, false)
        } else {
            match self.fallback {
                SolarCostFallback::ShareOfTotal => {
                    (quote.total_price * FALLBACK_SOLAR_SHARE, true)
                }
                SolarCostFallback::FloorAtZero => (0.0, true),
            }
        };

        let price_per_kwh = battery
            .capacity_kwh
            .filter(|capacity| *capacity > 0.0)
            .map(|capacity| battery.cost / capacity);

        CostBreakdown {
            solar_cost,
            battery_cost: battery.cost,
            installation_cost,
            price_per_kwp: solar_cost / quote.system_size_kw,
            price_per_kwh,
            total_capacity_kwh: battery.capacity_kwh,
            battery_estimate: battery.estimate,
            fallback_applied,
        }
    }
}

fn estimate_battery(spec: &BatterySpec, ruleset: &Ruleset) -> BatteryCost {
    let quantity = f64::from(spec.quantity);
    match ruleset.find_battery(spec.identifier.as_deref()) {
        BatteryLookup::Catalogue(battery) => BatteryCost {
            cost: battery.fair_price.midpoint() * quantity,
            capacity_kwh: Some(spec.capacity_kwh.unwrap_or(battery.capacity_kwh) * quantity),
            estimate: BatteryEstimate::Catalogue {
                id: battery.id.clone(),
                label: battery.label.clone(),
            },
        },
        BatteryLookup::Custom | BatteryLookup::Unknown => match spec.capacity_kwh {
            Some(capacity) => BatteryCost {
                cost: capacity * quantity * ruleset.custom_battery_per_kwh,
                capacity_kwh: Some(capacity * quantity),
                estimate: BatteryEstimate::CapacityRate {
                    per_kwh: ruleset.custom_battery_per_kwh,
                },
            },
            None => BatteryCost {
                cost: ruleset.unknown_battery_unit_cost * quantity,
                capacity_kwh: None,
                estimate: BatteryEstimate::FlatUnitRate {
                    per_unit: ruleset.unknown_battery_unit_cost,
                },
            },
        },
    }
}
