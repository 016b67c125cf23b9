mod policy;
mod rules;

pub use policy::VerdictCategory;
pub use rules::PriceSignals;

use serde::{Deserialize, Serialize};

use super::allocation::{CostAllocator, CostBreakdown};
use super::benchmark::Ruleset;
use super::domain::{QuoteField, QuoteInput, QuoteValidationError, ValidatedQuote};
use super::grade::LetterGrade;

/// Which part of the installation a component assessment covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricedComponent {
    /// Priced per kWp.
    Solar,
    /// Priced per kWh.
    Battery,
}

/// Tier-table reading for one component of the quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentAssessment {
    pub component: PricedComponent,
    pub unit_price: f64,
    pub market_midpoint: f64,
    pub percent_of_market: f64,
    pub grade: LetterGrade,
    pub description: String,
}

/// Fairness classification of a quote. Built once per analysis and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub category: VerdictCategory,
    pub label: String,
    pub rank: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<LetterGrade>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solar: Option<ComponentAssessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<ComponentAssessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signals: Option<PriceSignals>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<QuoteField>,
    pub recommendations: Vec<String>,
    pub ruleset: String,
}

/// Verdict plus the breakdown it was derived from, when the quote was complete enough to price.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub breakdown: Option<CostBreakdown>,
    pub verdict: Verdict,
}

/// Stateless classifier combining the tier tables and the multi-signal rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerdictEngine {
    allocator: CostAllocator,
}

impl VerdictEngine {
    pub fn new(allocator: CostAllocator) -> Self {
        Self { allocator }
    }

    pub fn allocator(&self) -> &CostAllocator {
        &self.allocator
    }

    /// Classify raw input. Missing or non-positive required fields short-circuit to
    /// `Incomplete` before any numeric work; so do quotes whose derived prices overflow.
    pub fn assess(&self, ruleset: &Ruleset, input: &QuoteInput) -> Assessment {
        let missing = input.missing_fields();
        if !missing.is_empty() {
            return Assessment {
                breakdown: None,
                verdict: policy::incomplete(ruleset, missing),
            };
        }

        let priced = input.validate().and_then(|quote| {
            let breakdown = self.price(ruleset, &quote)?;
            Ok((quote, breakdown))
        });
        match priced {
            Ok((quote, breakdown)) => {
                let verdict = self.classify(ruleset, &quote, &breakdown);
                Assessment {
                    breakdown: Some(breakdown),
                    verdict,
                }
            }
            Err(error) => Assessment {
                breakdown: None,
                verdict: policy::incomplete(ruleset, error.fields()),
            },
        }
    }

    /// Allocate costs, refusing breakdowns that would not survive serialization.
    pub fn price(
        &self,
        ruleset: &Ruleset,
        quote: &ValidatedQuote,
    ) -> Result<CostBreakdown, QuoteValidationError> {
        let breakdown = self.allocator.allocate(quote, ruleset);
        if breakdown.is_finite() {
            Ok(breakdown)
        } else {
            Err(QuoteValidationError::Unpriceable)
        }
    }

    pub fn classify(
        &self,
        ruleset: &Ruleset,
        quote: &ValidatedQuote,
        breakdown: &CostBreakdown,
    ) -> Verdict {
        let solar = rules::assess_solar(ruleset, breakdown);
        let battery = rules::assess_battery(ruleset, breakdown);
        let grade = match &battery {
            Some(battery) => solar.grade.combine(battery.grade),
            None => solar.grade,
        };
        let signals = rules::price_signals(ruleset, quote, breakdown);
        let category = policy::decide_category(&signals);

        Verdict {
            category,
            label: category.label().to_string(),
            rank: category.severity(),
            grade: Some(grade),
            summary: policy::summary(category, grade, quote, breakdown),
            solar: Some(solar),
            battery,
            signals: Some(signals),
            missing_fields: Vec::new(),
            recommendations: policy::recommendations(category, ruleset, &[]),
            ruleset: ruleset.name.clone(),
        }
    }
}
