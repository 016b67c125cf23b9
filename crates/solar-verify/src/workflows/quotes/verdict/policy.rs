use std::fmt;

use serde::{Deserialize, Serialize};

use super::super::allocation::CostBreakdown;
use super::super::benchmark::Ruleset;
use super::super::domain::{QuoteField, ValidatedQuote};
use super::super::grade::LetterGrade;
use super::rules::PriceSignals;
use super::Verdict;

/// Closed set of verdict categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictCategory {
    Underpriced,
    GoodValue,
    Overpriced,
    Incomplete,
}

impl VerdictCategory {
    pub fn label(self) -> &'static str {
        match self {
            VerdictCategory::Underpriced => "Unusually low price",
            VerdictCategory::GoodValue => "Good value",
            VerdictCategory::Overpriced => "Overpriced",
            VerdictCategory::Incomplete => "Incomplete quote",
        }
    }

    /// How much attention the homeowner should pay; higher is more severe.
    pub fn severity(self) -> u8 {
        match self {
            VerdictCategory::GoodValue => 0,
            VerdictCategory::Underpriced => 1,
            VerdictCategory::Overpriced => 2,
            VerdictCategory::Incomplete => 3,
        }
    }
}

impl fmt::Display for VerdictCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Two underpriced votes win outright; otherwise any overpriced condition decides.
pub(crate) fn decide_category(signals: &PriceSignals) -> VerdictCategory {
    if signals.underpriced_votes() >= 2 {
        return VerdictCategory::Underpriced;
    }

    if signals.any_overpriced() {
        return VerdictCategory::Overpriced;
    }

    VerdictCategory::GoodValue
}

pub(crate) fn incomplete(ruleset: &Ruleset, missing: Vec<QuoteField>) -> Verdict {
    let category = VerdictCategory::Incomplete;
    let summary = if missing.is_empty() {
        "Quote values are too large to price; no grade was assigned.".to_string()
    } else {
        let fields = missing
            .iter()
            .map(|field| field.key())
            .collect::<Vec<_>>()
            .join(", ");
        format!("Quote is missing {fields}; no grade was assigned.")
    };

    Verdict {
        category,
        label: category.label().to_string(),
        rank: category.severity(),
        grade: None,
        summary,
        solar: None,
        battery: None,
        signals: None,
        recommendations: recommendations(category, ruleset, &missing),
        missing_fields: missing,
        ruleset: ruleset.name.clone(),
    }
}

pub(crate) fn summary(
    category: VerdictCategory,
    grade: LetterGrade,
    quote: &ValidatedQuote,
    breakdown: &CostBreakdown,
) -> String {
    let per_kwp = breakdown.price_per_kwp;
    let size = quote.system_size_kw;

    if category == VerdictCategory::Underpriced {
        return format!(
            "Priced well below market. £{per_kwp:.0}/kWp is unusually low for a {size}kW system - confirm what is included before signing."
        );
    }

    match grade {
        LetterGrade::APlus | LetterGrade::A => match breakdown.total_capacity_kwh {
            Some(capacity) => format!(
                "Excellent value system with battery storage. At £{per_kwp:.0}/kWp, this is competitive pricing for a {size}kW system with {capacity:.1}kWh of storage."
            ),
            None => format!(
                "Excellent value for money. £{per_kwp:.0}/kWp is competitive pricing for a {size}kW solar system."
            ),
        },
        LetterGrade::B => format!(
            "Good value system. £{per_kwp:.0}/kWp is within the acceptable market range for a {size}kW system."
        ),
        LetterGrade::C => format!(
            "Fair pricing but room for improvement. £{per_kwp:.0}/kWp is above average - consider getting additional quotes."
        ),
        LetterGrade::D => format!(
            "Above market rate. £{per_kwp:.0}/kWp is expensive for a {size}kW system - definitely get more quotes."
        ),
        LetterGrade::F => format!(
            "Overpriced system. £{per_kwp:.0}/kWp is significantly above market rate."
        ),
    }
}

/// Next checks for the homeowner. Depends only on the category, the missing fields, and the
/// ruleset's published midpoints.
pub(crate) fn recommendations(
    category: VerdictCategory,
    ruleset: &Ruleset,
    missing: &[QuoteField],
) -> Vec<String> {
    match category {
        VerdictCategory::Underpriced => vec![
            "Ask the installer for an itemised breakdown of panels, inverter, battery and labour"
                .to_string(),
            "Confirm MCS certification and RECC membership before paying a deposit".to_string(),
            "Check the quoted components match the datasheet models and warranty terms"
                .to_string(),
        ],
        VerdictCategory::GoodValue => vec![
            "Confirm the quote includes scaffolding, DNO notification and commissioning"
                .to_string(),
            "Get panel, inverter and workmanship warranty lengths in writing".to_string(),
        ],
        VerdictCategory::Overpriced => vec![
            "Get at least two comparison quotes from MCS-certified installers".to_string(),
            format!(
                "Negotiate towards the market midpoint of £{:.0}/kWp",
                ruleset.solar_market_per_kwp.midpoint()
            ),
            "Ask which line items drive the premium over typical pricing".to_string(),
        ],
        VerdictCategory::Incomplete if missing.is_empty() => vec![
            "Check the system size is in kW and the total price is in pounds".to_string(),
        ],
        VerdictCategory::Incomplete => missing
            .iter()
            .map(|field| match field {
                QuoteField::SystemSizeKw => {
                    "Provide the system size in kW (system_size_kw must be greater than 0)"
                        .to_string()
                }
                QuoteField::TotalPrice => {
                    "Provide the total quoted price (total_price must be greater than 0)"
                        .to_string()
                }
            })
            .collect(),
    }
}
