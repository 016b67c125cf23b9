//! Quote verdict engine: cost allocation, tier grading, and multi-signal classification.
//!
//! A quote is validated, split into solar/battery/installation costs against the active
//! benchmark ruleset, graded per component on the tier tables, and classified into one of the
//! [`VerdictCategory`] values from three independent price signals.

pub mod allocation;
pub mod benchmark;
pub mod domain;
pub mod grade;
pub mod router;
pub mod service;
pub mod verdict;

#[cfg(test)]
mod tests;

pub use allocation::{BatteryEstimate, CostAllocator, CostBreakdown, SolarCostFallback};
pub use benchmark::{
    BatteryBenchmark, BatteryLookup, BenchmarkSource, PriceBand, PriceTier, Ruleset,
    StaticBenchmarks, OTHER_BATTERY_ID,
};
pub use domain::{QuoteField, QuoteInput, QuoteSummary, QuoteValidationError, ValidatedQuote};
pub use grade::LetterGrade;
pub use router::quote_router;
pub use service::{
    BatteryOption, PricingBenchmarksView, QuoteAnalysis, QuoteAnalysisError, QuoteAnalysisService,
    TrackedAnalysis,
};
pub use verdict::{
    Assessment, ComponentAssessment, PriceSignals, PricedComponent, Verdict, VerdictCategory,
    VerdictEngine,
};
