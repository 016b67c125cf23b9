use clap::Args;
use solar_verify::config::ConfigError;
use solar_verify::error::AppError;
use solar_verify::workflows::quotes::{
    QuoteAnalysis, QuoteAnalysisService, QuoteInput, Ruleset, SolarCostFallback,
    StaticBenchmarks,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct AnalyzeArgs {
    /// System size in kWp
    #[arg(long)]
    pub(crate) system_size_kw: f64,
    /// Total quoted price in GBP
    #[arg(long)]
    pub(crate) total_price: f64,
    /// Battery catalogue id or label; use "other" for an unlisted battery
    #[arg(long)]
    pub(crate) battery: Option<String>,
    /// Number of battery units
    #[arg(long, default_value_t = 1)]
    pub(crate) battery_quantity: u32,
    /// Capacity per battery unit in kWh
    #[arg(long)]
    pub(crate) battery_capacity_kwh: Option<f64>,
    /// Benchmark ruleset (uk-2025 or uk-2024-legacy)
    #[arg(long, default_value = Ruleset::CANONICAL)]
    pub(crate) ruleset: String,
    /// Replace a negative solar cost with 60% of the total instead of clamping it to zero
    #[arg(long)]
    pub(crate) share_of_total_fallback: bool,
    /// Print the full analysis as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

impl AnalyzeArgs {
    fn quote(&self) -> QuoteInput {
        let quote = QuoteInput::solar_only(self.system_size_kw, self.total_price);
        match &self.battery {
            Some(battery) => quote.with_battery(
                battery.clone(),
                self.battery_quantity,
                self.battery_capacity_kwh,
            ),
            None => quote,
        }
    }
}

pub(crate) fn run_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let benchmarks = StaticBenchmarks::named(&args.ruleset)
        .ok_or_else(|| ConfigError::UnknownRuleset(args.ruleset.clone()))?;
    let fallback = if args.share_of_total_fallback {
        SolarCostFallback::ShareOfTotal
    } else {
        SolarCostFallback::FloorAtZero
    };

    let service = QuoteAnalysisService::new(Arc::new(benchmarks), fallback);
    let analysis = service.analyze(args.quote())?;

    if args.json {
        match serde_json::to_string_pretty(&analysis) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Analysis payload unavailable: {err}"),
        }
    } else {
        render_analysis(&analysis);
    }

    Ok(())
}

fn render_analysis(analysis: &QuoteAnalysis) {
    let QuoteAnalysis {
        quote,
        breakdown,
        verdict,
        ..
    } = analysis;

    println!("SolarVerify quote analysis ({})", verdict.ruleset);
    println!(
        "  System: {}kW for £{:.0}",
        quote.system_size_kw, quote.total_price
    );
    if let Some(label) = &quote.battery_label {
        println!("  Battery: {} x {}", quote.battery_quantity, label);
    }

    println!("\nCost breakdown");
    println!("  Solar:        £{:.0}", breakdown.solar_cost);
    println!("  Battery:      £{:.0}", breakdown.battery_cost);
    println!("  Installation: £{:.0}", breakdown.installation_cost);
    println!("  Per kWp:      £{:.0}", breakdown.price_per_kwp);
    if let Some(per_kwh) = breakdown.price_per_kwh {
        println!("  Per kWh:      £{per_kwh:.0}");
    }
    if breakdown.fallback_applied {
        println!("  Note: component estimates exceeded the total; solar cost fallback applied");
    }

    println!("\nVerdict");
    match verdict.grade {
        Some(grade) => println!("  Grade: {grade}"),
        None => println!("  Grade: not assigned"),
    }
    println!("  Category: {}", verdict.label);
    println!("  {}", verdict.summary);

    println!("\nRecommendations");
    for line in &verdict.recommendations {
        println!("  - {line}");
    }
}
