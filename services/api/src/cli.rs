use crate::analyze::{run_analyze, AnalyzeArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use solar_verify::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "SolarVerify",
    about = "Grade solar and battery installation quotes and serve the SolarVerify API",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Analyse a single quote and print the breakdown and verdict
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Analyze(args) => run_analyze(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_optional() {
        let cli = Cli::try_parse_from(["solar-verify-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn analyze_parses_battery_options() {
        let cli = Cli::try_parse_from([
            "solar-verify-api",
            "analyze",
            "--system-size-kw",
            "5",
            "--total-price",
            "15000",
            "--battery",
            "tesla-powerwall-3",
            "--battery-quantity",
            "2",
            "--json",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Analyze(args)) => {
                assert_eq!(args.system_size_kw, 5.0);
                assert_eq!(args.battery.as_deref(), Some("tesla-powerwall-3"));
                assert_eq!(args.battery_quantity, 2);
                assert!(args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
