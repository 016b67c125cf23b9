mod analyze;
mod cli;
mod infra;
mod routes;
mod server;

use solar_verify::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
