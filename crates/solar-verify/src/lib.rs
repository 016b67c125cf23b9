//! Quote verdict engine and token-gated report delivery for SolarVerify.
//!
//! `workflows::quotes` turns a submitted installation quote into a cost breakdown and a
//! fairness verdict. `workflows::delivery` wraps that verdict in a signed magic link and makes
//! sure the report email fires at most once per link.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
