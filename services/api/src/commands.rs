use crate::infra::{build_refund_processor, parse_coordinates};
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use toolshare::config::{AppConfig, ConfigError};
use toolshare::error::AppError;
use toolshare::geo::{haversine_miles, Coordinates};
use toolshare::pricing::{compute_price, RiskTier};
use toolshare::refunds::PassReport;
use toolshare::telemetry;

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Daily rental rate in dollars
    #[arg(long)]
    pub(crate) daily_rate: Decimal,
    /// Rental length in days
    #[arg(long)]
    pub(crate) days: u32,
    /// Risk tier of the item (1 = low, 2 = medium, 3 = high)
    #[arg(long, value_parser = parse_risk_tier)]
    pub(crate) risk_tier: RiskTier,
}

#[derive(Args, Debug)]
pub(crate) struct DistanceArgs {
    /// Origin as LAT,LNG
    #[arg(long, value_parser = parse_coordinates, allow_hyphen_values = true)]
    pub(crate) from: Coordinates,
    /// Destination as LAT,LNG
    #[arg(long, value_parser = parse_coordinates, allow_hyphen_values = true)]
    pub(crate) to: Coordinates,
}

fn parse_risk_tier(raw: &str) -> Result<RiskTier, String> {
    let value = raw
        .trim()
        .parse::<u8>()
        .map_err(|err| format!("failed to parse '{raw}' as a risk tier ({err})"))?;
    RiskTier::try_from(value).map_err(|err| err.to_string())
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let result = compute_price(args.daily_rate, args.days, args.risk_tier)?;
    print_json(&result);
    Ok(())
}

pub(crate) fn run_distance(args: DistanceArgs) -> Result<(), AppError> {
    let miles = haversine_miles(args.from, args.to)?;
    print_json(&json!({ "miles": miles }));
    Ok(())
}

/// One refund pass against the configured collaborators.
pub(crate) async fn run_refund_pass() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    // stdout carries the JSON report
    telemetry::init_with_writer(&config.telemetry, std::io::stderr)?;

    let processor =
        build_refund_processor(&config.refunds)?.ok_or(ConfigError::RefundsDisabled)?;

    let payload = match processor.run_pass().await? {
        PassReport::NoPending => json!({ "message": "No pending refunds" }),
        PassReport::Processed(results) => json!({ "results": results }),
    };
    print_json(&payload);
    Ok(())
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{rendered}"),
        Err(err) => eprintln!("failed to render output: {err}"),
    }
}
