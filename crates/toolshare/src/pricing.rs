//! Rental price breakdown.
//!
//! A renter pays the rent itself plus a per-day peace fund contribution sized
//! by the item's risk tier. The platform fee is reported alongside the totals
//! so owner payouts can be computed from the same quote, but it is never part
//! of what the renter is charged.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Marketplace commission applied to the rental subtotal.
pub const PLATFORM_FEE_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Damage/loss classification of a listed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RiskTier {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl RiskTier {
    /// Peace fund contribution charged for each rental day.
    pub fn daily_fee(self) -> Decimal {
        match self {
            RiskTier::Low => Decimal::ONE,
            RiskTier::Medium => Decimal::from(3),
            RiskTier::High => Decimal::TEN,
        }
    }
}

impl TryFrom<u8> for RiskTier {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RiskTier::Low),
            2 => Ok(RiskTier::Medium),
            3 => Ok(RiskTier::High),
            other => Err(ValidationError::InvalidRiskTier(other)),
        }
    }
}

impl From<RiskTier> for u8 {
    fn from(tier: RiskTier) -> Self {
        tier as u8
    }
}

/// Monetary breakdown of a rental, in dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricingResult {
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub peace_fund_total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub platform_fee: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub final_total: Decimal,
}

/// Computes the breakdown for renting an item at `daily_rate` for `days`.
///
/// `platform_fee` is rounded to whole dollars with ties away from zero and is
/// deliberately left out of `final_total`.
pub fn compute_price(
    daily_rate: Decimal,
    days: u32,
    risk_tier: RiskTier,
) -> Result<PricingResult, ValidationError> {
    if days == 0 {
        return Err(ValidationError::InvalidDays);
    }
    if daily_rate.is_sign_negative() && !daily_rate.is_zero() {
        return Err(ValidationError::NegativeRate);
    }

    let days = Decimal::from(days);
    let subtotal = daily_rate
        .checked_mul(days)
        .ok_or(ValidationError::AmountTooLarge)?;
    let peace_fund_total = risk_tier
        .daily_fee()
        .checked_mul(days)
        .ok_or(ValidationError::AmountTooLarge)?;
    let platform_fee = subtotal
        .checked_mul(PLATFORM_FEE_RATE)
        .ok_or(ValidationError::AmountTooLarge)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let final_total = subtotal
        .checked_add(peace_fund_total)
        .ok_or(ValidationError::AmountTooLarge)?;

    Ok(PricingResult {
        subtotal,
        peace_fund_total,
        platform_fee,
        final_total,
    })
}
