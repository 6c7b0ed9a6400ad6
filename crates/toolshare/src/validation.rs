/// Rejected inputs to the pricing and distance calculators.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("risk tier must be 1, 2, or 3 (got {0})")]
    InvalidRiskTier(u8),
    #[error("rental must span at least one day")]
    InvalidDays,
    #[error("daily rate cannot be negative")]
    NegativeRate,
    #[error("rental total is too large to compute")]
    AmountTooLarge,
    #[error("invalid coordinates: {0}")]
    InvalidCoordinates(String),
}
