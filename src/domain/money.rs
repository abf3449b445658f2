//! Monetary types for price and volume representation.

use rust_decimal::Decimal;

/// Price represented as a Decimal for precision.
pub type Price = Decimal;

/// Volume represented as a Decimal for precision.
pub type Volume = Decimal;

/// Price below which exit levels keep four decimal places instead of two.
pub const FINE_TICK_BELOW: Decimal = Decimal::TEN;

/// Round a price level to the precision appropriate for its magnitude.
///
/// Cheap assets keep 4 dp so that stop and target never collapse onto the
/// entry price; everything else rounds to cents.
#[must_use]
pub fn round_level(price: Price, reference: Price) -> Price {
    if reference.abs() < FINE_TICK_BELOW {
        price.round_dp(4)
    } else {
        price.round_dp(2)
    }
}
