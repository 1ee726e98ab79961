//! Price and share arithmetic shared across the detector, cycle engine and
//! exit executor.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Clamp `value` into `[lo, hi]`.
///
/// Used wherever a sell price or take-profit price needs to stay off the
/// exchange's hard floor/ceiling (typically `0.01`/`0.99`).
#[must_use]
pub fn clamp_price(value: Decimal, lo: Decimal, hi: Decimal) -> Decimal {
    value.clamp(lo, hi)
}

/// The complement of a price for a binary market: `1 - price`.
///
/// Used to derive the sell-side price when a shock's `direction` is `Down`
/// (the complement token is the one that spiked). Three-outcome markets are
/// out of scope — callers must reject non-binary markets before reaching here.
#[must_use]
pub fn complement(price: Decimal) -> Decimal {
    Decimal::ONE - price
}

/// Tick size for a given best-bid price.
///
/// `0.01` in the normal trading range `(0.04, 0.96)`; `0.001` near the extremes
/// where the exchange allows finer increments.
#[must_use]
pub fn tick_size(bid: Decimal) -> Decimal {
    if bid > dec!(0.04) && bid < dec!(0.96) {
        dec!(0.01)
    } else {
        dec!(0.001)
    }
}

/// Round `value` to the nearest multiple of `tick`.
#[must_use]
pub fn round_to_tick(value: Decimal, tick: Decimal) -> Decimal {
    if tick.is_zero() {
        return value;
    }
    (value / tick).round() * tick
}
