//! Ladder-placement planning: turns a shock's base price into the sequence of
//! level prices and sizes the cycle engine should submit.

use rust_decimal::Decimal;

use crate::core::domain::clamp_price;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LadderLevelPlan {
    pub level: u8,
    pub price: Decimal,
    pub shares: u64,
}

/// Build the full ladder plan for one shock: level `k` prices at
/// `base_price + k * spacing`, clamped to `[0.01, 0.99]`, sized by
/// `ladder_sizes[k-1]`.
#[must_use]
pub fn build_plan(base_price: Decimal, ladder_sizes: &[u64], spacing: Decimal) -> Vec<LadderLevelPlan> {
    ladder_sizes
        .iter()
        .enumerate()
        .map(|(index, &shares)| {
            let level = (index + 1) as u8;
            let price = clamp_price(
                base_price + Decimal::from(level) * spacing,
                Decimal::new(1, 2),
                Decimal::new(99, 2),
            );
            LadderLevelPlan { level, price, shares }
        })
        .collect()
}
