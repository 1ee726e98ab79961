//! Shock-acceptance gate: the ordered rejection checks evaluated under a
//! market's lock before a shock is allowed to place a ladder.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    SupervisorHalted,
    CycleCapExceeded,
    SellPriceTooHigh,
    NoInventory,
}

/// Everything the acceptance check needs, computed fresh under the market
/// lock immediately before the decision.
#[derive(Debug, Clone)]
pub struct AcceptanceContext {
    pub halted: bool,
    pub active_cycle_count: usize,
    pub max_cycles_per_game: u32,
    pub sell_token_price: Decimal,
    pub late_game: bool,
    pub sell_price_max: Decimal,
    pub late_game_sell_price_max: Decimal,
    pub has_inventory: bool,
}

/// Evaluate the four rejection conditions in the mandated order; the first
/// one that applies is the reason returned. `Ok(())` means the shock proceeds
/// to ladder placement.
pub fn evaluate(ctx: &AcceptanceContext) -> Result<(), RejectionReason> {
    if ctx.halted {
        return Err(RejectionReason::SupervisorHalted);
    }
    if ctx.active_cycle_count + 1 > ctx.max_cycles_per_game as usize {
        return Err(RejectionReason::CycleCapExceeded);
    }
    let cap = if ctx.late_game { ctx.late_game_sell_price_max } else { ctx.sell_price_max };
    if ctx.sell_token_price > cap {
        return Err(RejectionReason::SellPriceTooHigh);
    }
    if !ctx.has_inventory {
        return Err(RejectionReason::NoInventory);
    }
    Ok(())
}

/// Default asymmetric sell-side guard, tightened in the late-game regime.
#[must_use]
pub fn default_sell_price_max() -> Decimal {
    dec!(0.85)
}

#[must_use]
pub fn default_late_game_sell_price_max() -> Decimal {
    dec!(0.70)
}

/// Whether a scoring event's `period`/`clock` puts the game in the late-game
/// regime: the final three minutes of the final period, or any overtime.
/// Unparseable clocks are treated as not late-game — tightening the sell cap
/// needs positive evidence, not a guess.
#[must_use]
pub fn is_late_game(period: &str, clock: &str) -> bool {
    let period_lower = period.to_lowercase();
    let is_final_or_overtime = period_lower.contains("ot") || period_lower.ends_with('4') || period_lower.contains("q4");
    if !is_final_or_overtime {
        return false;
    }
    let Some((minutes, seconds)) = clock.split_once(':') else {
        return false;
    };
    let (Ok(minutes), Ok(seconds)) = (minutes.parse::<i64>(), seconds.parse::<i64>()) else {
        return false;
    };
    minutes * 60 + seconds <= 180
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_ctx() -> AcceptanceContext {
        AcceptanceContext {
            halted: false,
            active_cycle_count: 0,
            max_cycles_per_game: 1,
            sell_token_price: dec!(0.58),
            late_game: false,
            sell_price_max: default_sell_price_max(),
            late_game_sell_price_max: default_late_game_sell_price_max(),
            has_inventory: true,
        }
    }

    #[test]
    fn halted_is_checked_first() {
        let mut ctx = base_ctx();
        ctx.halted = true;
        ctx.active_cycle_count = 99; // would also fail the cap check
        assert_eq!(evaluate(&ctx), Err(RejectionReason::SupervisorHalted));
    }

    #[test]
    fn cycle_cap_rejects_a_second_cycle_when_the_cap_is_one() {
        let mut ctx = base_ctx();
        ctx.active_cycle_count = 1;
        assert_eq!(evaluate(&ctx), Err(RejectionReason::CycleCapExceeded));
    }

    #[test]
    fn cycle_cap_allows_the_second_cycle_when_the_cap_is_two() {
        let mut ctx = base_ctx();
        ctx.max_cycles_per_game = 2;
        ctx.active_cycle_count = 1;
        assert_eq!(evaluate(&ctx), Ok(()));
    }

    #[test]
    fn sell_price_above_cap_is_rejected() {
        let mut ctx = base_ctx();
        ctx.sell_token_price = dec!(0.90);
        assert_eq!(evaluate(&ctx), Err(RejectionReason::SellPriceTooHigh));
    }

    #[test]
    fn late_game_tightens_the_sell_price_cap() {
        let mut ctx = base_ctx();
        ctx.late_game = true;
        ctx.sell_token_price = dec!(0.75);
        assert_eq!(evaluate(&ctx), Err(RejectionReason::SellPriceTooHigh));
    }

    #[test]
    fn no_inventory_is_rejected_last() {
        let mut ctx = base_ctx();
        ctx.has_inventory = false;
        assert_eq!(evaluate(&ctx), Err(RejectionReason::NoInventory));
    }

    #[test]
    fn a_clean_shock_is_accepted() {
        assert_eq!(evaluate(&base_ctx()), Ok(()));
    }

    #[test]
    fn final_period_under_three_minutes_is_late_game() {
        assert!(is_late_game("Q4", "2:45"));
    }

    #[test]
    fn overtime_is_always_late_game() {
        assert!(is_late_game("OT", "9:00"));
    }

    #[test]
    fn final_period_with_time_remaining_is_not_late_game() {
        assert!(!is_late_game("Q4", "8:30"));
    }

    #[test]
    fn earlier_periods_are_never_late_game() {
        assert!(!is_late_game("Q2", "0:30"));
    }
}
