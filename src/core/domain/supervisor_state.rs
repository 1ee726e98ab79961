//! Session-wide risk state owned by the supervisor.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Running risk counters for the current session, checked before every new
/// shock is accepted into a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorState {
    pub session_pnl: Decimal,
    pub consecutive_losses: u32,
    pub halted: bool,
    pub halt_reason: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl SupervisorState {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            session_pnl: Decimal::ZERO,
            consecutive_losses: 0,
            halted: false,
            halt_reason: None,
            started_at,
        }
    }

    /// Fold one closed trade's outcome into the running counters.
    pub fn record_trade(&mut self, realized_pnl: Decimal) {
        self.session_pnl += realized_pnl;
        if realized_pnl.is_sign_positive() && !realized_pnl.is_zero() {
            self.consecutive_losses = 0;
        } else {
            self.consecutive_losses += 1;
        }
    }

    pub fn halt(&mut self, reason: impl Into<String>) {
        self.halted = true;
        self.halt_reason = Some(reason.into());
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_state() -> SupervisorState {
        SupervisorState::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap())
    }

    #[test]
    fn starts_unhalted_with_zero_counters() {
        let state = make_state();
        assert!(!state.is_halted());
        assert!(state.session_pnl.is_zero());
        assert_eq!(state.consecutive_losses, 0);
    }

    #[test]
    fn consecutive_losses_increments_on_loss_and_resets_on_win() {
        let mut state = make_state();
        state.record_trade(dec!(-1.0));
        state.record_trade(dec!(-1.0));
        assert_eq!(state.consecutive_losses, 2);
        state.record_trade(dec!(2.0));
        assert_eq!(state.consecutive_losses, 0);
    }

    #[test]
    fn breakeven_trade_counts_as_a_loss_for_the_streak() {
        let mut state = make_state();
        state.record_trade(dec!(-1.0));
        state.record_trade(dec!(0.0));
        assert_eq!(state.consecutive_losses, 2);
    }

    #[test]
    fn session_pnl_accumulates_across_trades() {
        let mut state = make_state();
        state.record_trade(dec!(3.5));
        state.record_trade(dec!(-1.5));
        assert_eq!(state.session_pnl, dec!(2.0));
    }

    #[test]
    fn halt_sets_flag_and_reason() {
        let mut state = make_state();
        state.halt("consecutive loss cap reached");
        assert!(state.is_halted());
        assert_eq!(state.halt_reason.as_deref(), Some("consecutive loss cap reached"));
    }
}
