//! Per-cycle exit routing: maps a scoring event against a cycle's attributed
//! team to a hold/exit decision.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDecision {
    /// The event favors the side this cycle is short; hold.
    Favorable,
    /// The event is adverse to this cycle's thesis; exit.
    Adverse,
    /// The team attribution is missing on one side; exit out of caution.
    ConservativeExit,
}

/// Route one scoring event against a cycle's `shock_team`.
///
/// `shock_team` is `None` when the classifier could not resolve a team code
/// for the shock; `event_team` is `None` only in defensive/test contexts,
/// since the classifier always attaches a team to a reported event.
#[must_use]
pub fn route_event(shock_team: Option<&str>, event_team: Option<&str>) -> EventDecision {
    match (shock_team, event_team) {
        (Some(shock), Some(event)) if shock.eq_ignore_ascii_case(event) => EventDecision::Adverse,
        (Some(_), Some(_)) => EventDecision::Favorable,
        _ => EventDecision::ConservativeExit,
    }
}

/// Reasons a cycle's batch-close path can be invoked; distinct from
/// [`crate::core::domain::ExitReason`], which records the outcome on the
/// closed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitTrigger {
    TakeProfitHit,
    PerCycleEvent,
    ScoringRunBail,
    GameDecided,
    EmergencyTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_team_event_is_adverse() {
        assert_eq!(route_event(Some("GSW"), Some("gsw")), EventDecision::Adverse);
    }

    #[test]
    fn different_team_event_is_favorable() {
        assert_eq!(route_event(Some("GSW"), Some("LAL")), EventDecision::Favorable);
    }

    #[test]
    fn unknown_shock_team_is_conservative() {
        assert_eq!(route_event(None, Some("LAL")), EventDecision::ConservativeExit);
    }

    #[test]
    fn unknown_event_team_is_conservative() {
        assert_eq!(route_event(Some("GSW"), None), EventDecision::ConservativeExit);
    }
}
