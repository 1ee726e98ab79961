//! Adaptive-rate polling of the external scoring-event feed; maps a pending
//! shock to a trade/no-trade classification and resolves the team code that
//! caused it.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Duration, Utc};

use crate::core::domain::MarketSlug;

/// Hot-reloadable classifier parameters.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub idle_poll_ms: i64,
    pub active_poll_ms: i64,
    pub event_window_ms: i64,
    pub shock_deadline_ms: i64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            idle_poll_ms: 10_000,
            active_poll_ms: 1_000,
            event_window_ms: 120_000,
            shock_deadline_ms: 10_000,
        }
    }
}

/// A scoring event as reported by the external feed adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScoringEvent {
    pub game_id: String,
    pub event_type: String,
    pub team: String,
    pub period: String,
    pub clock: String,
    pub timestamp: DateTime<Utc>,
}

/// The outcome of classifying a pending shock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Exactly one event in the window: fadeable, attributed to `team`.
    SingleEvent { team: String },
    /// Two or more events, all by the same team: do not trade.
    ScoringRun,
    /// No events and the deadline expired: do not trade.
    Unclassified,
}

struct PendingShock {
    market_slug: MarketSlug,
    spiked_outcome_name: String,
    received_at: DateTime<Utc>,
}

/// Maps markets to games, maintains each market's 2-minute scoring-event
/// window, and classifies pending shocks against it.
pub struct EventClassifier {
    config: ClassifierConfig,
    windows: std::collections::HashMap<MarketSlug, VecDeque<ScoringEvent>>,
    active_markets: HashSet<MarketSlug>,
    pending: std::collections::HashMap<String, PendingShock>,
}

impl EventClassifier {
    #[must_use]
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            windows: std::collections::HashMap::new(),
            active_markets: HashSet::new(),
            pending: std::collections::HashMap::new(),
        }
    }

    pub fn reload(&mut self, config: ClassifierConfig) {
        self.config = config;
    }

    /// Poll interval for `market_slug`: fast while a pending shock or open
    /// position keeps it active, slow otherwise.
    #[must_use]
    pub fn poll_interval_ms(&self, market_slug: &MarketSlug) -> i64 {
        if self.active_markets.contains(market_slug) {
            self.config.active_poll_ms
        } else {
            self.config.idle_poll_ms
        }
    }

    pub fn activate(&mut self, market_slug: MarketSlug) {
        self.active_markets.insert(market_slug);
    }

    pub fn deactivate(&mut self, market_slug: &MarketSlug) {
        self.active_markets.remove(market_slug);
    }

    /// Markets with at least one pending shock awaiting classification, for
    /// the orchestrator's poll-driver to iterate.
    #[must_use]
    pub fn markets_with_pending_shocks(&self) -> std::collections::HashSet<MarketSlug> {
        self.pending.values().map(|p| p.market_slug.clone()).collect()
    }

    /// Pending shock ids belonging to `market_slug`, oldest first.
    #[must_use]
    pub fn pending_shock_ids_for(&self, market_slug: &MarketSlug) -> Vec<String> {
        let mut ids: Vec<(String, DateTime<Utc>)> = self
            .pending
            .iter()
            .filter(|(_, pending)| &pending.market_slug == market_slug)
            .map(|(id, pending)| (id.clone(), pending.received_at))
            .collect();
        ids.sort_by_key(|(_, received_at)| *received_at);
        ids.into_iter().map(|(id, _)| id).collect()
    }

    /// Register a newly-detected shock awaiting classification.
    pub fn register_pending(
        &mut self,
        shock_id: impl Into<String>,
        market_slug: MarketSlug,
        spiked_outcome_name: impl Into<String>,
        received_at: DateTime<Utc>,
    ) {
        self.pending.insert(
            shock_id.into(),
            PendingShock {
                market_slug,
                spiked_outcome_name: spiked_outcome_name.into(),
                received_at,
            },
        );
    }

    /// Record a scoring event for `market_slug`, deduplicating by
    /// `(game_id, event_type, period, clock, team)` and trimming the window.
    pub fn record_event(&mut self, market_slug: MarketSlug, event: ScoringEvent, now: DateTime<Utc>) {
        let window = self.windows.entry(market_slug).or_default();
        let already_seen = window.iter().any(|existing| existing == &event);
        if !already_seen {
            window.push_back(event);
        }
        let cutoff = now - Duration::milliseconds(self.config.event_window_ms);
        while let Some(front) = window.front() {
            if front.timestamp < cutoff {
                window.pop_front();
            } else {
                break;
            }
        }
    }

    /// Classify one pending shock using the current state of its market's
    /// event window. Returns `None` if the shock should remain pending (some
    /// events present but not yet decisive, and the deadline hasn't expired).
    ///
    /// On a decisive outcome, the shock is removed from the pending set;
    /// calling this again with the same `shock_id` after that returns `None`.
    #[must_use]
    pub fn classify(&mut self, shock_id: &str, now: DateTime<Utc>) -> Option<Classification> {
        let pending = self.pending.get(shock_id)?;
        let window = self.windows.get(&pending.market_slug);
        let events: Vec<&ScoringEvent> = window.map(|w| w.iter().collect()).unwrap_or_default();
        let deadline_expired = now - pending.received_at >= Duration::milliseconds(self.config.shock_deadline_ms);

        let decision = match events.len() {
            0 if deadline_expired => Some(Classification::Unclassified),
            0 => None,
            1 => Some(Classification::SingleEvent {
                team: self.resolve_team(&pending.spiked_outcome_name, &events),
            }),
            _ => {
                let same_team = events.windows(2).all(|pair| pair[0].team == pair[1].team);
                if same_team {
                    Some(Classification::ScoringRun)
                } else if deadline_expired {
                    Some(Classification::Unclassified)
                } else {
                    None
                }
            }
        };

        if decision.is_some() {
            self.pending.remove(shock_id);
        }
        decision
    }

    /// The most recently recorded scoring event for `market_slug`, used to
    /// read the game clock for the late-game sell-price regime.
    #[must_use]
    pub fn latest_event(&self, market_slug: &MarketSlug) -> Option<&ScoringEvent> {
        self.windows.get(market_slug).and_then(|window| window.back())
    }

    /// Whether the market currently has two or more same-team events in its
    /// window — a scoring run, regardless of any individual pending shock.
    #[must_use]
    pub fn same_team_run(&self, market_slug: &MarketSlug) -> Option<String> {
        let window = self.windows.get(market_slug)?;
        if window.len() < 2 {
            return None;
        }
        let last_two: Vec<&ScoringEvent> = window.iter().rev().take(2).collect();
        if last_two[0].team == last_two[1].team {
            Some(last_two[0].team.clone())
        } else {
            None
        }
    }

    /// Fuzzy-match the spiked token's outcome name against team codes seen in
    /// this market's event window; falls back to the most recent event's team
    /// when no match is found.
    fn resolve_team(&self, spiked_outcome_name: &str, events: &[&ScoringEvent]) -> String {
        let normalized_outcome = spiked_outcome_name.to_lowercase();
        for event in events {
            let team_lower = event.team.to_lowercase();
            if normalized_outcome.contains(&team_lower) || team_lower.contains(&normalized_outcome) {
                return event.team.clone();
            }
        }
        events
            .last()
            .map(|e| e.team.clone())
            .unwrap_or_else(|| spiked_outcome_name.to_string())
    }
}
