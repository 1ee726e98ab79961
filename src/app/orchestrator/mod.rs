//! Wires the detector, classifier, cycle engine, reconciliation and exit
//! executor into a running process: one `Orchestrator` per deployment, built
//! once in `main` and driven until shutdown.

mod classify;
mod exit;
mod game_decided;
mod reconcile;
mod tick;
mod tp;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::app::config::Config;
use crate::app::state::AppState;
use crate::core::classifier::EventClassifier;
use crate::core::detector::ShockDetector;
use crate::core::domain::{MarketSlug, Shock};
use crate::core::exchange::{BookTick, EventFeedAdapter, ExchangeClient, FillEvent, MarketDiscoveryClient, OnChainClient, OrderbookFeed};
use crate::core::persistence;
use crate::core::reconciliation::FillReconciler;
use crate::error::Result;

pub use classify::poll_and_classify;
pub use reconcile::reconcile_fill;
pub use tick::process_tick;

/// Every external dependency the orchestrator drives against. Swapped for
/// scripted test doubles behind the `testkit` feature.
pub struct Ports {
    pub exchange: Arc<dyn ExchangeClient>,
    pub onchain: Arc<dyn OnChainClient>,
    pub orderbook: Arc<dyn OrderbookFeed>,
    pub event_feed: Arc<dyn EventFeedAdapter>,
    pub market_discovery: Arc<dyn MarketDiscoveryClient>,
}

/// Mutable engine state that isn't shared with other tasks — owned
/// exclusively by the orchestrator's main loop.
struct EngineState {
    detector: ShockDetector,
    classifier: EventClassifier,
    reconciler: FillReconciler,
    /// Shocks the detector has emitted but the classifier hasn't yet resolved
    /// to a trade/no-trade decision, keyed by `shockId`.
    pending_shocks: HashMap<String, Shock>,
}

pub struct Orchestrator {
    config: Config,
    state: AppState,
    ports: Ports,
    engine: EngineState,
}

impl Orchestrator {
    #[must_use]
    pub fn new(config: Config, ports: Ports) -> Self {
        let runtime_config = config.runtime_config();
        let state = AppState::new(runtime_config.clone(), Utc::now());
        let engine = EngineState {
            detector: ShockDetector::new(runtime_config.detector.clone()),
            classifier: EventClassifier::new(config.classifier.clone().into()),
            reconciler: FillReconciler::new(),
            pending_shocks: HashMap::new(),
        };
        Self { config, state, ports, engine }
    }

    #[must_use]
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Drive the process until a shutdown signal arrives on `shutdown_rx`.
    /// Ticks and fills are consumed from channels the feed-adapter tasks
    /// populate; this keeps the orchestrator itself free of any one venue's
    /// transport details.
    pub async fn run(
        &mut self,
        mut ticks: mpsc::Receiver<BookTick>,
        mut fills: mpsc::Receiver<FillEvent>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) -> Result<()> {
        let mut checkpoint = tokio::time::interval(StdDuration::from_secs(self.config.persistence.checkpoint_interval_secs));
        let mut reaper = tokio::time::interval(StdDuration::from_secs(10));
        let mut classifier_poll = tokio::time::interval(StdDuration::from_millis(1000));
        let mut discovery_poll = tokio::time::interval(StdDuration::from_secs(30));
        let mut emergency_check = tokio::time::interval(StdDuration::from_secs(15));

        loop {
            tokio::select! {
                Some(tick) = ticks.recv() => {
                    if let Err(err) = self.on_tick(tick).await {
                        warn!(error = %err, "tick processing failed");
                    }
                }
                Some(fill) = fills.recv() => {
                    if let Err(err) = self.on_fill(fill).await {
                        warn!(error = %err, "fill reconciliation failed");
                    }
                }
                _ = checkpoint.tick() => {
                    if let Err(err) = self.checkpoint() {
                        error!(error = %err, "checkpoint save failed");
                    }
                }
                _ = reaper.tick() => {
                    self.reap_stale_orders().await;
                }
                _ = classifier_poll.tick() => {
                    if let Err(err) = self.on_classifier_poll().await {
                        warn!(error = %err, "classifier poll failed");
                    }
                }
                _ = discovery_poll.tick() => {
                    if let Err(err) = self.on_discovery_poll().await {
                        warn!(error = %err, "market discovery poll failed");
                    }
                }
                _ = emergency_check.tick() => {
                    self.check_emergency_timeouts().await;
                }
                _ = shutdown_rx.recv() => {
                    info!("shutdown signal received");
                    self.shutdown().await?;
                    return Ok(());
                }
            }
        }
    }

    async fn on_tick(&mut self, tick: BookTick) -> Result<()> {
        process_tick(
            &self.state,
            &mut self.engine.detector,
            &mut self.engine.classifier,
            &mut self.engine.pending_shocks,
            &mut self.engine.reconciler,
            &*self.ports.onchain,
            &*self.ports.exchange,
            tick,
        )
        .await
    }

    async fn on_classifier_poll(&mut self) -> Result<()> {
        poll_and_classify(
            &self.state,
            &mut self.engine.detector,
            &mut self.engine.classifier,
            &mut self.engine.pending_shocks,
            &mut self.engine.reconciler,
            &*self.ports.event_feed,
            &*self.ports.exchange,
            &*self.ports.orderbook,
            Utc::now(),
        )
        .await
    }

    async fn on_discovery_poll(&mut self) -> Result<()> {
        let markets = self.ports.market_discovery.markets().await?;
        self.state.markets_mut().replace(markets);
        Ok(())
    }

    /// Terminate every cycle whose oldest open position has been resting past
    /// the emergency timeout without the TP filling.
    async fn check_emergency_timeouts(&mut self) {
        let now = Utc::now();
        let max_age = chrono::Duration::seconds(self.config.persistence.emergency_timeout_secs);
        let market_slugs: Vec<MarketSlug> = self.state.supervisor().market_slugs().cloned().collect();
        for market_slug in market_slugs {
            let timed_out: Vec<crate::core::domain::ShockId> = {
                let supervisor = self.state.supervisor();
                let Some(book) = supervisor.book(&market_slug) else { continue };
                book.all_cumulative_tps()
                    .filter(|tp| now - tp.created_at >= max_age)
                    .map(|tp| tp.shock_id.clone())
                    .collect()
            };
            for shock_id in timed_out {
                if let Err(err) = classify::close_cycle_for_timeout(
                    &self.state,
                    &mut self.engine.reconciler,
                    &*self.ports.exchange,
                    &*self.ports.orderbook,
                    &market_slug,
                    &shock_id,
                    now,
                )
                .await
                {
                    warn!(market = %market_slug, error = %err, "emergency timeout close failed");
                }
            }
        }
    }

    async fn on_fill(&mut self, fill: FillEvent) -> Result<()> {
        reconcile_fill(&self.state, &mut self.engine.reconciler, &*self.ports.exchange, fill).await
    }

    async fn reap_stale_orders(&mut self) {
        let now = Utc::now();
        let max_age = chrono::Duration::seconds(self.config.persistence.stale_order_max_age_secs);
        let markets = self.state.markets();
        let mut supervisor = self.state.supervisor_mut();
        let market_slugs: Vec<MarketSlug> = supervisor.market_slugs().cloned().collect();
        for market_slug in market_slugs {
            let stale = supervisor.book(&market_slug).map(|book| book.stale_resting_orders(now, max_age)).unwrap_or_default();
            for local_id in stale {
                let exchange_order_id = supervisor.book(&market_slug).and_then(|book| book.exchange_order_id_of(local_id).cloned());
                if let Some(ref id) = exchange_order_id {
                    self.engine.reconciler.note_cancel_requested(id.clone(), crate::core::cycle::OrderRole::Ladder(local_id));
                    if let Err(err) = self.ports.exchange.cancel(id).await {
                        warn!(market = %market_slug, order = %id, error = %err, "stale order cancel failed, will retry next reap");
                        continue;
                    }
                }
                if let Some(returned) = supervisor.book_mut(&market_slug).cancel_resting(local_id) {
                    if let Some(id) = exchange_order_id {
                        supervisor.forget_order(&id);
                    }
                    let is_token_a = markets
                        .market_for_token(&returned.token_id)
                        .map(|market| markets.is_token_a(market, &returned.token_id))
                        .unwrap_or(true);
                    let _ = supervisor.inventory_mut().return_sell_side(&market_slug, is_token_a, returned.shares);
                }
            }
        }
    }

    fn checkpoint(&self) -> Result<()> {
        let supervisor = self.state.supervisor();
        let snapshot = supervisor.snapshot(Utc::now());
        persistence::save(std::path::Path::new(&self.config.persistence.snapshot_path), &snapshot)
    }

    /// Graceful shutdown: stop accepting new shocks (the caller has already
    /// dropped the tick/fill senders by this point), merge every market's
    /// balanced inventory and persist a final snapshot.
    async fn shutdown(&mut self) -> Result<()> {
        self.state.begin_shutdown();
        let markets = self.state.supervisor().markets_pending_merge_on_shutdown();
        for market_slug in markets {
            let mergeable = self.state.supervisor().inventory().mergeable(&market_slug);
            if mergeable == 0 {
                continue;
            }
            let condition_id = match self.state.supervisor().inventory().get(&market_slug) {
                Some(inv) => inv.condition_id.clone(),
                None => continue,
            };
            let tier_flag = self.state.supervisor().inventory().get(&market_slug).map(|inv| inv.tier_flag).unwrap_or_default();
            match self.ports.onchain.merge(condition_id.as_str(), mergeable, tier_flag).await {
                Ok(_) => {
                    let _ = self.state.supervisor_mut().inventory_mut().apply_merge(&market_slug, mergeable);
                }
                Err(err) => warn!(market = %market_slug, error = %err, "shutdown merge failed"),
            }
        }
        self.checkpoint()?;
        info!("shutdown complete");
        Ok(())
    }
}
