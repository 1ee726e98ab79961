//! Durable state: a single versioned document capturing inventory, resting
//! orders, cumulative take-profits, open positions, trade history and the
//! supervisor's circuit-breaker state, written atomically on every checkpoint.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::domain::{CumulativeTp, Inventory, LadderOrder, MarketSlug, Position, ShockId, SupervisorState, TradeRecord};
use crate::error::{Error, Result};

/// Tag identifying this document's schema family; carried through so a
/// future model change can refuse (or migrate) a document from an unrelated
/// deployment.
pub const MODEL_TAG: &str = "shock-fade-live";

/// Current schema version. Loading an older document upgrades it by
/// field-presence: fields absent in the stored JSON take their `Default`
/// value rather than failing to parse.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_model_tag")]
    pub model_tag: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub saved_at: DateTime<Utc>,
    pub inventories: HashMap<MarketSlug, Inventory>,
    pub ladder_orders: Vec<LadderOrder>,
    pub cumulative_tps: HashMap<ShockId, CumulativeTp>,
    pub positions: HashMap<ShockId, Vec<Position>>,
    pub trade_records: Vec<TradeRecord>,
    pub supervisor_state: SupervisorState,
}

fn default_model_tag() -> String {
    MODEL_TAG.to_string()
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Snapshot {
    #[must_use]
    pub fn new(
        saved_at: DateTime<Utc>,
        inventories: HashMap<MarketSlug, Inventory>,
        ladder_orders: Vec<LadderOrder>,
        cumulative_tps: HashMap<ShockId, CumulativeTp>,
        positions: HashMap<ShockId, Vec<Position>>,
        trade_records: Vec<TradeRecord>,
        supervisor_state: SupervisorState,
    ) -> Self {
        Self {
            model_tag: MODEL_TAG.to_string(),
            schema_version: SCHEMA_VERSION,
            saved_at,
            inventories,
            ladder_orders,
            cumulative_tps,
            positions,
            trade_records,
            supervisor_state,
        }
    }

    /// Ladder orders older than `cancel_reaper_threshold` that were still
    /// `Resting` at save time are not trustworthy on reload — the stale
    /// ladder reaper would have cancelled them had the process kept running.
    /// Rehydration should drop, not resubmit, them.
    #[must_use]
    pub fn rehydratable_orders(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> Vec<LadderOrder> {
        self.ladder_orders
            .iter()
            .filter(|order| !order.is_resting() || order.age(now) < max_age)
            .cloned()
            .collect()
    }
}

/// Serialize `snapshot` to `path` via a write-then-rename so a crash mid-save
/// never leaves a truncated document behind.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let json = serde_json::to_vec_pretty(snapshot)?;
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, &json)?;
    std::fs::rename(&tmp_path, path)?;
    tracing::info!(path = %path.display(), bytes = json.len(), "persisted snapshot");
    Ok(())
}

/// Load a snapshot, rejecting documents from an unrelated model family.
pub fn load(path: &Path) -> Result<Snapshot> {
    let bytes = std::fs::read(path)?;
    let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
    if snapshot.model_tag != MODEL_TAG {
        return Err(Error::Persistence(format!(
            "refusing to load snapshot with model tag {:?}, expected {:?}",
            snapshot.model_tag, MODEL_TAG
        )));
    }
    Ok(snapshot)
}

/// Reconstruct a `CumulativeTp` for an order the exchange reports filled but
/// which has no matching TP record (e.g. after a crash between the fill and
/// the next checkpoint). Uses the weighted-average rule a fresh first fill
/// would: the recovered fill is treated as the cycle's only known entry.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn reconstruct_orphaned_tp(
    shock_id: ShockId,
    market_slug: MarketSlug,
    condition_id: crate::core::domain::ConditionId,
    tier_flag: crate::core::domain::PriceTierFlag,
    sold_token_id: crate::core::domain::TokenId,
    held_token_id: crate::core::domain::TokenId,
    fill_shares: u64,
    fill_price: rust_decimal::Decimal,
    fade_target: rust_decimal::Decimal,
    now: DateTime<Utc>,
) -> CumulativeTp {
    CumulativeTp::from_first_fill(
        shock_id, market_slug, condition_id, tier_flag, None, sold_token_id, held_token_id, fill_shares, fill_price, fade_target, now,
    )
}
