//! Handler for the `status` command: load the persisted snapshot and print a
//! plain summary, no live connection required.

use std::path::Path;

use tabled::{Table, Tabled};
use tracing::error;

use super::output;
use crate::app::config::Config;
use crate::core::persistence;
use crate::error::Result;

/// One row of the recent-trades table printed by `status`.
#[derive(Tabled)]
struct TradeRow {
    #[tabled(rename = "Market")]
    market: String,
    #[tabled(rename = "Shares")]
    shares: u64,
    #[tabled(rename = "Entry")]
    entry_price: String,
    #[tabled(rename = "Exit")]
    exit_price: String,
    #[tabled(rename = "PnL")]
    pnl: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

pub fn status(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let snapshot_path = Path::new(&config.persistence.snapshot_path);

    if !snapshot_path.exists() {
        println!("no snapshot at {}", snapshot_path.display());
        return Ok(());
    }

    let snapshot = match persistence::load(snapshot_path) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            error!(error = %err, path = %snapshot_path.display(), "failed to load snapshot");
            return Err(err);
        }
    };

    output::section("snapshot");
    output::field("saved at", snapshot.saved_at);
    output::field("markets with open inventory", snapshot.inventories.len());
    output::field("resting ladder orders", snapshot.ladder_orders.len());
    output::field("open cumulative take-profits", snapshot.cumulative_tps.len());
    output::field("closed trades", snapshot.trade_records.len());

    let realized_pnl: rust_decimal::Decimal = snapshot.trade_records.iter().map(|t| t.realized_pnl).sum();
    output::field("session realized pnl", output::signed_pnl(realized_pnl));
    output::field("session pnl (running)", output::signed_pnl(snapshot.supervisor_state.session_pnl));
    output::field("consecutive losses", snapshot.supervisor_state.consecutive_losses);

    if snapshot.supervisor_state.halted {
        output::error(&format!("HALTED: {}", snapshot.supervisor_state.halt_reason.as_deref().unwrap_or("no reason recorded")));
    } else {
        output::success("not halted");
    }

    if !snapshot.trade_records.is_empty() {
        output::section("recent trades");
        let rows: Vec<TradeRow> = snapshot
            .trade_records
            .iter()
            .rev()
            .take(10)
            .map(|t| TradeRow {
                market: t.market_slug.to_string(),
                shares: t.exit_shares,
                entry_price: t.blended_entry_price.to_string(),
                exit_price: t.exit_price.to_string(),
                pnl: output::signed_pnl(t.realized_pnl),
                reason: format!("{:?}", t.exit_reason),
            })
            .collect();
        println!("{}", Table::new(rows));
    }

    Ok(())
}
