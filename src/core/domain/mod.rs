//! Pure data types for the fade engine: markets, shocks, inventory, orders and
//! the records that come out of a closed cycle.
//!
//! Nothing in this module talks to the network, the filesystem, or a clock
//! beyond accepting timestamps as arguments. The mutating operations over
//! these types live one level up, in the sibling modules of [`crate::core`].

mod cumulative_tp;
mod id;
mod inventory;
mod ladder_order;
mod market;
mod money;
mod position;
mod shock;
mod supervisor_state;
mod trade_record;

pub use cumulative_tp::{CumulativeTp, TpStatus};
pub use id::{ConditionId, ExchangeOrderId, LocalOrderId, MarketSlug, ShockId, TokenId};
pub use inventory::Inventory;
pub use ladder_order::{LadderOrder, OrderStatus};
pub use market::{LifecycleState, Market, MarketRegistry, PriceTierFlag};
pub use money::{clamp_price, complement, round_to_tick, tick_size};
pub use position::{Position, PositionStatus};
pub use shock::{Direction, Shock};
pub use supervisor_state::SupervisorState;
pub use trade_record::{ExitReason, TradeRecord};
