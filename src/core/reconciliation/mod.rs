//! Fill reconciliation: merges the private push stream and the open-orders
//! poll into a single at-most-once terminal outcome per exchange order.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use crate::core::cycle::OrderRole;
use crate::core::domain::ExchangeOrderId;
use crate::core::exchange::{FillEvent, FillKind};

/// A terminal outcome the caller must dispatch to the cycle engine / inventory
/// ledger. Returned at most once per exchange order id.
#[derive(Clone)]
pub enum Outcome {
    Filled { shares: u64, price: Decimal },
    Cancelled,
    /// The engine's own cancel lost the race to a push-reported fill: the
    /// cancel site's bookkeeping (termination, inventory return) already ran
    /// against the role carried here, which the book itself has since
    /// forgotten. Apply the fill through the normal entry/TP path, which
    /// consumes the same shares the cancel returned and reopens the cycle.
    CancelFillRace { shares: u64, price: Decimal, role: OrderRole },
}

/// Tracks which local orders are Resting / locally-cancelled, so a later push
/// fill on a locally-cancelled order id is recognized as the cancel-fill race
/// rather than an ordinary fill.
#[derive(Default)]
pub struct FillReconciler {
    handled: HashSet<ExchangeOrderId>,
    locally_cancelled: HashMap<ExchangeOrderId, OrderRole>,
}

impl FillReconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_handled(&self, order_id: &ExchangeOrderId) -> bool {
        self.handled.contains(order_id)
    }

    /// Record that the engine requested a cancel for `order_id`, before the
    /// exchange has confirmed it, along with the role the order held at the
    /// time. Used to detect the cancel-fill race if a push fill arrives
    /// afterward, once the cancel site's own bookkeeping has already
    /// forgotten the role.
    pub fn note_cancel_requested(&mut self, order_id: ExchangeOrderId, role: OrderRole) {
        self.locally_cancelled.insert(order_id, role);
    }

    /// Handle one push-stream event. `Failed` is not a real fill and is
    /// ignored. Returns `None` if this order id was already handled.
    pub fn observe_push(&mut self, event: FillEvent) -> Option<Outcome> {
        match event.kind {
            FillKind::Failed => None,
            FillKind::Matched | FillKind::Mined | FillKind::Confirmed => {
                let shares = event.size.unwrap_or(0);
                let price = event.price.unwrap_or(Decimal::ZERO);
                if let Some(role) = self.locally_cancelled.remove(&event.order_id) {
                    // The cancel lost the race: Resting -> Cancelled -> Filled.
                    return Some(Outcome::CancelFillRace { shares, price, role });
                }
                if !self.handled.insert(event.order_id) {
                    return None;
                }
                Some(Outcome::Filled { shares, price })
            }
            FillKind::Cancellation => {
                self.locally_cancelled.remove(&event.order_id);
                if !self.handled.insert(event.order_id) {
                    return None;
                }
                Some(Outcome::Cancelled)
            }
        }
    }

    /// Handle a poll-path observation: `order_id` previously known to be
    /// resting is now missing from the open-orders snapshot. Treated as
    /// filled at `limit_price` unless already handled by the push path.
    pub fn observe_poll_disappearance(&mut self, order_id: ExchangeOrderId, shares: u64, limit_price: Decimal) -> Option<Outcome> {
        if !self.handled.insert(order_id) {
            return None;
        }
        Some(Outcome::Filled { shares, price: limit_price })
    }
}


impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Filled { shares, price } => write!(f, "Filled{{shares: {shares}, price: {price}}}"),
            Outcome::Cancelled => write!(f, "Cancelled"),
            Outcome::CancelFillRace { shares, price, role } => write!(f, "CancelFillRace{{shares: {shares}, price: {price}, role: {role:?}}}"),
        }
    }
}
