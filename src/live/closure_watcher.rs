//! Background detection of positions the venue closed on their stop.
//!
//! The watcher owns its list of already reported orders. It is the only
//! writer of that list and talks to the session through a channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::error::TraderError;
use crate::domain::position::Direction;
use crate::ports::broker_port::{BrokerPort, OrderReason};

pub const STOP_LOSS_TITLE: &str = "Stop Loss Triggered";

#[derive(Debug, Clone, PartialEq)]
pub struct StopLossEvent {
    pub order: u64,
    pub position_id: u64,
    pub direction: Direction,
    pub price: f64,
    pub time: NaiveDateTime,
}

impl StopLossEvent {
    pub fn message(&self) -> String {
        let side = match self.direction {
            Direction::Long => "Buy",
            Direction::Short => "Sell",
        };
        format!(
            "{} order {} stopped out at {}",
            side, self.position_id, self.price
        )
    }
}

pub struct ClosureWatcher {
    broker: Arc<dyn BrokerPort>,
    poll: Duration,
    lookback: TimeDelta,
    seen: Vec<u64>,
}

impl ClosureWatcher {
    pub fn new(broker: Arc<dyn BrokerPort>, poll: Duration, lookback: TimeDelta) -> Self {
        ClosureWatcher {
            broker,
            poll,
            lookback,
            seen: Vec::new(),
        }
    }

    /// Query `[now - lookback, now]` and return stop-outs not reported before.
    /// Orders that dropped out of the window are forgotten.
    pub async fn poll_once(
        &mut self,
        now: NaiveDateTime,
    ) -> Result<Vec<StopLossEvent>, TraderError> {
        let orders = self.broker.order_history(now - self.lookback, now).await?;

        let mut events = Vec::new();
        for order in orders.iter().filter(|o| o.reason == OrderReason::StopLoss) {
            if self.seen.contains(&order.ticket) {
                continue;
            }
            self.seen.push(order.ticket);
            events.push(StopLossEvent {
                order: order.ticket,
                position_id: order.position_id,
                direction: order.direction,
                price: order.price,
                time: order.time,
            });
        }
        self.seen.retain(|t| orders.iter().any(|o| o.ticket == *t));
        Ok(events)
    }

    /// Run until the receiving side goes away. The handle need not be joined.
    pub fn spawn(mut self, events: mpsc::UnboundedSender<StopLossEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match self.poll_once(Utc::now().naive_utc()).await {
                    Ok(found) => {
                        for event in found {
                            debug!(
                                position = event.position_id,
                                price = event.price,
                                "stop-out detected"
                            );
                            if events.send(event).is_err() {
                                return;
                            }
                        }
                    }
                    Err(err) => warn!(error = %err, "order history poll failed"),
                }
                if events.is_closed() {
                    return;
                }
                tokio::time::sleep(self.poll).await;
            }
        })
    }
}
