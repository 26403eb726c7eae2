//! Trailing stop sweep over the venue's open positions.
//!
//! Every profitable position gets its stop set to the previous bar's MA when
//! it has none, or moved there when that tightens it. Unlike the backtest,
//! there is no requirement that the position only just turned profitable.

use tracing::{debug, warn};

use crate::domain::error::TraderError;
use crate::domain::position::Direction;
use crate::domain::sizing::{round_down_3dp, round_up_3dp};
use crate::live::dispatcher::{Dispatcher, ERROR_TITLE};
use crate::ports::broker_port::{BrokerPort, OpenPosition};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopChange {
    pub ticket: u64,
    pub stop_loss: f64,
    pub accepted: bool,
    pub retcode: u32,
}

/// The stop `position` should carry given `last_ma`, if it must change.
pub fn desired_stop(position: &OpenPosition, last_ma: f64) -> Option<f64> {
    if position.profit <= 0.0 || !last_ma.is_finite() {
        return None;
    }
    let rounded = match position.direction {
        Direction::Long => round_down_3dp(last_ma),
        Direction::Short => round_up_3dp(last_ma),
    };
    match (position.direction, position.stop_loss) {
        (_, None) => Some(rounded),
        (Direction::Long, Some(sl)) if last_ma > sl && rounded != sl => Some(rounded),
        (Direction::Short, Some(sl)) if last_ma < sl && rounded != sl => Some(rounded),
        _ => None,
    }
}

pub async fn sweep_stops(
    broker: &dyn BrokerPort,
    dispatcher: &Dispatcher,
    symbol: &str,
    last_ma: f64,
) -> Result<Vec<StopChange>, TraderError> {
    let mut changes = Vec::new();

    for position in broker.open_positions(symbol).await? {
        if position.symbol != symbol {
            continue;
        }
        let Some(stop_loss) = desired_stop(&position, last_ma) else {
            continue;
        };

        let outcome = broker.modify_stop_loss(position.ticket, stop_loss).await?;
        if outcome.is_done() {
            debug!(ticket = position.ticket, stop_loss, "stop moved");
        } else {
            warn!(
                ticket = position.ticket,
                stop_loss,
                retcode = outcome.retcode,
                "stop modification rejected"
            );
            dispatcher
                .notify(
                    ERROR_TITLE,
                    &format!(
                        "Failed to modify stop loss for position {}, retcode={}",
                        position.ticket, outcome.retcode
                    ),
                )
                .await;
        }
        changes.push(StopChange {
            ticket: position.ticket,
            stop_loss,
            accepted: outcome.is_done(),
            retcode: outcome.retcode,
        });
    }
    Ok(changes)
}
