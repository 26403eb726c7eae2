//! Live market data port trait.

use async_trait::async_trait;

use crate::domain::bar::Bar;
use crate::domain::error::TraderError;

#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// The last `count` completed bars, oldest first. The still-forming bar is
    /// never included. An empty result means no data was available.
    async fn latest_bars(&self, count: usize) -> Result<Vec<Bar>, TraderError>;

    /// True once a finite feed (a replay) has nothing more to deliver.
    fn exhausted(&self) -> bool {
        false
    }
}
