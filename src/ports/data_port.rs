//! Historical bar access port trait.

use crate::domain::bar::Bar;
use crate::domain::error::TraderError;
use chrono::NaiveDateTime;

pub trait DataPort {
    /// Bars in ascending time order, optionally limited to `[start, end]`.
    fn fetch_bars(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<Bar>, TraderError>;
}
