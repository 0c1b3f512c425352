//! Page parsing: station pages and secondary data pages.

pub mod parse;
pub mod row;

pub use parse::{PageParser, normalize_label};
pub use row::{RawObservation, StatValue, Statistic, StatisticIndex};
