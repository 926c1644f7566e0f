//! Small demonstration algorithms used by tests and the CLI.
//!
//! - [`EmaCross`]: trend flips between two EMAs
//! - [`RollingHigh`]: closes at the top of a rolling window
//! - [`Linked`]: re-emits another algorithm's events

pub mod ema_cross;
pub mod linked;
pub mod rolling_high;

pub use ema_cross::{EmaCross, Trend};
pub use linked::Linked;
pub use rolling_high::RollingHigh;
