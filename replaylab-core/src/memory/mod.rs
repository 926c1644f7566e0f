//! Memory primitives algorithms carry across steps.

pub mod cell;
pub mod params;
pub mod ring;

pub use cell::MemoryCell;
pub use params::{ParameterError, Parameters};
pub use ring::RingBuffer;
