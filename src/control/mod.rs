//! Operator-side control path
//!
//! Raw stick samples are smoothed by a [`SignalFilter`] per axis, gated by a
//! deadband in the [`InputSampler`], and turned into [`Command`]s.

pub mod command;
pub mod filter;
pub mod sampler;

pub use command::Command;
pub use filter::{FilterError, FilterParams, SignalFilter};
pub use sampler::{InputSampler, SamplerSettings};
