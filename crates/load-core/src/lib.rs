pub mod client;
pub mod config;
pub mod metrics;
pub mod payload;
pub mod ramp;
pub mod runner;
pub mod scenario;

pub use client::*;
pub use config::*;
pub use metrics::*;
pub use payload::*;
pub use ramp::*;
pub use runner::*;
pub use scenario::*;
