pub mod config;
pub mod detectors;
pub mod io;
pub mod metrics;
pub mod plot;
pub mod sampling;
pub mod signal;

pub use detectors::*;
pub use metrics::*;
pub use signal::*;
