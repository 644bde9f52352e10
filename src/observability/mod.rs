pub mod metrics;
pub mod tracing;

pub use metrics::{MetricsRegistry, Stats, TimingGuard};
pub use tracing::init_tracing;
