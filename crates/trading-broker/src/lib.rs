//! Order execution: an in-memory paper client and the live polling driver.

mod live;
mod paper;

pub use live::{LiveConfig, LiveError, LiveExecutor, StepOutcome};
pub use paper::{PaperClient, PaperConfig};
