//! Application Services
//!
//! - `RelayService`: the polling loop tying source, normalizer and publisher
//! - `RelayStatus`: counters and last observations shared with the health
//!   endpoint

mod relay;
mod status;

pub use relay::{CycleReport, ErrorPolicy, RelayError, RelayService, RelaySettings, RunOutcome};
pub use status::{RelayStatus, RelayStatusSnapshot, TickerStatus};
