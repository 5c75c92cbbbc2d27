//! Polling pipeline.
//!
//! - `detect_added`: Find listings not seen before
//! - `merge`: Fold a fetch into the bounded history
//! - `CycleRunner`: Load, fetch, notify, merge and save each target
//! - `run_once` / `run_forever`: Cycle scheduling

pub mod cycle;
pub mod diff;
pub mod merge;
pub mod schedule;

pub use cycle::{CycleReport, CycleRunner, TargetOutcome};
pub use diff::detect_added;
pub use merge::merge;
pub use schedule::{run_forever, run_once, run_until};
