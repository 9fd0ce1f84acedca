//! rf-core: shared foundation for resflow.
//!
//! Contains:
//! - units (uom time types + day/second conversions)
//! - numeric (tolerances + input checks)
//! - timing (wall-clock stopwatch)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod timing;
pub mod units;

pub use error::{RfError, RfResult};
pub use numeric::*;
pub use timing::StopWatch;
pub use units::*;
