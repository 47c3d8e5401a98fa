//! Job-chain resolution and locking engine. See spec.md section 4.5.

mod handler;
mod scan;

pub use handler::{HandlerError, JobHandler};
pub use scan::ScanOutcome;
