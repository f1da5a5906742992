//! Durable FIFO backlog of points that have not reached the remote yet.
//!
//! Points are kept in a JSONL file, one point per line, fsynced on every
//! append. Draining rewrites the file atomically with whatever the sink did
//! not accept, so a crash never loses or reorders a point. It may resend
//! one, which the remote tolerates because ids are stable.

mod error;
mod point_store;

pub use error::{StoreError, StoreResult};
pub use point_store::{DrainReport, PointStore};
