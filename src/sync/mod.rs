mod coordinator;

pub use coordinator::{BufferReason, CaptureOutcome, SyncCoordinator, UnpersistedPoint};
