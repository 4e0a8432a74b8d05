//! Incremental reveal of streamed extraction results.

mod completion;
mod controller;
mod pacer;
mod service;
mod session;
mod sink;
mod snapshot;

pub use completion::{CompletionDetector, is_caught_up};
pub use controller::RECONCILIATION_FAILED_ERROR;
pub use pacer::{Pacer, RevealBatch, RevealedState, RevealedTakeaway, RevealedUpdate};
pub use service::{RevealHandle, RevealService};
pub use session::{
    EventOutcome, MALFORMED_MESSAGE_ERROR, RevealSession, SessionPhase, TickOutcome,
};
pub use sink::{ChannelSink, RevealSink, RevealUpdate, RevealView};
pub use snapshot::SnapshotStore;
