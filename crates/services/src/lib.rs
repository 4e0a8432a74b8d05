#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod render;
pub mod reveal;
pub mod stream;

pub use piece_core::Clock;

pub use config::{ApiConfig, RevealConfig};
pub use error::{ConfigError, StreamClientError};
pub use render::{MarkdownRenderer, RenderAdapter};
pub use reveal::{
    ChannelSink, RECONCILIATION_FAILED_ERROR, RevealHandle, RevealService, RevealSink,
    RevealUpdate, RevealView, RevealedTakeaway, SessionPhase,
};
pub use stream::{
    Credentials, MalformedMessage, PartialSnapshot, StreamClient, StreamEvent, StreamHandle,
    WebSocketStreamClient,
};
