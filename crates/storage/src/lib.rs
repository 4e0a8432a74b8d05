#![forbid(unsafe_code)]

pub mod http;
pub mod repository;

pub use http::ApiPieceRepository;
pub use repository::{InMemoryRepository, PieceRepository, StorageError};
