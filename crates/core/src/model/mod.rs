mod ids;
mod piece;
mod takeaway;
mod title;

pub use ids::{PieceId, PieceIdError};
pub use piece::{BadgeType, Piece, PieceMetadata};
pub use takeaway::Takeaway;
pub use title::TitleFields;
