mod piece_vm;

pub use piece_vm::{PieceVm, TakeawayCardVm};
