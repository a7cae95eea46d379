pub mod controller;
pub mod switching;

pub use controller::{Bond, BondController};
pub use switching::BondSwitchingSession;
