pub mod common;
pub mod context;
pub mod moves;
pub mod roster;
pub mod wire;

pub use common::*;
pub use context::*;
pub use moves::*;
pub use roster::*;
pub use wire::*;
