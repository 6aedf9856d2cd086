pub mod board;
pub mod filter_context;
pub mod move_validator;
pub mod mutation_engine;
pub mod roster_store;

pub use board::AssignmentBoard;
pub use filter_context::FilterContextResolver;
pub use move_validator::{MoveValidator, Verdict};
pub use mutation_engine::{MoveTicket, MutationEngine};
pub use roster_store::{RosterStatus, RosterStore};
