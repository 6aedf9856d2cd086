pub mod http;
pub mod memory;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use http::*;
pub use memory::*;
pub use traits::*;
