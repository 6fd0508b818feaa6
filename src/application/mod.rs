// Application layer - the ledger engine and its query facade.

pub mod error;
mod locks;
mod service;

pub use error::*;
pub use locks::*;
pub use service::*;
