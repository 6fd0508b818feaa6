mod account;
mod integrity;
mod money;
mod transaction;

pub use account::*;
pub use integrity::*;
pub use money::*;
pub use transaction::*;
