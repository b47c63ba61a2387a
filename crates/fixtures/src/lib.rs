//! State test fixture types used by `evmbench`.
//!
//! A fixture file maps test names to [`TestUnit`]s. Each unit carries the block
//! environment, the pre-state accounts and the transaction parts, and knows how
//! to turn itself into the inputs `revm` executes.

mod deserializer;
mod env;
mod error;
mod pre_account;
mod test_authorization;
mod test_suite;
mod test_unit;
mod transaction;

pub use deserializer::*;
pub use env::*;
pub use error::*;
pub use pre_account::*;
pub use test_authorization::*;
pub use test_suite::*;
pub use test_unit::*;
pub use transaction::*;
