//! Domain Layer
//!
//! Account records and the errors raised below the gateway boundary.

mod account;
mod error;

pub use account::{hash_password, Account};
pub use error::{DomainError, DomainResult};
