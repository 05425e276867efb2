//! Repository Layer
//!
//! Data access abstractions and their SQLite implementations.

mod account_repo;
pub(crate) mod db;
mod profile_repo;
mod record_repo;
mod table;
mod traits;


pub use account_repo::{AccountRepository, SessionRepository};
pub use db::{init_db, DbState};
pub use profile_repo::ProfileRepository;
pub use record_repo::RecordRepository;
pub use table::Stored;
pub use traits::Repository;
