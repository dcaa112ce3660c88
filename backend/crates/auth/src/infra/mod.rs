//! Infrastructure Layer
//!
//! Repository implementations: PostgreSQL for deployments, in-memory for
//! local runs and tests.

pub mod memory;
pub mod postgres;

pub use memory::MemoryAuthStore;
pub use postgres::PgAuthStore;
