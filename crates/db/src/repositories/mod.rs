//! Repositories implementing the core collaborator traits.
//!
//! Repositories provide a clean interface for database operations, hiding
//! the `SeaORM` implementation details from the rest of the application.
//! Each one also implements the matching collaborator trait from
//! `kakeibo-core`, so the expense service can be wired up with them
//! directly.

pub mod audit_log;
pub mod expense;
pub mod family;
pub mod user;

pub use audit_log::AuditLogRepository;
pub use expense::ExpenseRepository;
pub use family::FamilyRepository;
pub use user::UserRepository;
