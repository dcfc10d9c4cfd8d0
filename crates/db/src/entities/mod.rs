//! `SeaORM` entity definitions.

pub mod audit_logs;
pub mod expenses;
pub mod families;
pub mod family_members;
pub mod users;
