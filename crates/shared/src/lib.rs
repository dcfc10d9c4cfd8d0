//! Shared types, configuration, and auth plumbing for Kakeibo.
//!
//! This crate provides common pieces used across all other crates:
//! - Application configuration management
//! - JWT claims and token service
//! - Pagination types for list endpoints

pub mod auth;
pub mod config;
pub mod jwt;
pub mod types;

pub use config::AppConfig;
pub use jwt::{JwtConfig, JwtError, JwtService};
pub use types::{PageMeta, PageRequest, PageResponse};
