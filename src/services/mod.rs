//! Persistence-backed services behind the identity and role seams.
//!
//! ARCHITECTURE
//! ============
//! Service modules own SQL so route handlers and guards only see traits
//! (`AccountStore`, `RoleStore`).

pub mod accounts;
pub mod roles;
pub mod session;
