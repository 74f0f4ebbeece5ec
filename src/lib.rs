//! Session and authorization gate for the church site.
//!
//! Tracks who is signed in, resolves their team roles, and runs the route
//! guards that decide whether a protected page renders or redirects.

pub mod config;
pub mod db;
pub mod guard;
pub mod identity;
pub mod navigation;
pub mod roles;
pub mod routes;
pub mod services;
pub mod state;
