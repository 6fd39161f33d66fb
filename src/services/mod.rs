//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the business rules (admin gate, session lifetimes,
//! user filtering) so route handlers stay focused on protocol translation
//! and cookie plumbing.

pub mod auth;
pub mod directory;
pub mod session;
