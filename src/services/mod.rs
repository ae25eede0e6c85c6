//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the chat-log persistence and aggregation logic so
//! route handlers can stay focused on request parsing and auth plumbing.
//! Services are stateless between calls: every operation takes the store
//! and the session it works on, and returns the updated session.

pub mod auth;
pub mod chat;
pub mod echo;
pub mod feedback;
pub mod preview;
pub mod session;
pub mod store;
pub mod usage;
