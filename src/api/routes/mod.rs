//! API route modules.

pub mod credential;
pub mod recordings;
pub mod session;
