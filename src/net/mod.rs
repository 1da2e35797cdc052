//! Networking: the injected API client and the auth backends built on it.
//!
//! SYSTEM CONTEXT
//! ==============
//! `client` carries the bearer token, `backend` defines the auth endpoints the
//! session layer needs and implements them over HTTP, and `memory` is the
//! in-process fake with the same contract.

pub mod backend;
pub mod client;
pub mod memory;

pub use backend::{AuthBackend, HttpBackend};
pub use client::{ApiClient, InterceptorBinding};
pub use memory::MemoryBackend;
