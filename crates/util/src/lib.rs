//! Shared plumbing for the transfer agents: the bounded-retry policy wrapping
//! all cross-agent calls, and HTTP client configuration.

pub mod http;
pub mod retry;
