//! Integration tests for the proxy
//!
//! These drive the real router against a mocked upstream, and the real
//! credential acquirer against a mocked DevTools endpoint.

mod chat_completions;
mod models;
