//! Integration tests for chat-collections
//!
//! These tests drive the session core end to end, either against the
//! in-memory gateway or against a local HTTP server.

#[path = "../common/mod.rs"]
pub mod common;

pub mod cli;
pub mod http_gateway;
