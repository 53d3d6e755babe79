//! Integration tests for full crawls
//!
//! These tests drive the controller end-to-end against an in-memory
//! engine with scripted replies, so no network is involved.

mod scenarios;
mod support;
