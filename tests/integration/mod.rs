//! Integration tests for the tiered relay
//!
//! These tests drive the real router over mocked upstreams and check the
//! complete request/response flow: context lookup, tier races, escalation,
//! and the HTTP mapping of each outcome.

mod chat_streaming;
mod health;
mod search;
