//! taulib-test-harness: Test utilities for taulib.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! the camera protocol engine without a camera attached, and
//! [`MockHandle`] for inspecting and scripting the mock after it has been
//! moved into a session.

pub mod mock_serial;

pub use mock_serial::{MockHandle, MockTransport};
