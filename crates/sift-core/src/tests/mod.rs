//! Test module for sift-core
//!
//! This module contains tests for:
//! - Mode selection and registration on the router
//! - The keyboard state machine
//! - Collection fan-out and help listing
//! - Requests applied by external plugins, debounce and process transports
//! - Configuration loading and defaults

mod help_tests;
mod router_tests;
