//! opshim - adaptive app-ops hook engine
//!
//! This library exposes the load-time engine (variant resolution, recursive
//! method binding, guarded callbacks, isolated hacks) and the
//! operation/switch/mode model the settings UI is built on.

pub mod config;
pub mod constants;
pub mod engine;
pub mod hack;
pub mod hook;
pub mod logging;
pub mod models;
pub mod ops;
pub mod variant;
