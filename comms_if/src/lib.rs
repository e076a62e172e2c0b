//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the navigation software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Telecommands (goals and cancels) sent to the navigation executable
pub mod tc;

/// Message definitions for equipment (pose sources and drive sinks)
pub mod eqpt;

/// Network module
pub mod net;
