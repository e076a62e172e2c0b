//! # Telecommand module
//!
//! This module provides telecommand functionality to the communications
//! interface.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod nav;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use thiserror::Error;

// Internal
use nav::GoalTc;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the navigation executable by the operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Tc {
    /// Drive to a new goal, preempting any motion in progress.
    NavGoal(GoalTc),

    /// Stop the motion in progress without starting a new one.
    NavCancel,
}

/// Response to a telecommand.
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq)]
pub enum TcResponse {
    /// The TC was accepted and will be executed
    Ok,

    /// The TC could not be parsed
    Invalid,

    /// The TC was valid but cannot be executed right now
    CannotExecute,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {

    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)
    }

    /// Serialise the TC into a JSON packet
    pub fn to_json(&self) -> Result<String, TcParseError> {
        serde_json::to_string(self).map_err(TcParseError::InvalidJson)
    }
}
