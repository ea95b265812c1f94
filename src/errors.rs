//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Zi.
//! The Zi project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # ijgate Error Module
//!
//! This module defines the error types used throughout the bridge.
//!
//! ## Error Categories
//!
//! Only a few variants are meant to cross the gateway boundary:
//!
//! - **UnsupportedType**: a parameter or result type has no adapter and is not
//!   primitive. Raised before the foreign environment is touched, so the host
//!   can report it as a configuration problem.
//! - **Execution**: the foreign runtime raised while running a unit. Raised
//!   after teardown has been attempted. Never retried.
//! - **EnvironmentBusy**: the same thread tried to enter the gateway while
//!   already holding the execution permit.
//! - **Timeout**: a caller-supplied deadline expired.
//! - **UnitUnavailable**: a persisted unit identity no longer resolves.
//!
//! The remaining variants describe local failures (configuration files,
//! conversions, the runtime factory) that callers usually surface verbatim.
//!
//! ## Usage
//!
//! ```rust
//! use ijgate::errors::{IjError, Result};
//!
//! fn check_name(name: &str) -> Result<()> {
//!     if name.is_empty() {
//!         return Err(IjError::invalid_request("input name cannot be empty"));
//!     }
//!     Ok(())
//! }
//! ```

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience result type used throughout ijgate.
pub type Result<T> = std::result::Result<T, IjError>;

/// Canonical error enumeration for ijgate.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum IjError {
    /// A parameter or result type can neither be adapted nor passed as a
    /// primitive.
    #[error("unsupported type '{type_name}' for parameter '{parameter}'")]
    UnsupportedType { parameter: String, type_name: String },

    /// The foreign runtime raised while running a unit.
    #[error("execution of '{unit}' failed: {message}")]
    Execution { unit: String, message: String },

    /// Reentrant use of the execution gateway from the thread that holds it.
    #[error("foreign environment is busy: {0}")]
    EnvironmentBusy(String),

    /// The caller-supplied deadline expired.
    #[error("execution of '{unit}' exceeded its deadline of {deadline_ms} ms")]
    Timeout { unit: String, deadline_ms: u64 },

    /// A persisted unit identity could not be resolved.
    #[error("unit '{identity}' is no longer available (saved with version '{version}')")]
    UnitUnavailable { identity: String, version: String },

    /// The foreign runtime could not enumerate its units.
    #[error("discovery error: {0}")]
    Discovery(String),

    /// The request itself is malformed.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// A value could not be converted between host and foreign form.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Errors reported by the foreign runtime outside of a unit run.
    #[error("foreign runtime error: {0}")]
    Runtime(String),

    /// Errors originating from filesystem IO.
    #[error("io error: {0}")]
    Io(String),

    /// Wrapper for serde-style serialization issues.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Catch-all variant for unexpected situations.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for IjError {
    fn from(err: io::Error) -> Self {
        IjError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for IjError {
    fn from(err: serde_json::Error) -> Self {
        IjError::Serde(err.to_string())
    }
}

impl From<serde_yaml::Error> for IjError {
    fn from(err: serde_yaml::Error) -> Self {
        IjError::Serde(err.to_string())
    }
}

impl IjError {
    /// Helper to construct unsupported type errors.
    pub fn unsupported_type(parameter: impl Into<String>, type_name: impl Into<String>) -> Self {
        IjError::UnsupportedType {
            parameter: parameter.into(),
            type_name: type_name.into(),
        }
    }

    /// Helper to construct execution errors.
    pub fn execution(unit: impl Into<String>, message: impl Into<String>) -> Self {
        IjError::Execution {
            unit: unit.into(),
            message: message.into(),
        }
    }

    /// Helper to construct invalid request errors.
    pub fn invalid_request<T: Into<String>>(message: T) -> Self {
        IjError::InvalidRequest {
            message: message.into(),
        }
    }

    /// Helper to construct conversion errors.
    pub fn conversion<T: Into<String>>(message: T) -> Self {
        IjError::Conversion(message.into())
    }

    /// Helper to construct foreign runtime errors.
    pub fn runtime<T: Into<String>>(message: T) -> Self {
        IjError::Runtime(message.into())
    }

    /// Helper to construct configuration errors.
    pub fn config<T: Into<String>>(message: T) -> Self {
        IjError::Config(message.into())
    }

    /// Helper to construct internal errors.
    pub fn internal<T: Into<String>>(message: T) -> Self {
        IjError::Internal(message.into())
    }

    /// Whether this error is one the gateway reports as a configuration-time
    /// failure rather than a failure of a single run.
    pub fn is_configuration_failure(&self) -> bool {
        matches!(
            self,
            IjError::UnsupportedType { .. }
                | IjError::UnitUnavailable { .. }
                | IjError::InvalidRequest { .. }
                | IjError::Config(_)
        )
    }
}
