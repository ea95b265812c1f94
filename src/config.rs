//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Zi.
//! The Zi project belongs to the Dunimd project team.
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

//! # Gateway Configuration Module
//!
//! Settings for creating the foreign runtime and running units through the
//! gateway. Missing fields fall back to their defaults, so partial JSON or
//! YAML documents are accepted.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{IjError, Result};
use crate::foreign::runtime::IjRuntimeMode;

/// Service-set property carrying the foreign log level.
pub const LOG_LEVEL_PROPERTY: &str = "log-level";
/// Service-set property telling the runtime not to open windows.
pub const BATCH_MODE_PROPERTY: &str = "batch-mode";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IjGatewayConfig {
    /// Mode the foreign runtime is created in. Fixed once created.
    pub mode: IjRuntimeMode,
    /// Log level handed to the foreign runtime.
    pub foreign_log_level: String,
    /// Title under which `run_on` stages its single image.
    pub default_input_name: String,
    /// Upper bound for one execution, including the wait for the permit.
    pub execution_timeout_ms: Option<u64>,
    pub batch_mode: bool,
    /// Remove every live foreign object after a run, not only staged ones.
    pub sweep_foreign_objects: bool,
}

impl Default for IjGatewayConfig {
    fn default() -> Self {
        Self {
            mode: IjRuntimeMode::Headless,
            foreign_log_level: "error".to_string(),
            default_input_name: "A".to_string(),
            execution_timeout_ms: None,
            batch_mode: true,
            sweep_foreign_objects: true,
        }
    }
}

impl IjGatewayConfig {
    #[allow(non_snake_case)]
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(non_snake_case)]
    pub fn mode(mut self, mode: IjRuntimeMode) -> Self {
        self.mode = mode;
        self
    }

    #[allow(non_snake_case)]
    pub fn foreign_log_level(mut self, level: &str) -> Self {
        self.foreign_log_level = level.to_string();
        self
    }

    #[allow(non_snake_case)]
    pub fn default_input_name(mut self, name: &str) -> Self {
        self.default_input_name = name.to_string();
        self
    }

    #[allow(non_snake_case)]
    pub fn execution_timeout_ms(mut self, millis: u64) -> Self {
        self.execution_timeout_ms = Some(millis);
        self
    }

    #[allow(non_snake_case)]
    pub fn batch_mode(mut self, enabled: bool) -> Self {
        self.batch_mode = enabled;
        self
    }

    #[allow(non_snake_case)]
    pub fn sweep_foreign_objects(mut self, enabled: bool) -> Self {
        self.sweep_foreign_objects = enabled;
        self
    }

    pub fn execution_timeout(&self) -> Option<Duration> {
        self.execution_timeout_ms.map(Duration::from_millis)
    }

    /// Rejects settings the gateway cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.default_input_name.trim().is_empty() {
            return Err(IjError::config("default_input_name must not be empty"));
        }
        if self.foreign_log_level.trim().is_empty() {
            return Err(IjError::config("foreign_log_level must not be empty"));
        }
        if self.execution_timeout_ms == Some(0) {
            return Err(IjError::config("execution_timeout_ms must be positive"));
        }
        Ok(())
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        let config: IjGatewayConfig = serde_json::from_value(value.clone())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: IjGatewayConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: IjGatewayConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config file. `.yaml` and `.yml` are read as YAML, anything
    /// else as JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);
        log::debug!(
            "config.load: loading gateway config - path={}, format={}",
            path.display(),
            if is_yaml { "yaml" } else { "json" }
        );
        if is_yaml {
            Self::from_yaml_str(&text)
        } else {
            Self::from_json_str(&text)
        }
    }
}
