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

//! Lazily created, process-wide gateway.
//!
//! The foreign runtime can exist only once per process and cannot be
//! re-created in another mode. The first successful initialization wins;
//! later calls get the same gateway whatever mode they ask for.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::adapter::registry::IjTypeAdapterRegistry;
use crate::config::IjGatewayConfig;
use crate::errors::Result;
use crate::foreign::runtime::{IjForeignRuntime, IjServiceSet};
use crate::gateway::engine::IjGateway;

#[derive(Debug)]
pub struct IjGatewayCell {
    gateway: OnceLock<Arc<IjGateway>>,
    init: Mutex<()>,
}

impl Default for IjGatewayCell {
    fn default() -> Self {
        IjGatewayCell::new()
    }
}

impl IjGatewayCell {
    pub const fn new() -> Self {
        IjGatewayCell {
            gateway: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// The cell shared by the whole process.
    pub fn global() -> &'static IjGatewayCell {
        static GLOBAL: IjGatewayCell = IjGatewayCell::new();
        &GLOBAL
    }

    pub fn get(&self) -> Option<Arc<IjGateway>> {
        self.gateway.get().cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.gateway.get().is_some()
    }

    /// Returns the gateway, creating it on first use. A failed creation
    /// leaves the cell empty so a later call can retry.
    pub fn get_or_init<F>(
        &self,
        config: IjGatewayConfig,
        adapters: IjTypeAdapterRegistry,
        factory: F,
    ) -> Result<Arc<IjGateway>>
    where
        F: FnOnce(&IjServiceSet) -> Result<Box<dyn IjForeignRuntime>>,
    {
        if let Some(existing) = self.gateway.get() {
            return Ok(Self::reuse(existing, &config));
        }

        let _init = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = self.gateway.get() {
            return Ok(Self::reuse(existing, &config));
        }

        let gateway = Arc::new(IjGateway::new(config, adapters, factory)?);
        let gateway = self.gateway.get_or_init(|| gateway);
        Ok(Arc::clone(gateway))
    }

    fn reuse(existing: &Arc<IjGateway>, requested: &IjGatewayConfig) -> Arc<IjGateway> {
        if existing.mode() != requested.mode {
            log::warn!(
                "gateway.cell.mode_mismatch: foreign runtime already created, keeping its mode - existing={:?}, requested={:?}",
                existing.mode(),
                requested.mode
            );
        }
        Arc::clone(existing)
    }
}
