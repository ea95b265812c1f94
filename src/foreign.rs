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

pub mod types;
pub mod runtime;
pub mod in_process;

pub use types::{IjForeignImage, IjForeignType, IjForeignValue, PRIMITIVE_TYPE_NAMES};
pub use runtime::{
    IjForeignObject,
    IjForeignRuntime,
    IjObjectId,
    IjRawParameter,
    IjRawUnitInfo,
    IjRunOutcome,
    IjRuntimeMode,
    IjServiceSet,
    IjTypeRef,
    IjUnitKind,
    GUI_SERVICES,
    HEADLESS_SERVICES,
    is_runtime_service,
};
pub use in_process::{IjInProcessRuntime, IjModuleCall, IjModuleFn};
