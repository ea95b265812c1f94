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

//! # ijgate Core Library
//!
//! Bridges a host application with a stateful foreign imaging toolkit that
//! runs in the same process. The host discovers which foreign units it can
//! drive, converts its values to and from the foreign representation, and
//! runs units against the one shared foreign environment without
//! interleaving.
//!
//! ## Module Overview
//!
//! - **value**: host values (numbers, text, files, colors, vectors, images, tables)
//! - **foreign**: foreign types and values, the runtime trait, an in-process runtime
//! - **adapter**: type adapter registry and built-in converters
//! - **module**: discovery and indexing of invocable units
//! - **gateway**: serialized execution against the foreign runtime
//! - **macro_engine**: macro text run on named host images
//! - **config**: gateway configuration
//!
//! ## Quick Start
//!
//! ```rust
//! use ijgate::{IjGateway, IjGatewayConfig, IjImage, IjInProcessRuntime, IjMacro, IjPixelType, IjTypeAdapterRegistry};
//!
//! let gateway = IjGateway::new(
//!     IjGatewayConfig::default(),
//!     IjTypeAdapterRegistry::with_defaults(),
//!     |services| Ok(Box::new(IjInProcessRuntime::with_services("2.14.0", services.clone()))),
//! )
//! .unwrap();
//!
//! let image = IjImage::filled(vec![4, 4], 10.0, IjPixelType::UnsignedByte).unwrap();
//! let output = IjMacro::new("invert").run_on(&gateway, image, None).unwrap();
//! assert_eq!(output.image().unwrap().pixels()[0], 245.0);
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, IjError>`. Discovery rejections and
//! teardown failures are logged, never returned.

pub mod errors;
pub mod value;
pub mod foreign;
pub mod adapter;
pub mod module;
pub mod gateway;
pub mod macro_engine;
pub mod config;

pub use errors::{IjError, Result};
pub use value::{IjColor, IjHostType, IjHostValue, IjImage, IjImageMetadata, IjPixelType, IjTable};
pub use foreign::{
    IjForeignImage,
    IjForeignObject,
    IjForeignRuntime,
    IjForeignType,
    IjForeignValue,
    IjInProcessRuntime,
    IjModuleCall,
    IjModuleFn,
    IjObjectId,
    IjRawParameter,
    IjRawUnitInfo,
    IjRunOutcome,
    IjRuntimeMode,
    IjServiceSet,
    IjTypeRef,
    IjUnitKind,
};
pub use adapter::{
    convert_primitive,
    IjAdapterDirection,
    IjInputAdapter,
    IjOutputAdapter,
    IjOutputHints,
    IjTypeAdapterRegistry,
};
pub use module::{
    IjBinding,
    IjBindingPlan,
    IjDiscoveryOutcome,
    IjModuleDescriptor,
    IjModuleRegistry,
    IjParameter,
    IjParameterSupport,
    IjRejection,
};
pub use gateway::{
    IjExecutionGate,
    IjExecutionPermit,
    IjExecutionRequest,
    IjExecutionResult,
    IjExecutionTarget,
    IjGateway,
    IjGatewayCell,
    IjTeardownWarning,
};
pub use macro_engine::{IjMacro, IjMacroOutput};
pub use config::IjGatewayConfig;
