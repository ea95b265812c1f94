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

//! # In-Process Runtime Module
//!
//! Minimal in-process implementation of [`IjForeignRuntime`].
//!
//! It keeps a live-object registry, a shared results table and a "current
//! image" pointer the way the real toolkit does, runs registered module
//! functions, and interprets a small line-oriented macro language:
//!
//! ```text
//! select A          // make the object titled "A" current
//! duplicate B       // copy the current image as "B" and make it current
//! rename C          // retitle the current image
//! new C 4 3 8       // create a 4x3 8-bit image titled "C"
//! invert            // invert the current image within its pixel range
//! add 2.5           // add a constant to every pixel
//! multiply 2        // multiply every pixel by a constant
//! stack 3           // repeat the current plane along z
//! measure           // append Mean/Min/Max of the current image to the results
//! set-result Area 4 // append a value to the results
//! close             // remove the current image
//! print text        // log a message
//! fail message      // raise an error
//! ```
//!
//! The image that is current when the script ends is reported as produced.
//! Registering an image makes it current, so an empty script produces the
//! last staged image.

use std::collections::{BTreeMap, HashMap, HashSet};

use regex::Regex;

use crate::errors::{IjError, Result};
use crate::foreign::runtime::{
    IjForeignObject,
    IjForeignRuntime,
    IjObjectId,
    IjRawUnitInfo,
    IjRunOutcome,
    IjServiceSet,
    IjRuntimeMode,
};
use crate::foreign::types::{IjForeignImage, IjForeignType, IjForeignValue};
use crate::value::IjTable;

/// Arguments handed to a module implementation.
#[derive(Clone, Debug)]
pub struct IjModuleCall {
    pub identity: String,
    pub inputs: BTreeMap<String, IjForeignValue>,
}

/// Implementation of a structured module. Returns its outputs by name.
pub type IjModuleFn = fn(&IjModuleCall) -> Result<BTreeMap<String, IjForeignValue>>;

/// In-process foreign runtime.
#[derive(Debug)]
pub struct IjInProcessRuntime {
    version: String,
    services: IjServiceSet,
    units: Vec<IjRawUnitInfo>,
    modules: HashMap<String, IjModuleFn>,
    catalog: HashMap<String, Vec<String>>,
    objects: BTreeMap<IjObjectId, IjForeignObject>,
    locked_titles: HashSet<String>,
    next_id: u64,
    current: Option<IjObjectId>,
    results: IjTable,
    command: Regex,
}

impl IjInProcessRuntime {
    #[allow(non_snake_case)]
    pub fn new(version: impl Into<String>) -> Self {
        IjInProcessRuntime::with_services(version, IjServiceSet::for_mode(IjRuntimeMode::Headless, &[]))
    }

    pub fn with_services(version: impl Into<String>, services: IjServiceSet) -> Self {
        IjInProcessRuntime {
            version: version.into(),
            services,
            units: Vec::new(),
            modules: HashMap::new(),
            catalog: HashMap::new(),
            objects: BTreeMap::new(),
            locked_titles: HashSet::new(),
            next_id: 1,
            current: None,
            results: IjTable::new(),
            command: Regex::new(r"^([a-z][a-z-]*)(?:\s+(.*?))?\s*;?$").expect("static command pattern"),
        }
    }

    pub fn services(&self) -> &IjServiceSet {
        &self.services
    }

    /// Adds a unit to the list reported by `list_available_units`. Commands
    /// without an implementation are listed but fail when run.
    pub fn register_unit(&mut self, info: IjRawUnitInfo, implementation: Option<IjModuleFn>) {
        if let Some(f) = implementation {
            self.modules.insert(info.identity.clone(), f);
        }
        self.units.push(info);
    }

    /// Registers a concrete implementation of a multiple-choice type.
    pub fn register_catalog(&mut self, type_name: &str, implementation: &str) {
        self.catalog
            .entry(type_name.to_string())
            .or_default()
            .push(implementation.to_string());
    }

    /// Objects with this title refuse to be removed, like a locked window.
    pub fn lock_title(&mut self, title: &str) {
        self.locked_titles.insert(title.to_string());
    }

    pub fn unlock_title(&mut self, title: &str) {
        self.locked_titles.remove(title);
    }

    fn insert_object(&mut self, title: &str, mut value: IjForeignValue) -> IjObjectId {
        let id = IjObjectId(self.next_id);
        self.next_id += 1;
        if let Some(image) = value.as_image_mut() {
            image.title = title.to_string();
            self.current = Some(id);
        }
        self.objects.insert(
            id,
            IjForeignObject {
                id,
                title: title.to_string(),
                value,
            },
        );
        id
    }

    fn find_by_title(&self, title: &str) -> Option<IjObjectId> {
        self.objects
            .values()
            .rev()
            .find(|o| o.title == title)
            .map(|o| o.id)
    }

    fn current_image_mut(&mut self) -> Result<&mut IjForeignImage> {
        let id = self
            .current
            .ok_or_else(|| IjError::runtime("no image is open"))?;
        self.objects
            .get_mut(&id)
            .and_then(|o| o.value.as_image_mut())
            .ok_or_else(|| IjError::runtime("current object is not an image"))
    }

    fn current_image(&self) -> Result<&IjForeignImage> {
        let id = self
            .current
            .ok_or_else(|| IjError::runtime("no image is open"))?;
        self.objects
            .get(&id)
            .and_then(|o| o.value.as_image())
            .ok_or_else(|| IjError::runtime("current object is not an image"))
    }

    fn execute_line(&mut self, line: &str) -> Result<()> {
        let captures = self
            .command
            .captures(line)
            .ok_or_else(|| IjError::runtime(format!("cannot parse macro line '{}'", line)))?;
        let command = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let arg = captures.get(2).map(|m| m.as_str().trim()).unwrap_or_default();

        match command {
            "select" => {
                let id = self
                    .find_by_title(arg)
                    .ok_or_else(|| IjError::runtime(format!("no image titled '{}'", arg)))?;
                self.current = Some(id);
            }
            "duplicate" => {
                let mut copy = self.current_image()?.clone();
                copy.title = arg.to_string();
                self.insert_object(arg, IjForeignValue::Image(copy));
            }
            "rename" => {
                let id = self
                    .current
                    .ok_or_else(|| IjError::runtime("no image is open"))?;
                self.current_image_mut()?.title = arg.to_string();
                if let Some(object) = self.objects.get_mut(&id) {
                    object.title = arg.to_string();
                }
            }
            "new" => {
                let parts: Vec<&str> = arg.split_whitespace().collect();
                if parts.len() != 4 {
                    return Err(IjError::runtime("usage: new <title> <width> <height> <bits>"));
                }
                let width = parse_number::<usize>(parts[1])?;
                let height = parse_number::<usize>(parts[2])?;
                let bit_depth = parse_number::<u8>(parts[3])?;
                let count = pixel_count(&[width, height])?;
                let image = IjForeignImage {
                    title: parts[0].to_string(),
                    dims: [width, height, 1, 1, 1],
                    pixels: vec![0.0; count],
                    bit_depth,
                };
                self.insert_object(parts[0], IjForeignValue::Image(image));
            }
            "invert" => {
                let image = self.current_image_mut()?;
                let (min, max) = match image.bit_depth {
                    8 => (0.0, u8::MAX as f64),
                    16 => (0.0, u16::MAX as f64),
                    _ => min_max(&image.pixels),
                };
                for p in &mut image.pixels {
                    *p = max - (*p - min);
                }
            }
            "add" => {
                let delta = parse_number::<f64>(arg)?;
                for p in &mut self.current_image_mut()?.pixels {
                    *p += delta;
                }
            }
            "multiply" => {
                let factor = parse_number::<f64>(arg)?;
                for p in &mut self.current_image_mut()?.pixels {
                    *p *= factor;
                }
            }
            "stack" => {
                let depth = parse_number::<usize>(arg)?;
                if depth == 0 {
                    return Err(IjError::runtime("stack depth must be positive"));
                }
                let image = self.current_image_mut()?;
                let plane = pixel_count(&image.dims[..2])?;
                let total = pixel_count(&[plane, depth])?;
                let first: Vec<f64> = image.pixels.iter().take(plane).copied().collect();
                image.pixels = first.iter().copied().cycle().take(total).collect();
                image.dims = [image.dims[0], image.dims[1], 1, depth, 1];
            }
            "measure" => {
                let image = self.current_image()?;
                let (min, max) = min_max(&image.pixels);
                let mean = if image.pixels.is_empty() {
                    0.0
                } else {
                    image.pixels.iter().sum::<f64>() / image.pixels.len() as f64
                };
                self.results.add_row();
                self.results.set_value("Mean", mean);
                self.results.set_value("Min", min);
                self.results.set_value("Max", max);
            }
            "set-result" => {
                let mut parts = arg.split_whitespace();
                let column = parts
                    .next()
                    .ok_or_else(|| IjError::runtime("usage: set-result <column> <value>"))?;
                let value = parse_number::<f64>(parts.next().unwrap_or_default())?;
                self.results.add_row();
                self.results.set_value(column, value);
            }
            "close" => {
                let id = self
                    .current
                    .ok_or_else(|| IjError::runtime("no image is open"))?;
                self.remove_object(id)?;
            }
            "print" => {
                log::info!("runtime.macro.print: {}", arg);
            }
            "fail" => {
                return Err(IjError::runtime(if arg.is_empty() { "macro aborted" } else { arg }));
            }
            other => {
                return Err(IjError::runtime(format!("unrecognized macro command '{}'", other)));
            }
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| IjError::runtime(format!("expected a number, got '{}'", raw)))
}

/// Largest image the interpreter allocates.
const MAX_PIXELS: usize = 1 << 28;

fn pixel_count(dims: &[usize]) -> Result<usize> {
    dims.iter()
        .try_fold(1usize, |count, dim| count.checked_mul(*dim))
        .filter(|count| *count <= MAX_PIXELS)
        .ok_or_else(|| IjError::runtime("image too large"))
}

fn min_max(pixels: &[f64]) -> (f64, f64) {
    if pixels.is_empty() {
        return (0.0, 0.0);
    }
    pixels
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &p| (lo.min(p), hi.max(p)))
}

impl IjForeignRuntime for IjInProcessRuntime {
    fn version(&self) -> String {
        self.version.clone()
    }

    fn list_available_units(&self) -> Result<Vec<IjRawUnitInfo>> {
        Ok(self.units.clone())
    }

    fn catalog_implementations(&self, ty: &IjForeignType) -> Vec<String> {
        self.catalog.get(ty.name()).cloned().unwrap_or_default()
    }

    fn register_object(&mut self, title: &str, value: IjForeignValue) -> Result<IjObjectId> {
        Ok(self.insert_object(title, value))
    }

    fn object(&self, id: IjObjectId) -> Option<&IjForeignObject> {
        self.objects.get(&id)
    }

    fn remove_object(&mut self, id: IjObjectId) -> Result<()> {
        let title = match self.objects.get(&id) {
            Some(object) => object.title.clone(),
            None => return Err(IjError::runtime(format!("no live object {}", id))),
        };
        if self.locked_titles.contains(&title) {
            return Err(IjError::runtime(format!("object '{}' is locked", title)));
        }
        self.objects.remove(&id);
        if self.current == Some(id) {
            self.current = None;
        }
        Ok(())
    }

    fn live_objects(&self) -> Vec<IjObjectId> {
        self.objects.keys().copied().collect()
    }

    fn reset_results(&mut self) {
        self.results.clear();
    }

    fn results(&self) -> IjTable {
        self.results.clone()
    }

    fn run_module(&mut self, identity: &str, inputs: &BTreeMap<String, IjObjectId>) -> Result<IjRunOutcome> {
        let implementation = *self
            .modules
            .get(identity)
            .ok_or_else(|| IjError::runtime(format!("module '{}' has no implementation", identity)))?;

        let mut values = BTreeMap::new();
        for (name, id) in inputs {
            let object = self
                .objects
                .get(id)
                .ok_or_else(|| IjError::runtime(format!("input '{}' refers to missing object {}", name, id)))?;
            values.insert(name.clone(), object.value.clone());
        }

        let call = IjModuleCall {
            identity: identity.to_string(),
            inputs: values,
        };
        let outputs = implementation(&call)?;
        Ok(IjRunOutcome {
            produced: None,
            outputs,
        })
    }

    fn run_script(&mut self, code: &str, args: &str) -> Result<IjRunOutcome> {
        if !args.is_empty() {
            log::debug!("runtime.macro.args: script arguments ignored by in-process runtime - args={}", args);
        }
        for raw in code.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            self.execute_line(line)?;
        }
        let produced = self.current.filter(|id| self.objects.contains_key(id));
        Ok(IjRunOutcome {
            produced,
            outputs: BTreeMap::new(),
        })
    }
}
