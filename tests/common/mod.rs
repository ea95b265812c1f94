//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Zi.
//! The Zi project belongs to the Dunimd project team.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use ijgate::{
    IjError, IjForeignObject, IjForeignRuntime, IjForeignType, IjForeignValue, IjGateway, IjGatewayConfig, IjImage,
    IjInProcessRuntime, IjModuleCall, IjObjectId, IjPixelType, IjRawParameter, IjRawUnitInfo, IjRunOutcome,
    IjServiceSet, IjTable, IjTypeAdapterRegistry,
};

pub const RUNTIME_VERSION: &str = "2.14.0";
pub const SERVICE_TYPE: &str = "op-service";
pub const METHOD_TYPE: &str = "threshold-method";

/// Identities that pass discovery with [`adapters`].
pub const SUPPORTED: &[&str] = &["threshold", "add-constant", "measure-mean", "pick-method", "always-fails", "slow"];

pub fn adapters() -> IjTypeAdapterRegistry {
    let mut adapters = IjTypeAdapterRegistry::with_defaults();
    adapters.register_service_type(IjForeignType::new(SERVICE_TYPE));
    adapters
}

fn image_input(call: &IjModuleCall) -> ijgate::Result<&ijgate::IjForeignImage> {
    call.inputs
        .get("image")
        .and_then(|v| v.as_image())
        .ok_or_else(|| IjError::runtime("missing image input"))
}

fn threshold(call: &IjModuleCall) -> ijgate::Result<BTreeMap<String, IjForeignValue>> {
    let level = match call.inputs.get("level") {
        Some(IjForeignValue::Float(level)) => *level,
        _ => 0.0,
    };
    let mut mask = image_input(call)?.clone();
    mask.title = "mask".to_string();
    mask.bit_depth = 8;
    for p in &mut mask.pixels {
        *p = if *p >= level { 255.0 } else { 0.0 };
    }
    Ok(BTreeMap::from([("mask".to_string(), IjForeignValue::Image(mask))]))
}

fn add_constant(call: &IjModuleCall) -> ijgate::Result<BTreeMap<String, IjForeignValue>> {
    let value = match call.inputs.get("value") {
        Some(IjForeignValue::Float(value)) => *value,
        _ => 0.0,
    };
    let mut result = image_input(call)?.clone();
    for p in &mut result.pixels {
        *p += value;
    }
    Ok(BTreeMap::from([("result".to_string(), IjForeignValue::Image(result))]))
}

fn measure_mean(call: &IjModuleCall) -> ijgate::Result<BTreeMap<String, IjForeignValue>> {
    let image = image_input(call)?;
    let mean = image.pixels.iter().sum::<f64>() / image.pixels.len().max(1) as f64;
    Ok(BTreeMap::from([("mean".to_string(), IjForeignValue::Float(mean))]))
}

fn pick_method(call: &IjModuleCall) -> ijgate::Result<BTreeMap<String, IjForeignValue>> {
    let used = match call.inputs.get("method") {
        Some(IjForeignValue::Choice(method)) => method.clone(),
        _ => return Err(IjError::runtime("no method chosen")),
    };
    Ok(BTreeMap::from([("used".to_string(), IjForeignValue::Text(used))]))
}

fn always_fails(_call: &IjModuleCall) -> ijgate::Result<BTreeMap<String, IjForeignValue>> {
    Err(IjError::runtime("out of memory"))
}

fn slow(call: &IjModuleCall) -> ijgate::Result<BTreeMap<String, IjForeignValue>> {
    let millis = match call.inputs.get("millis") {
        Some(IjForeignValue::Int(millis)) => *millis as u64,
        _ => 50,
    };
    thread::sleep(Duration::from_millis(millis));
    Ok(BTreeMap::from([("done".to_string(), IjForeignValue::Bool(true))]))
}

/// In-process runtime with a fixed unit set covering every discovery rule.
pub fn sample_runtime(services: &IjServiceSet) -> IjInProcessRuntime {
    let mut runtime = IjInProcessRuntime::with_services(RUNTIME_VERSION, services.clone());

    runtime.register_unit(
        IjRawUnitInfo::command("threshold", "Threshold")
            .input(IjRawParameter::new("image", IjForeignType::dataset()))
            .input(IjRawParameter::new("level", IjForeignType::double()))
            .output(IjRawParameter::new("mask", IjForeignType::image_plus())),
        Some(threshold),
    );
    runtime.register_unit(
        IjRawUnitInfo::command("add-constant", "Add Constant")
            .input(IjRawParameter::new("ops", IjForeignType::new(SERVICE_TYPE)))
            .input(IjRawParameter::new("image", IjForeignType::dataset()))
            .input(IjRawParameter::new("value", IjForeignType::double()).optional())
            .output(IjRawParameter::new("result", IjForeignType::dataset())),
        Some(add_constant),
    );
    runtime.register_unit(
        IjRawUnitInfo::command("measure-mean", "Measure Mean")
            .input(IjRawParameter::new("image", IjForeignType::image_plus()))
            .output(IjRawParameter::new("mean", IjForeignType::double())),
        Some(measure_mean),
    );
    runtime.register_unit(
        IjRawUnitInfo::command("pick-method", "Pick Method")
            .input(IjRawParameter::new("method", IjForeignType::new(METHOD_TYPE)))
            .output(IjRawParameter::new("used", IjForeignType::string())),
        Some(pick_method),
    );
    runtime.register_catalog(METHOD_TYPE, "Otsu");
    runtime.register_catalog(METHOD_TYPE, "Huang");
    runtime.register_unit(
        IjRawUnitInfo::command("always-fails", "Always Fails")
            .input(IjRawParameter::new("image", IjForeignType::dataset()))
            .output(IjRawParameter::new("result", IjForeignType::dataset())),
        Some(always_fails),
    );
    runtime.register_unit(
        IjRawUnitInfo::command("slow", "Slow")
            .input(IjRawParameter::new("millis", IjForeignType::long()).optional())
            .output(IjRawParameter::new("done", IjForeignType::boolean())),
        Some(slow),
    );

    // Rejected candidates.
    runtime.register_unit(
        IjRawUnitInfo::command("threshold", "Threshold (legacy)")
            .input(IjRawParameter::new("image", IjForeignType::image_plus())),
        None,
    );
    runtime.register_unit(
        IjRawUnitInfo::command("paint-tool", "Paint Tool")
            .input(IjRawParameter::new("image", IjForeignType::image_plus()))
            .headless(false),
        None,
    );
    runtime.register_unit(
        IjRawUnitInfo::command("dynamic-filter", "Dynamic Filter")
            .input(IjRawParameter::new("image", IjForeignType::dataset()))
            .dynamic(Some(true)),
        None,
    );
    runtime.register_unit(
        IjRawUnitInfo::command("broken-class", "Broken Class")
            .input(IjRawParameter::new("image", IjForeignType::dataset()))
            .dynamic(None),
        None,
    );
    runtime.register_unit(
        IjRawUnitInfo::command("roi-manager", "ROI Manager").input(IjRawParameter::new("roi", IjForeignType::new("roi"))),
        None,
    );
    runtime.register_unit(
        IjRawUnitInfo::command("overlay", "Overlay")
            .input(IjRawParameter::new("image", IjForeignType::dataset()))
            .output(IjRawParameter::new("overlay", IjForeignType::new("overlay"))),
        None,
    );
    runtime.register_unit(IjRawUnitInfo::command("about", "About"), None);
    runtime.register_unit(
        IjRawUnitInfo::command("missing-plugin", "Missing Plugin").input(IjRawParameter::unresolved(
            "image",
            "net.example.Missing",
            "class not found",
        )),
        None,
    );
    runtime
}

pub fn gateway() -> IjGateway {
    gateway_with(IjGatewayConfig::default())
}

pub fn gateway_with(config: IjGatewayConfig) -> IjGateway {
    IjGateway::new(config, adapters(), |services| Ok(Box::new(sample_runtime(services)))).unwrap()
}

/// Gateway over a runtime that refuses to remove objects with these titles.
pub fn gateway_with_locked(titles: &[&str]) -> IjGateway {
    IjGateway::new(IjGatewayConfig::default(), adapters(), |services| {
        let mut runtime = sample_runtime(services);
        for title in titles {
            runtime.lock_title(title);
        }
        Ok(Box::new(runtime))
    })
    .unwrap()
}

pub fn image_2d(width: usize, height: usize, pixel_type: IjPixelType) -> IjImage {
    let pixels = (0..width * height).map(|p| (p % 200) as f64).collect();
    IjImage::new(vec![width, height], pixels, pixel_type).unwrap()
}

/// Counts how many runs are inside the foreign runtime at the same time.
#[derive(Debug, Default)]
pub struct Probe {
    active: AtomicUsize,
    max_active: AtomicUsize,
    runs: AtomicUsize,
    live_at_start: Mutex<Vec<usize>>,
}

impl Probe {
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Live object count seen at the start of every run.
    pub fn live_at_start(&self) -> Vec<usize> {
        self.live_at_start.lock().unwrap().clone()
    }

    fn enter(&self, live: usize) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.live_at_start.lock().unwrap().push(live);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runtime wrapper that records overlapping runs.
#[derive(Debug)]
pub struct ProbeRuntime {
    inner: IjInProcessRuntime,
    probe: Arc<Probe>,
    hold: Duration,
}

impl ProbeRuntime {
    pub fn new(inner: IjInProcessRuntime, probe: Arc<Probe>, hold: Duration) -> Self {
        ProbeRuntime { inner, probe, hold }
    }

    fn observe<T>(&mut self, run: impl FnOnce(&mut IjInProcessRuntime) -> T) -> T {
        self.probe.enter(self.inner.live_objects().len());
        thread::sleep(self.hold);
        let result = run(&mut self.inner);
        self.probe.exit();
        result
    }
}

impl IjForeignRuntime for ProbeRuntime {
    fn version(&self) -> String {
        self.inner.version()
    }

    fn list_available_units(&self) -> ijgate::Result<Vec<IjRawUnitInfo>> {
        self.inner.list_available_units()
    }

    fn catalog_implementations(&self, ty: &IjForeignType) -> Vec<String> {
        self.inner.catalog_implementations(ty)
    }

    fn register_object(&mut self, title: &str, value: IjForeignValue) -> ijgate::Result<IjObjectId> {
        self.inner.register_object(title, value)
    }

    fn object(&self, id: IjObjectId) -> Option<&IjForeignObject> {
        self.inner.object(id)
    }

    fn remove_object(&mut self, id: IjObjectId) -> ijgate::Result<()> {
        self.inner.remove_object(id)
    }

    fn live_objects(&self) -> Vec<IjObjectId> {
        self.inner.live_objects()
    }

    fn reset_results(&mut self) {
        self.inner.reset_results()
    }

    fn results(&self) -> IjTable {
        self.inner.results()
    }

    fn run_module(&mut self, identity: &str, inputs: &BTreeMap<String, IjObjectId>) -> ijgate::Result<IjRunOutcome> {
        self.observe(|inner| inner.run_module(identity, inputs))
    }

    fn run_script(&mut self, code: &str, args: &str) -> ijgate::Result<IjRunOutcome> {
        self.observe(|inner| inner.run_script(code, args))
    }
}

pub fn probed_gateway(probe: Arc<Probe>, hold: Duration) -> IjGateway {
    IjGateway::new(IjGatewayConfig::default(), adapters(), move |services| {
        Ok(Box::new(ProbeRuntime::new(sample_runtime(services), probe, hold)))
    })
    .unwrap()
}
