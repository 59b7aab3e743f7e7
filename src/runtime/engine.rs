//! Client for the external inference engine.
//!
//! The client owns the engine source configuration and the lazily loaded
//! module handle. The handle is replaced wholesale when the source changes;
//! every invocation gets its own output buffer, so concurrent calls through
//! one handle never see each other's lines.

use std::sync::{Arc, RwLock};
use std::time::Instant;

use tracing::{debug, info};

use super::normalize::{normalize_catalog, normalize_result, parse_output};
use crate::api::*;

/// Program name passed as `argv[0]` to the engine.
pub const ENGINE_PROGRAM: &str = "infer";

/// Argument list for the catalog query.
pub fn meta_invocation() -> EngineInvocation {
    EngineInvocation {
        argv: vec![ENGINE_PROGRAM.to_string(), "--meta".to_string()],
    }
}

/// `infer --typing|--subtyping <algorithm> [--variant <id>] <inputs...>`
pub fn marshal(request: &AlgorithmRequest) -> EngineInvocation {
    let mut argv = vec![ENGINE_PROGRAM.to_string()];
    let flag = match request {
        AlgorithmRequest::Inference(_) => "--typing",
        AlgorithmRequest::Subtyping(_) => "--subtyping",
    };
    argv.push(flag.to_string());
    argv.push(request.algorithm().to_string());
    if let Some(variant) = request.variant() {
        argv.push("--variant".to_string());
        argv.push(variant.to_string());
    }
    match request {
        AlgorithmRequest::Inference(r) => argv.push(r.expression.clone()),
        AlgorithmRequest::Subtyping(r) => {
            argv.push(r.left_type.clone());
            argv.push(r.right_type.clone());
        }
    }
    EngineInvocation { argv }
}

struct ClientState {
    source: WasmSource,
    handle: Option<Arc<dyn CommandModule>>,
}

pub struct EngineClient {
    loader: Box<dyn ModuleLoader>,
    state: RwLock<ClientState>,
}

impl std::fmt::Debug for EngineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (source, loaded) = match self.state.read() {
            Ok(state) => (Some(state.source.clone()), state.handle.is_some()),
            Err(_) => (None, false),
        };
        f.debug_struct("EngineClient")
            .field("source", &source)
            .field("loaded", &loaded)
            .finish()
    }
}

impl EngineClient {
    pub fn new(source: WasmSource, loader: Box<dyn ModuleLoader>) -> Self {
        Self {
            loader,
            state: RwLock::new(ClientState {
                source,
                handle: None,
            }),
        }
    }

    pub fn source(&self) -> Result<WasmSource, PlaygroundError> {
        Ok(self.read_state()?.source.clone())
    }

    pub fn is_loaded(&self) -> bool {
        self.read_state().map(|s| s.handle.is_some()).unwrap_or(false)
    }

    /// Switch to another engine source. The current handle is dropped only
    /// if the source actually differs.
    pub fn set_source(&self, source: WasmSource) -> Result<bool, PlaygroundError> {
        let mut state = self.write_state()?;
        if state.source == source {
            return Ok(false);
        }
        info!(
            from = %state.source.describe(),
            to = %source.describe(),
            "engine source changed; module will be reloaded"
        );
        state.source = source;
        state.handle = None;
        Ok(true)
    }

    /// The loaded module, loading it on first use.
    pub fn module(&self) -> Result<Arc<dyn CommandModule>, PlaygroundError> {
        if let Some(handle) = &self.read_state()?.handle {
            return Ok(Arc::clone(handle));
        }
        let mut state = self.write_state()?;
        // Another caller may have loaded it while we waited for the lock.
        if let Some(handle) = &state.handle {
            return Ok(Arc::clone(handle));
        }
        let started = Instant::now();
        let handle = self.loader.load(&state.source)?;
        info!(
            source = %state.source.describe(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "engine module loaded"
        );
        state.handle = Some(Arc::clone(&handle));
        Ok(handle)
    }

    /// Run one invocation and capture everything it prints.
    pub fn invoke(&self, invocation: &EngineInvocation) -> Result<EngineOutput, PlaygroundError> {
        let module = self.module()?;
        let started = Instant::now();
        let mut lines = Vec::new();
        let exit_code = module.run(&invocation.argv, &mut |line| lines.push(line))?;
        debug!(
            args = invocation.argv.len(),
            lines = lines.len(),
            exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "engine invocation finished"
        );
        Ok(EngineOutput { exit_code, lines })
    }

    pub fn run_inference(&self, request: &InferenceRequest) -> Result<InferenceResult, PlaygroundError> {
        self.run(&AlgorithmRequest::Inference(request.clone()))
    }

    pub fn run_subtyping(&self, request: &SubtypingRequest) -> Result<SubtypingResult, PlaygroundError> {
        self.run(&AlgorithmRequest::Subtyping(request.clone()))
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, ClientState>, PlaygroundError> {
        self.state
            .read()
            .map_err(|_| PlaygroundError::engine("engine client state is poisoned"))
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, ClientState>, PlaygroundError> {
        self.state
            .write()
            .map_err(|_| PlaygroundError::engine("engine client state is poisoned"))
    }
}

impl AlgorithmRunner for EngineClient {
    fn fetch_catalog(&self) -> Result<Vec<AlgorithmDescriptor>, PlaygroundError> {
        let output = self.invoke(&meta_invocation())?;
        normalize_catalog(parse_output(&output.text()))
    }

    fn run(&self, request: &AlgorithmRequest) -> Result<AlgorithmResult, PlaygroundError> {
        let output = self.invoke(&marshal(request))?;
        if output.exit_code != 0 && output.lines.is_empty() {
            return Err(PlaygroundError::runtime(format!(
                "engine exited with status {} without output",
                output.exit_code
            )));
        }
        Ok(normalize_result(parse_output(&output.text())))
    }
}
