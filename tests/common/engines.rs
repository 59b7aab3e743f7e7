#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use infer_playground::api::*;
use infer_playground::runtime::EngineClient;

use super::payloads;

type Responder = dyn Fn(&[String]) -> (i32, Vec<String>) + Send + Sync;

/// In-memory engine module answering from a closure.
pub struct ScriptedModule {
    responder: Box<Responder>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedModule {
    pub fn new(responder: impl Fn(&[String]) -> (i32, Vec<String>) + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always prints `lines` and exits 0.
    pub fn printing(lines: Vec<String>) -> Self {
        Self::new(move |_| (0, lines.clone()))
    }

    /// A small stand-in for the real engine: knows `--meta`, the identity
    /// function under W, and `<: Top` under DK.
    pub fn fake_engine() -> Self {
        Self::new(|argv| {
            let args: Vec<&str> = argv.iter().map(String::as_str).collect();
            match args.as_slice() {
                ["infer", "--meta"] => (0, payloads::as_lines(&payloads::meta())),
                ["infer", "--typing", "W", "\\x. x"] => {
                    (0, payloads::as_lines(&payloads::identity_success()))
                }
                ["infer", "--typing", _, "1 true"] => {
                    (1, payloads::as_lines(&payloads::unification_failure()))
                }
                ["infer", "--subtyping", "DK", .., left, "Top"] => {
                    (0, payloads::as_lines(&payloads::subtyping_success(left, "Top")))
                }
                _ => (
                    1,
                    vec![r#"{"success": false, "error": "unsupported by fake engine"}"#.to_string()],
                ),
            }
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandModule for ScriptedModule {
    fn run(&self, argv: &[String], sink: &mut dyn FnMut(String)) -> Result<i32, PlaygroundError> {
        self.calls.lock().unwrap().push(argv.to_vec());
        let (code, lines) = (self.responder)(argv);
        for line in lines {
            sink(line);
            std::thread::yield_now();
        }
        Ok(code)
    }
}

/// Loader handing out one shared [`ScriptedModule`]; clones share counters.
#[derive(Clone)]
pub struct ScriptedLoader {
    module: Arc<ScriptedModule>,
    loads: Arc<AtomicUsize>,
    sources: Arc<Mutex<Vec<WasmSource>>>,
    fail: bool,
}

impl ScriptedLoader {
    pub fn new(module: ScriptedModule) -> Self {
        Self {
            module: Arc::new(module),
            loads: Arc::new(AtomicUsize::new(0)),
            sources: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// Every load fails the way a missing module or runner would.
    pub fn unavailable() -> Self {
        Self {
            fail: true,
            ..Self::new(ScriptedModule::printing(Vec::new()))
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn loaded_sources(&self) -> Vec<WasmSource> {
        self.sources.lock().unwrap().clone()
    }

    pub fn module(&self) -> &ScriptedModule {
        &self.module
    }

    pub fn client(&self, source: WasmSource) -> EngineClient {
        EngineClient::new(source, Box::new(self.clone()))
    }
}

impl ModuleLoader for ScriptedLoader {
    fn load(&self, source: &WasmSource) -> Result<Arc<dyn CommandModule>, PlaygroundError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.sources.lock().unwrap().push(source.clone());
        if self.fail {
            return Err(PlaygroundError::engine(format!(
                "cannot read engine module '{}'",
                source.describe()
            )));
        }
        let module: Arc<dyn CommandModule> = self.module.clone();
        Ok(module)
    }
}

pub fn local(path: &str) -> WasmSource {
    WasmSource::Local { path: path.into() }
}

/// Runner returning one fixed outcome for every request.
pub struct CannedRunner {
    pub catalog: Vec<AlgorithmDescriptor>,
    pub outcome: Result<AlgorithmResult, PlaygroundError>,
    pub runs: Arc<AtomicUsize>,
}

impl CannedRunner {
    pub fn new(outcome: Result<AlgorithmResult, PlaygroundError>) -> Self {
        Self {
            catalog: Vec::new(),
            outcome,
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared run counter that stays readable after the runner is boxed.
    pub fn run_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.runs)
    }
}

impl AlgorithmRunner for CannedRunner {
    fn fetch_catalog(&self) -> Result<Vec<AlgorithmDescriptor>, PlaygroundError> {
        Ok(self.catalog.clone())
    }

    fn run(&self, _request: &AlgorithmRequest) -> Result<AlgorithmResult, PlaygroundError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}
