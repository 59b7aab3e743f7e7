use std::sync::Arc;

use super::*;

/// A loaded engine module driven like a command-line program.
///
/// `run` streams every line the module prints to `sink`, in emission order,
/// and returns the exit code once the single-shot execution has finished.
pub trait CommandModule: Send + Sync {
    fn run(&self, argv: &[String], sink: &mut dyn FnMut(String)) -> Result<i32, PlaygroundError>;
}

/// Load and compile an engine module from its configured source.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, source: &WasmSource) -> Result<Arc<dyn CommandModule>, PlaygroundError>;
}

/// Anything that can answer catalog and algorithm requests.
///
/// An `Err` means the request could not be answered at all (engine missing,
/// timeout). Semantic failures come back as `Ok` with `success == false`.
pub trait AlgorithmRunner {
    fn fetch_catalog(&self) -> Result<Vec<AlgorithmDescriptor>, PlaygroundError>;
    fn run(&self, request: &AlgorithmRequest) -> Result<AlgorithmResult, PlaygroundError>;
}
