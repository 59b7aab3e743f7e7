//! Hosting the engine module as a WASI command run by an external runner.
//!
//! Loading reads (or downloads) the module and checks its header; the
//! resulting [`ProcessModule`] runs `<runner> run <module> <args...>` once per
//! invocation and streams stdout lines back to the caller.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::api::*;

const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];
const WASM_VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];
const DEFAULT_RUNNER: &str = "wasmtime";
const EXIT_POLL: Duration = Duration::from_millis(5);

/// Reject anything that is not a version-1 WebAssembly binary.
pub fn validate_module_header(bytes: &[u8]) -> Result<(), PlaygroundError> {
    if bytes.len() < 8 {
        return Err(PlaygroundError::engine(format!(
            "engine module is truncated ({} bytes)",
            bytes.len()
        )));
    }
    if bytes[..4] != WASM_MAGIC {
        return Err(PlaygroundError::engine(
            "engine module is not a WebAssembly binary",
        ));
    }
    if bytes[4..8] != WASM_VERSION {
        return Err(PlaygroundError::engine(
            "engine module uses an unsupported WebAssembly version",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ProcessLoader {
    runner: Option<PathBuf>,
    timeout: Duration,
    cache_dir: PathBuf,
}

impl ProcessLoader {
    pub fn new(runner: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            runner,
            timeout,
            cache_dir: std::env::temp_dir().join("infer-playground"),
        }
    }

    fn resolve_runner(&self) -> Result<PathBuf, PlaygroundError> {
        let wanted = self
            .runner
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RUNNER));
        if wanted.components().count() > 1 {
            return if wanted.is_file() {
                Ok(wanted)
            } else {
                Err(PlaygroundError::engine(format!(
                    "WASI runner '{}' does not exist",
                    wanted.display()
                )))
            };
        }
        which::which(&wanted).map_err(|err| {
            PlaygroundError::engine(format!(
                "WASI runner '{}' not found on PATH: {err}",
                wanted.display()
            ))
        })
    }

    fn fetch(&self, url: &str, auth: &AuthMethod) -> Result<PathBuf, PlaygroundError> {
        std::fs::create_dir_all(&self.cache_dir).map_err(|err| {
            PlaygroundError::engine(format!(
                "cannot create module cache '{}': {err}",
                self.cache_dir.display()
            ))
        })?;

        let mut hasher = DefaultHasher::new();
        url.hash(&mut hasher);
        auth.hash(&mut hasher);
        let dest = self.cache_dir.join(format!("{:016x}.wasm", hasher.finish()));

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|err| PlaygroundError::engine(format!("cannot build HTTP client: {err}")))?;
        let request = match auth {
            AuthMethod::None => client.get(url),
            AuthMethod::Bearer { token } => client.get(url).bearer_auth(token),
            AuthMethod::Basic { username, password } => {
                client.get(url).basic_auth(username, Some(password))
            }
        };

        info!(url, "downloading engine module");
        let bytes = request
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(|response| response.bytes())
            .map_err(|err| {
                PlaygroundError::engine(format!(
                    "failed to download engine module from {url}: {err}"
                ))
            })?;
        std::fs::write(&dest, &bytes).map_err(|err| {
            PlaygroundError::engine(format!(
                "cannot write engine module to '{}': {err}",
                dest.display()
            ))
        })?;
        debug!(bytes = bytes.len(), dest = %dest.display(), "engine module cached");
        Ok(dest)
    }
}

impl ModuleLoader for ProcessLoader {
    fn load(&self, source: &WasmSource) -> Result<Arc<dyn CommandModule>, PlaygroundError> {
        let module = match source {
            WasmSource::Local { path } => path.clone(),
            WasmSource::Remote { url, auth } => self.fetch(url, auth)?,
        };
        let bytes = std::fs::read(&module).map_err(|err| {
            PlaygroundError::engine(format!(
                "cannot read engine module '{}': {err}",
                module.display()
            ))
        })?;
        validate_module_header(&bytes)?;
        let runner = self.resolve_runner()?;
        info!(
            module = %module.display(),
            runner = %runner.display(),
            bytes = bytes.len(),
            "engine module ready"
        );
        Ok(Arc::new(ProcessModule {
            runner,
            module,
            timeout: self.timeout,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct ProcessModule {
    runner: PathBuf,
    module: PathBuf,
    timeout: Duration,
}

impl ProcessModule {
    fn timed_out(&self, child: &mut Child) -> PlaygroundError {
        warn!(timeout_ms = self.timeout.as_millis() as u64, "engine timed out");
        let _ = child.kill();
        let _ = child.wait();
        PlaygroundError::timeout(format!(
            "engine did not finish within {} ms",
            self.timeout.as_millis()
        ))
    }
}

impl CommandModule for ProcessModule {
    fn run(&self, argv: &[String], sink: &mut dyn FnMut(String)) -> Result<i32, PlaygroundError> {
        // argv[0] is the program name inside the module; the runner supplies it.
        let args = argv.get(1..).unwrap_or_default();
        let mut child = Command::new(&self.runner)
            .arg("run")
            .arg(&self.module)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                PlaygroundError::engine(format!(
                    "failed to start '{}': {err}",
                    self.runner.display()
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PlaygroundError::engine("engine stdout was not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| PlaygroundError::engine("engine stderr was not captured"))?;

        let (tx, rx) = mpsc::channel::<String>();
        let reader = thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        let errors = thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf);
            buf
        });

        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(line) => sink(line),
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => return Err(self.timed_out(&mut child)),
            }
        }

        let _ = reader.join();
        // stdout can close before the process exits.
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() < deadline => thread::sleep(EXIT_POLL),
                Ok(None) => return Err(self.timed_out(&mut child)),
                Err(err) => {
                    return Err(PlaygroundError::engine(format!("engine process failed: {err}")));
                }
            }
        };
        let stderr_text = errors.join().unwrap_or_default();
        if !stderr_text.trim().is_empty() {
            debug!(stderr = %stderr_text.trim(), "engine stderr");
        }
        Ok(status.code().unwrap_or(-1))
    }
}
