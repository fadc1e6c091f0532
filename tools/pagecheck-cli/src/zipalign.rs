//! `zipalign -c` as an external check.
//!
//! Runs `zipalign -c -v <page_size> <apk>` against the file on disk. A missing
//! binary, a spawn failure or a timeout make the check unavailable rather than
//! failed, so the report never treats "not checked" as "passed" or "failed".

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use pagecheck::{ExternalCheck, ExternalOutcome, PageSize};

/// Binary looked up on `PATH` when no explicit path is configured.
pub const DEFAULT_ZIPALIGN: &str = "zipalign";

/// Default time limit for one zipalign run.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

const TOOL: &str = "zipalign";
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipalignConfig {
    pub program: PathBuf,
    pub timeout: Duration,
}

impl Default for ZipalignConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_ZIPALIGN),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// zipalign bound to one APK on disk.
#[derive(Debug, Clone)]
pub struct ZipalignCheck {
    config: ZipalignConfig,
    apk: PathBuf,
    page_size: PageSize,
}

impl ZipalignCheck {
    pub fn new(config: ZipalignConfig, apk: &Path, page_size: PageSize) -> Self {
        Self {
            config,
            apk: apk.to_path_buf(),
            page_size,
        }
    }

    /// Build the command line.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.arg("-c")
            .arg("-v")
            .arg(self.page_size.get().to_string())
            .arg(&self.apk)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn invoke(&self) -> ExternalOutcome {
        let mut child = match self.command().spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ExternalOutcome::unavailable(TOOL, "zipalign not found");
            }
            Err(e) => {
                return ExternalOutcome::unavailable(TOOL, format!("failed to run zipalign: {e}"));
            }
        };

        // Drain pipes concurrently so a chatty child cannot block on a full pipe.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        match wait_with_deadline(&mut child, self.config.timeout) {
            Ok(Some(status)) => {
                let stdout = stdout.map(collect).unwrap_or_default();
                let stderr = stderr.map(collect).unwrap_or_default();
                ExternalOutcome::completed(TOOL, status.code(), stdout, stderr)
            }
            // Grandchildren may still hold the pipes open; the drain threads
            // are left detached.
            Ok(None) => ExternalOutcome::unavailable(
                TOOL,
                format!("zipalign timed out after {}s", self.config.timeout.as_secs_f64()),
            ),
            Err(e) => ExternalOutcome::unavailable(TOOL, format!("failed to wait for zipalign: {e}")),
        }
    }
}

impl ExternalCheck for ZipalignCheck {
    fn name(&self) -> &str {
        TOOL
    }

    /// Checks the APK file this check was built for; the in-memory bytes are
    /// not used because zipalign only reads from disk.
    fn run(&self, _archive: &[u8]) -> ExternalOutcome {
        log::debug!(
            "[PageCheck zipalign] {} -c -v {} {}",
            self.config.program.display(),
            self.page_size.get(),
            self.apk.display()
        );
        let outcome = self.invoke();
        if let Some(error) = &outcome.error {
            log::warn!("[PageCheck zipalign] {error}");
        }
        outcome
    }
}

/// Wait for `child` until `timeout` elapses. Returns `Ok(None)` after killing
/// a child that overran.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            // Best-effort; the child may have exited in between.
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(handle: thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}
