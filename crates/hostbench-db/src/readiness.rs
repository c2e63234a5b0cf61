//! Startup readiness protocol.
//!
//! The server is only observed through its error log: first we spin until the
//! log exists, then we repeatedly wait for it to grow and scan the whole file
//! for the ready marker. Both phases are bounded by time; exhausting a budget is a
//! fatal startup error carrying the log tail.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use hostbench_config::HarnessConfig;
use tracing::debug;

use crate::DB_TARGET;
use crate::error::DatabaseError;
use crate::files::{read_log_lossy, tail};
use crate::runner::ServerHandle;

/// Substring the server logs once it accepts connections.
pub const READY_MARKER: &str = "ready for connections";

/// Granularity of the growth wait inside one readiness poll.
const GROWTH_SLICE: Duration = Duration::from_millis(10);

/// Budgets applied while waiting for the server.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReadinessBudget {
    pub(crate) log_wait_iterations: u64,
    pub(crate) log_wait_interval: Duration,
    pub(crate) poll_interval: Duration,
    pub(crate) iterations: u32,
    pub(crate) tail_lines: usize,
}

impl From<&HarnessConfig> for ReadinessBudget {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            log_wait_iterations: config.log_wait_iterations,
            log_wait_interval: config.log_wait_interval(),
            poll_interval: config.ready_poll_interval(),
            iterations: config.ready_iterations,
            tail_lines: config.log_tail_lines,
        }
    }
}

/// Spins until the server log exists.
pub(crate) fn wait_for_log_file(path: &Path, budget: ReadinessBudget) -> Result<(), DatabaseError> {
    let started = Instant::now();
    for _ in 0..budget.log_wait_iterations {
        if path.exists() {
            return Ok(());
        }
        thread::sleep(budget.log_wait_interval);
    }
    if path.exists() {
        return Ok(());
    }
    Err(DatabaseError::LogFileMissing {
        path: path.to_path_buf(),
        waited_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    })
}

/// Waits for the ready marker, returning the log contents that carried it.
///
/// The wait is bounded by time, not by log writes: the server gets
/// `iterations × poll_interval` in total, however many lines it logs before
/// the marker.
pub(crate) fn wait_for_ready(
    path: &Path,
    server: &mut dyn ServerHandle,
    budget: ReadinessBudget,
) -> Result<String, DatabaseError> {
    let mut file = File::open(path).map_err(|source| DatabaseError::read_file(path, source))?;
    let started = Instant::now();
    let deadline = started + budget.poll_interval.saturating_mul(budget.iterations);
    let mut polls: u32 = 0;
    loop {
        polls = polls.saturating_add(1);
        let remaining = deadline.saturating_duration_since(Instant::now());
        wait_for_growth(&mut file, path, budget.poll_interval.min(remaining))?;
        let contents = read_log_lossy(path);
        if contents.contains(READY_MARKER) {
            debug!(
                target: DB_TARGET,
                polls,
                waited_ms = started.elapsed().as_millis(),
                log = %path.display(),
                "server reported readiness"
            );
            return Ok(contents);
        }
        if let Some(status) = server.try_wait()? {
            return Err(DatabaseError::ServerExited {
                status: status.to_string(),
                log_tail: tail(&contents, budget.tail_lines),
            });
        }
        if Instant::now() >= deadline {
            break;
        }
    }
    Err(DatabaseError::ReadinessTimeout {
        attempts: budget.iterations,
        waited_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        log_tail: tail(&read_log_lossy(path), budget.tail_lines),
    })
}

/// Blocks until new bytes are appended to `file` or `limit` elapses, draining
/// whatever arrived.
fn wait_for_growth(file: &mut File, path: &Path, limit: Duration) -> Result<(), DatabaseError> {
    let deadline = Instant::now() + limit;
    let mut drained = Vec::new();
    loop {
        let read = file
            .read_to_end(&mut drained)
            .map_err(|source| DatabaseError::read_file(path, source))?;
        if read > 0 {
            return Ok(());
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        thread::sleep(GROWTH_SLICE.min(deadline - now));
    }
}
