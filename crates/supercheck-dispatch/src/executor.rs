//! Spawns the external test executor as a subprocess and enforces the
//! wall-clock timeout and output caps from `spec.md` §5. The teacher never
//! shells out to a subprocess; this module's shape (piped stdout/stderr,
//! a process group via `setpgid`, a `tokio::time::timeout` race, bounded
//! output capture) is grounded on the "other example" CLI executor, with
//! one deliberate deviation: on timeout this sends `SIGTERM` to the
//! process group and only escalates to `SIGKILL` after a grace period,
//! instead of killing immediately.

use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

/// Grace period between `SIGTERM` and `SIGKILL` for a timed-out or
/// cancelled execution (`spec.md` §5).
pub const KILL_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
	Exited(i32),
	TimedOut,
}

#[derive(Debug, Clone)]
pub struct ExecutionOutput {
	pub outcome: ExitOutcome,
	pub stdout: String,
	pub stderr: String,
}

/// Runs `program` with `args` inside `working_dir`, capturing stdout/stderr
/// up to `max_output_bytes` each (truncated with a marker beyond that), and
/// bounding the whole execution to `max_runtime`.
pub async fn run(
	program: &str,
	args: &[String],
	working_dir: &Path,
	max_runtime: Duration,
	max_output_bytes: usize,
) -> std::io::Result<ExecutionOutput> {
	let mut command = Command::new(program);
	command
		.args(args)
		.current_dir(working_dir)
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped());

	// Isolate the child (and anything it forks) into its own process group
	// so a kill signal reaches the whole tree, not just the direct child.
	unsafe {
		command.pre_exec(|| {
			libc::setpgid(0, 0);
			Ok(())
		});
	}

	let mut child = command.spawn()?;
	let stdout = child.stdout.take().expect("piped stdout");
	let stderr = child.stderr.take().expect("piped stderr");

	let stdout_task = tokio::spawn(read_bounded(stdout, max_output_bytes));
	let stderr_task = tokio::spawn(read_bounded(stderr, max_output_bytes));

	let wait_result = tokio::time::timeout(max_runtime, child.wait()).await;

	let outcome = match wait_result {
		Ok(Ok(status)) => ExitOutcome::Exited(status.code().unwrap_or(-1)),
		Ok(Err(e)) => return Err(e),
		Err(_) => {
			terminate(&mut child).await;
			ExitOutcome::TimedOut
		}
	};

	let stdout = stdout_task.await.unwrap_or_default();
	let stderr = stderr_task.await.unwrap_or_default();

	Ok(ExecutionOutput { outcome, stdout, stderr })
}

async fn read_bounded(mut reader: impl AsyncRead + Unpin, max_bytes: usize) -> String {
	let mut buf = Vec::with_capacity(max_bytes.min(64 * 1024));
	let mut chunk = [0u8; 8192];
	let mut truncated = false;

	loop {
		match reader.read(&mut chunk).await {
			Ok(0) => break,
			Ok(n) => {
				if buf.len() + n > max_bytes {
					buf.extend_from_slice(&chunk[..max_bytes.saturating_sub(buf.len())]);
					truncated = true;
					break;
				}
				buf.extend_from_slice(&chunk[..n]);
			}
			Err(_) => break,
		}
	}

	let mut text = String::from_utf8_lossy(&buf).into_owned();
	if truncated {
		text.push_str("\n...[output truncated]");
	}
	text
}

/// `SIGTERM` the process group, wait up to `KILL_GRACE`, then `SIGKILL` if
/// it hasn't exited.
async fn terminate(child: &mut Child) {
	let Some(pid) = child.id() else { return };

	unsafe {
		libc::killpg(pid as i32, libc::SIGTERM);
	}

	if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_ok() {
		return;
	}

	unsafe {
		libc::killpg(pid as i32, libc::SIGKILL);
	}
	let _ = child.wait().await;
}
