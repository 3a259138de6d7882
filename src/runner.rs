use crate::console::Console;
use futures::future;
use std::{
    io,
    path::PathBuf,
    process::{ExitStatus, Stdio},
};
use thiserror::Error;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    process::Command,
};

/// One external command to run, built fresh per pipeline step.
///
/// Arguments are already fully formed; no shell is involved, so each element
/// crosses into the child as an opaque string.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    /// When set, child stdout is persisted to `<logsDir>/<name>.txt`.
    pub log_name: Option<String>,
}

/// Why an invocation failed. Spawn-time failures (`Spawn`, `Stream`) are
/// distinguishable from the process running and reporting failure (`Exit`).
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to capture {stream} of {program}")]
    Stream {
        program: String,
        stream: &'static str,
    },
    #[error("failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with {status}")]
    Exit { program: String, status: ExitStatus },
}

impl RunnerError {
    /// True when the child never ran (missing binary, permissions, pipes).
    #[must_use]
    pub const fn is_spawn_failure(&self) -> bool {
        matches!(self, Self::Spawn { .. } | Self::Stream { .. })
    }

    /// Exit code of the child, when it ran and reported one.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit { status, .. } => status.code(),
            _ => None,
        }
    }
}

/// Runs external commands one at a time, draining stdout and stderr
/// concurrently and optionally teeing stdout to a per-step log file.
pub struct Runner {
    logs_dir: PathBuf,
    echo_stdout: bool,
    console: Console,
}

impl Runner {
    #[must_use]
    pub fn new(logs_dir: &str, echo_stdout: bool, console: Console) -> Self {
        Self {
            logs_dir: PathBuf::from(logs_dir),
            echo_stdout,
            console,
        }
    }

    /// Run one invocation to completion.
    ///
    /// Spawns the child with piped stdout/stderr, starts one line-reader task
    /// per stream and blocks until the process exits. Both readers are joined
    /// before returning, so trailing output is never lost and the log file is
    /// closed by the time the caller sees the result.
    ///
    /// Stdout echo honors the runner's echo flag; stderr is always echoed.
    /// A log file that cannot be created downgrades to a console warning and
    /// the run continues without durable logging.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Spawn`] or [`RunnerError::Stream`] when the
    /// child never ran, [`RunnerError::Exit`] when it exited non-zero.
    pub async fn run(&self, invocation: &Invocation) -> Result<(), RunnerError> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // release the child on every early-return path
            .kill_on_drop(true);
        if let Some(dir) = &invocation.current_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| RunnerError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        let stdout = child.stdout.take().ok_or_else(|| RunnerError::Stream {
            program: invocation.program.clone(),
            stream: "stdout",
        })?;
        let stderr = child.stderr.take().ok_or_else(|| RunnerError::Stream {
            program: invocation.program.clone(),
            stream: "stderr",
        })?;

        let log_file = match &invocation.log_name {
            Some(name) => self.open_log(name).await,
            None => None,
        };

        let echo = self.echo_stdout;
        let out_console = self.console.clone();
        let out_task = tokio::spawn(async move {
            let mut log = log_file;
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            // read raw bytes and decode lossily: undecodable output must
            // never stop the drain, and the pipe must reach end-of-input
            let drained = loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => break Ok(()),
                    Ok(_) => {}
                    Err(err) => break Err(err),
                }
                let line = decode_line(&buf);
                if let Some(file) = log.as_mut() {
                    if let Err(err) = write_line(file, &line).await {
                        out_console.warn(&format!("error writing to log file: {err}"));
                        log = None;
                    }
                }
                if echo {
                    out_console.child_out(&line);
                }
            };
            // flush regardless of how the loop ended; buffered bytes must
            // not die with the file handle
            let flushed = match log {
                Some(mut file) => file.flush().await,
                None => Ok(()),
            };
            drained.and(flushed)
        });

        let err_console = self.console.clone();
        let err_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => return Ok::<(), io::Error>(()),
                    Ok(_) => err_console.child_err(&decode_line(&buf)),
                    Err(err) => return Err(err),
                }
            }
        });

        let wait_res = child.wait().await;

        // both readers must fully drain before we report the outcome
        let (out_res, err_res) = future::join(out_task, err_task).await;
        for res in [out_res, err_res] {
            match res {
                Ok(Ok(())) => {}
                Ok(Err(err)) => self.console.warn(&format!(
                    "error draining output of {}: {err}",
                    invocation.program
                )),
                Err(err) => self
                    .console
                    .warn(&format!("output reader for {} failed: {err}", invocation.program)),
            }
        }

        let status = wait_res.map_err(|source| RunnerError::Wait {
            program: invocation.program.clone(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(RunnerError::Exit {
                program: invocation.program.clone(),
                status,
            })
        }
    }

    /// Best-effort log file creation; failure is reported but never fatal.
    async fn open_log(&self, name: &str) -> Option<File> {
        let path = self.logs_dir.join(format!("{name}.txt"));
        match File::create(&path).await {
            Ok(file) => Some(file),
            Err(err) => {
                self.console
                    .warn(&format!("cannot create log file {}: {err}", path.display()));
                None
            }
        }
    }
}

/// One raw line without its terminator, decoded lossily.
fn decode_line(buf: &[u8]) -> String {
    let stripped = buf.strip_suffix(b"\n").unwrap_or(buf);
    let stripped = stripped.strip_suffix(b"\r").unwrap_or(stripped);
    String::from_utf8_lossy(stripped).into_owned()
}

async fn write_line(file: &mut File, line: &str) -> io::Result<()> {
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await
}
