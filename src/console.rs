use chrono::{SecondsFormat, Utc};
use console::style;
use std::io::{LineWriter, Write};
use tokio::{sync::mpsc, task::JoinHandle};

/// Routing for the dedicated writer task.
enum Line {
    Out(String),
    Err(String),
}

/// Concurrency-safe console sink.
///
/// Both stream-reader tasks and the pipeline driver write progress lines, so
/// all output funnels through an unbounded channel into a single blocking
/// writer task holding locked, line-buffered stdout/stderr handles. Lines are
/// never interleaved mid-line and the terminal is only touched from one
/// thread.
#[derive(Clone)]
pub struct Console {
    tx: mpsc::UnboundedSender<Line>,
}

impl Console {
    /// Start the writer task and return the sink plus its join handle.
    ///
    /// The task exits once every `Console` clone has been dropped; await the
    /// handle to make sure buffered output reached the terminal.
    #[must_use]
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Line>();
        let handle = tokio::task::spawn_blocking(move || {
            let stdout = std::io::stdout();
            let stderr = std::io::stderr();
            let mut out = LineWriter::new(stdout.lock());
            let mut err = LineWriter::new(stderr.lock());

            while let Some(line) = rx.blocking_recv() {
                match line {
                    Line::Out(msg) => {
                        let _ = writeln!(out, "{msg}");
                    }
                    Line::Err(msg) => {
                        let _ = writeln!(err, "{msg}");
                    }
                }
            }

            let _ = out.flush();
            let _ = err.flush();
        });
        (Self { tx }, handle)
    }

    /// Timestamped step banner, bright magenta.
    pub fn step(&self, msg: &str) {
        let _ = self.tx.send(Line::Out(format!(
            "{} - {}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            style(msg).magenta().bright()
        )));
    }

    /// Indented detail line for per-probe commands, magenta.
    pub fn detail(&self, msg: &str) {
        let _ = self
            .tx
            .send(Line::Out(format!("\t {}", style(msg).magenta())));
    }

    /// One line of child stdout, yellow.
    pub fn child_out(&self, line: &str) {
        let _ = self
            .tx
            .send(Line::Out(format!("\t > {}", style(line).yellow())));
    }

    /// One line of child stderr, red, routed to our stderr.
    pub fn child_err(&self, line: &str) {
        let _ = self
            .tx
            .send(Line::Err(format!("\t > {}", style(line).red())));
    }

    /// Non-fatal problem worth surfacing, routed to stderr.
    pub fn warn(&self, msg: &str) {
        let _ = self
            .tx
            .send(Line::Err(style(msg).yellow().to_string()));
    }
}
