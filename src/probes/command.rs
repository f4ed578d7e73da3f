//! Child-process plumbing shared by the command-backed probes

use crate::{
    error::{AppError, Result},
    probes::ProbeSink,
};
use std::borrow::Cow;
use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;

/// Outcome of a streamed command
#[derive(Debug)]
pub(crate) struct CommandOutcome {
    pub status: ExitStatus,
    pub stderr: String,
    /// The session was cancelled while the command ran; its output went nowhere
    pub abandoned: bool,
}

impl CommandOutcome {
    pub fn succeeded(&self) -> bool {
        self.status.success()
    }
}

/// Run `command`, handing each stdout line to `on_line` as it arrives.
///
/// Output is decoded lossily, so localized tools printing in a legacy code
/// page still stream. A cancelled session stops forwarding lines but the child
/// runs to completion; only `on_line` returning false kills it. The child is
/// always reaped before this returns.
pub(crate) fn stream_lines<F>(mut command: Command, sink: &ProbeSink, mut on_line: F) -> Result<CommandOutcome>
where
    F: FnMut(&str) -> bool,
{
    let program = command.get_program().to_string_lossy().into_owned();
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .map_err(|e| AppError::probe(format!("Failed to run {}: {}", program, e)))?;

    let stdout = match child.stdout.take() {
        Some(stdout) => stdout,
        None => {
            reap(&mut child);
            return Err(AppError::probe(format!("{} produced no stdout handle", program)));
        }
    };

    // stderr is drained concurrently so a chatty child never blocks on a full pipe
    let stderr_reader = child.stderr.take().map(|mut err| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = err.read_to_end(&mut buf);
            buf
        })
    });

    let forwarded = forward_lines(BufReader::new(stdout), sink, &mut on_line);
    if !matches!(forwarded, Ok(true)) {
        let _ = child.kill();
    }
    let status = child.wait();

    let stderr = stderr_reader
        .and_then(|reader| reader.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).trim().to_string())
        .unwrap_or_default();

    forwarded?;
    Ok(CommandOutcome {
        status: status?,
        stderr,
        abandoned: sink.is_cancelled(),
    })
}

/// Collect every stdout line of a short command
pub(crate) fn capture(command: Command, sink: &ProbeSink) -> Result<(CommandOutcome, Vec<String>)> {
    let mut lines = Vec::new();
    let outcome = stream_lines(command, sink, |line| {
        lines.push(line.to_string());
        true
    })?;
    Ok((outcome, lines))
}

/// Read `reader` to EOF; `Ok(false)` when `on_line` asked to stop early
fn forward_lines<R, F>(mut reader: R, sink: &ProbeSink, on_line: &mut F) -> io::Result<bool>
where
    R: BufRead,
    F: FnMut(&str) -> bool,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(true);
        }
        if sink.is_cancelled() {
            continue;
        }
        let line = decode_line(&buf);
        if !on_line(&*line) {
            return Ok(false);
        }
    }
}

fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw)
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
