//! Ordered output streamer.
//!
//! Processes are started eagerly while the tree is walked, but their output
//! is only written during [`Printer::flush`], one entry at a time in push
//! order, so sibling commands never interleave on screen.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::Child;
use std::sync::mpsc::{self, Sender};
use std::thread;

use tracing::debug;

use crate::interpreter::RuntimeError;

#[derive(Debug)]
enum Entry {
    Text(String),
    Process { command: String, child: Child },
}

/// Append-only queue of pending output, consumed once by `flush`.
#[derive(Debug, Default)]
pub struct Printer {
    entries: Vec<Entry>,
}

impl Printer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.entries.push(Entry::Text(text.into()));
    }

    /// Queue a running process. Its stdout and stderr should be piped.
    pub fn push_process(&mut self, command: impl Into<String>, child: Child) {
        self.entries.push(Entry::Process {
            command: command.into(),
            child,
        });
    }

    /// Write every queued entry to `out` in push order, waiting for each
    /// process to exit before moving on.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::CommandFailed` for the first process that
    /// exits unsuccessfully and `RuntimeError::Output` when a pipe or `out`
    /// fails. Entries after the failing one are dropped unflushed.
    pub fn flush<W: Write>(&mut self, out: &mut W) -> Result<(), RuntimeError> {
        for entry in std::mem::take(&mut self.entries) {
            match entry {
                Entry::Text(text) => {
                    out.write_all(text.as_bytes())
                        .map_err(RuntimeError::Output)?;
                }
                Entry::Process { command, child } => drain(out, &command, child)?,
            }
        }
        out.flush().map_err(RuntimeError::Output)
    }
}

type Chunk = io::Result<Vec<u8>>;

/// Stream both pipes of `child` to `out` line by line, then reap it.
fn drain<W: Write>(out: &mut W, command: &str, mut child: Child) -> Result<(), RuntimeError> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    thread::scope(|scope| {
        let (tx, rx) = mpsc::channel::<Chunk>();
        if let Some(pipe) = stdout {
            let tx = tx.clone();
            scope.spawn(move || forward(pipe, &tx));
        }
        if let Some(pipe) = stderr {
            let tx = tx.clone();
            scope.spawn(move || forward(pipe, &tx));
        }
        drop(tx);

        for chunk in rx {
            let mut line = chunk.map_err(RuntimeError::Output)?;
            if line.last() != Some(&b'\n') {
                line.push(b'\n');
            }
            out.write_all(&line).map_err(RuntimeError::Output)?;
        }
        Ok::<(), RuntimeError>(())
    })?;

    let status = child.wait().map_err(RuntimeError::Output)?;
    debug!(command, %status, "process finished");
    if status.success() {
        Ok(())
    } else {
        Err(RuntimeError::CommandFailed {
            command: command.to_string(),
            status,
        })
    }
}

fn forward<R: Read>(pipe: R, tx: &Sender<Chunk>) {
    let mut reader = BufReader::new(pipe);
    loop {
        let mut line = Vec::new();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(Ok(line)).is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e));
                break;
            }
        }
    }
}
