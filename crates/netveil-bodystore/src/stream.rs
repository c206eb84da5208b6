//! Pipe-backed body streaming.
//!
//! Each stream owns a bounded chunk channel. A writer thread pushes the
//! body into the write end in `CHUNK_SIZE` pieces while the consumer reads
//! the other end through [`std::io::Read`], so neither side holds a second
//! full copy of the payload.
//!
//! Both ends close deterministically: the writer drops its sender when it
//! finishes or fails, and dropping the stream closes the read end and joins
//! the writer.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

/// Largest chunk sent through the pipe
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks the pipe buffers before the writer blocks
const PIPE_DEPTH: usize = 4;

/// Write end of the pipe. Owned exclusively by the writer thread.
struct PipeWriter {
    tx: Sender<Vec<u8>>,
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(CHUNK_SIZE);
        self.tx
            .send(buf[..n].to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "body stream reader closed"))?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Read end of a body pipe
pub struct BodyStream {
    rx: Option<Receiver<Vec<u8>>>,
    chunk: Vec<u8>,
    pos: usize,
    writer: Option<JoinHandle<()>>,
}

impl BodyStream {
    /// Start a writer thread for `content` and return the read end.
    pub(crate) fn spawn(content: Arc<str>, label: String) -> io::Result<Self> {
        let (tx, rx) = bounded(PIPE_DEPTH);

        let writer = thread::Builder::new()
            .name("body-pipe-writer".to_string())
            .spawn(move || {
                let mut pipe = PipeWriter { tx };
                match pipe.write_all(content.as_bytes()) {
                    Ok(()) => trace!("Streamed {} bytes for {}", content.len(), label),
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                        debug!("Reader closed {} before the body was consumed", label)
                    }
                    Err(e) => warn!("Error writing {} to pipe: {}", label, e),
                }
            })?;

        Ok(Self {
            rx: Some(rx),
            chunk: Vec::new(),
            pos: 0,
            writer: Some(writer),
        })
    }
}

impl Read for BodyStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.pos >= self.chunk.len() {
            let Some(rx) = self.rx.as_ref() else {
                return Ok(0);
            };
            match rx.recv() {
                Ok(chunk) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Err(_) => {
                    // Writer finished and closed its end
                    self.rx = None;
                    return Ok(0);
                }
            }
        }

        let available = &self.chunk[self.pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl Drop for BodyStream {
    fn drop(&mut self) {
        // Close the read end first so a blocked writer wakes up
        self.rx.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                warn!("Body pipe writer panicked");
            }
        }
    }
}

impl std::fmt::Debug for BodyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyStream")
            .field("open", &self.rx.is_some())
            .field("buffered", &(self.chunk.len() - self.pos.min(self.chunk.len())))
            .finish()
    }
}
