// Output capture - per-test stdout/stderr buffering

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Console stream an output chunk was written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    #[default]
    Stdout,
    Stderr,
}

impl Stream {
    pub fn from_is_stdout(is_stdout: bool) -> Self {
        if is_stdout {
            Stream::Stdout
        } else {
            Stream::Stderr
        }
    }

    pub fn is_stdout(self) -> bool {
        matches!(self, Stream::Stdout)
    }
}

/// Immutable view of the bytes produced by a single write.
///
/// The backing buffer is shared, so cloning a chunk never copies output.
#[derive(Debug, Clone)]
pub struct OutputChunk {
    bytes: Arc<[u8]>,
    offset: usize,
    length: usize,
    stream: Stream,
}

impl OutputChunk {
    /// Wrap `length` bytes of `bytes` starting at `offset`.
    pub fn new(bytes: Arc<[u8]>, offset: usize, length: usize, stream: Stream) -> Result<Self> {
        let in_range = offset
            .checked_add(length)
            .is_some_and(|end| end <= bytes.len());
        if !in_range {
            return Err(Error::InvalidOutputRange {
                offset,
                length,
                available: bytes.len(),
            });
        }

        Ok(Self {
            bytes,
            offset,
            length,
            stream,
        })
    }

    /// Copy a window of a caller-owned buffer into a new chunk.
    pub fn copy_from(buf: &[u8], offset: usize, length: usize, stream: Stream) -> Result<Self> {
        let window = offset
            .checked_add(length)
            .and_then(|end| buf.get(offset..end))
            .ok_or(Error::InvalidOutputRange {
                offset,
                length,
                available: buf.len(),
            })?;
        let length = window.len();
        Ok(Self {
            bytes: Arc::from(window),
            offset: 0,
            length,
            stream,
        })
    }

    pub fn from_text(text: &str, stream: Stream) -> Self {
        Self {
            bytes: Arc::from(text.as_bytes()),
            offset: 0,
            length: text.len(),
            stream,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[self.offset..self.offset + self.length]
    }

    pub fn stream(&self) -> Stream {
        self.stream
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Flattened text drained from an [`OutputCapture`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }
}

#[derive(Debug, Default)]
struct Buffers {
    stdout: Vec<OutputChunk>,
    stderr: Vec<OutputChunk>,
}

/// Concurrency-safe buffer of output chunks written since the last clear.
///
/// Writers only append under a short-held lock. Draining swaps both sequences
/// out in one critical section, so a chunk is either part of the drained
/// snapshot or left for the next one, never both.
#[derive(Debug, Default)]
pub struct OutputCapture {
    buffers: Mutex<Buffers>,
}

impl OutputCapture {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Buffers> {
        // Appends cannot leave the vectors half-updated, so a poisoned lock is still usable.
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a chunk to the sequence of its stream.
    pub fn write(&self, chunk: OutputChunk) {
        let mut buffers = self.lock();
        match chunk.stream() {
            Stream::Stdout => buffers.stdout.push(chunk),
            Stream::Stderr => buffers.stderr.push(chunk),
        }
    }

    /// Atomically take everything captured so far and concatenate it per stream.
    pub fn flatten_and_clear(&self) -> CapturedOutput {
        let Buffers { stdout, stderr } = std::mem::take(&mut *self.lock());
        CapturedOutput {
            stdout: flatten(&stdout),
            stderr: flatten(&stderr),
        }
    }

    /// Drop everything captured so far.
    pub fn clear(&self) {
        let mut buffers = self.lock();
        buffers.stdout.clear();
        buffers.stderr.clear();
    }

    pub fn is_empty(&self) -> bool {
        let buffers = self.lock();
        buffers.stdout.is_empty() && buffers.stderr.is_empty()
    }

    /// Number of chunks currently held for `stream`.
    pub fn chunk_count(&self, stream: Stream) -> usize {
        let buffers = self.lock();
        match stream {
            Stream::Stdout => buffers.stdout.len(),
            Stream::Stderr => buffers.stderr.len(),
        }
    }
}

// Bytes are joined before decoding so multi-byte characters split across writes survive.
fn flatten(chunks: &[OutputChunk]) -> String {
    let total = chunks.iter().map(OutputChunk::len).sum();
    let mut bytes = Vec::with_capacity(total);
    for chunk in chunks {
        bytes.extend_from_slice(chunk.as_bytes());
    }
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_flatten_separates_streams() {
        let capture = OutputCapture::new();
        for text in ["a", "b", "c"] {
            capture.write(OutputChunk::from_text(text, Stream::Stdout));
        }
        capture.write(OutputChunk::from_text("x", Stream::Stderr));

        let output = capture.flatten_and_clear();

        assert_eq!(output.stdout, "abc");
        assert_eq!(output.stderr, "x");
        assert!(capture.is_empty());
        assert!(capture.flatten_and_clear().is_empty());
    }

    #[test]
    fn test_chunk_is_a_window() {
        let chunk = OutputChunk::new(Arc::from(&b"hello world"[..]), 6, 5, Stream::Stdout)
            .expect("range is valid");
        assert_eq!(chunk.as_bytes(), b"world");
        assert_eq!(chunk.len(), 5);
    }

    #[test]
    fn test_chunk_rejects_out_of_range() {
        let err = OutputChunk::copy_from(b"abc", 2, 5, Stream::Stderr).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidOutputRange {
                offset: 2,
                length: 5,
                available: 3
            }
        ));
        assert!(OutputChunk::new(Arc::from(&b"abc"[..]), usize::MAX, 2, Stream::Stdout).is_err());
    }

    #[test]
    fn test_split_utf8_sequence_is_rejoined() {
        let capture = OutputCapture::new();
        let bytes = "é".as_bytes();
        capture.write(OutputChunk::copy_from(bytes, 0, 1, Stream::Stdout).unwrap());
        capture.write(OutputChunk::copy_from(bytes, 1, 1, Stream::Stdout).unwrap());

        assert_eq!(capture.flatten_and_clear().stdout, "é");
    }

    #[test]
    fn test_clear_drops_both_streams() {
        let capture = OutputCapture::new();
        capture.write(OutputChunk::from_text("out", Stream::Stdout));
        capture.write(OutputChunk::from_text("err", Stream::Stderr));
        assert_eq!(capture.chunk_count(Stream::Stdout), 1);

        capture.clear();

        assert_eq!(capture.chunk_count(Stream::Stdout), 0);
        assert_eq!(capture.chunk_count(Stream::Stderr), 0);
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        let capture = Arc::new(OutputCapture::new());
        let producers: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|tag| {
                let capture = Arc::clone(&capture);
                thread::spawn(move || {
                    for i in 0..500 {
                        capture.write(OutputChunk::from_text(
                            &format!("{tag}{i:03};"),
                            Stream::Stdout,
                        ));
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().expect("producer thread panicked");
        }

        let stdout = capture.flatten_and_clear().stdout;
        let tokens: Vec<&str> = stdout.split_terminator(';').collect();
        assert_eq!(tokens.len(), 1000);

        for tag in ["a", "b"] {
            let own: Vec<&str> = tokens.iter().copied().filter(|t| t.starts_with(tag)).collect();
            let expected: Vec<String> = (0..500).map(|i| format!("{tag}{i:03}")).collect();
            assert_eq!(own, expected);
        }
    }

    #[test]
    fn test_drain_while_writing_never_duplicates() {
        let capture = Arc::new(OutputCapture::new());
        let writer = {
            let capture = Arc::clone(&capture);
            thread::spawn(move || {
                for i in 0..2000 {
                    capture.write(OutputChunk::from_text(&format!("{i};"), Stream::Stdout));
                }
            })
        };

        let mut drained = String::new();
        while !writer.is_finished() {
            drained.push_str(&capture.flatten_and_clear().stdout);
        }
        writer.join().expect("writer thread panicked");
        drained.push_str(&capture.flatten_and_clear().stdout);

        let seen: Vec<usize> = drained
            .split_terminator(';')
            .map(|t| t.parse().expect("numeric token"))
            .collect();
        assert_eq!(seen, (0..2000).collect::<Vec<_>>());
    }
}
