//! Byte channel endpoints
//!
//! `ByteSource` and `ByteSink` are the one-directional handles every stage works
//! against. Both wrap a boxed tokio reader/writer behind a buffer so that
//! byte-at-a-time state machines do not turn into a syscall per byte.
//!
//! Stages are connected with [`channel`], a bounded `tokio::io::duplex` pipe: a
//! writer blocks once `capacity` bytes are in flight, which is the pipeline's only
//! backpressure mechanism.

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter, DuplexStream,
};

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Read endpoint of a byte stream.
pub struct ByteSource {
    name: String,
    path: Option<PathBuf>,
    inner: BufReader<BoxedReader>,
}

impl ByteSource {
    pub fn new(name: impl Into<String>, reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            name: name.into(),
            path: None,
            inner: BufReader::new(Box::new(reader)),
        }
    }

    /// Source backed by a file; the path anchors relative include lookups.
    pub fn from_path(path: &Path, reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            name: path.display().to_string(),
            path: Some(path.to_path_buf()),
            inner: BufReader::new(Box::new(reader)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Next byte, or `None` at end of stream.
    pub async fn read_one(&mut self) -> io::Result<Option<u8>> {
        let buf = self.inner.fill_buf().await?;
        let Some(&byte) = buf.first() else {
            return Ok(None);
        };
        self.inner.consume(1);
        Ok(Some(byte))
    }
}

impl std::fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteSource")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish()
    }
}

/// Write endpoint of a byte stream.
///
/// Call [`ByteSink::finish`] to flush and close. Dropping a sink without finishing
/// it closes the stream too, discarding whatever is still buffered; stages rely on
/// this on their error paths.
pub struct ByteSink {
    name: String,
    inner: BufWriter<BoxedWriter>,
}

impl ByteSink {
    pub fn new(name: impl Into<String>, writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            name: name.into(),
            inner: BufWriter::new(Box::new(writer)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn write_one(&mut self, byte: u8) -> io::Result<()> {
        self.inner.write_u8(byte).await
    }

    pub async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes).await
    }

    /// Drain `source` into this sink until end of stream.
    pub async fn copy_from(&mut self, source: &mut ByteSource) -> io::Result<u64> {
        let copied = tokio::io::copy_buf(&mut source.inner, &mut self.inner).await?;
        self.inner.flush().await?;
        Ok(copied)
    }

    pub async fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().await
    }

    /// Flush buffered bytes and close the underlying writer.
    pub async fn finish(mut self) -> io::Result<()> {
        self.inner.flush().await?;
        self.inner.shutdown().await
    }
}

impl std::fmt::Debug for ByteSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteSink").field("name", &self.name).finish()
    }
}

/// Bounded in-process pipe between two stages.
pub fn channel(name: &str, capacity: usize) -> (ByteSink, ByteSource) {
    let (writer, reader): (DuplexStream, DuplexStream) = tokio::io::duplex(capacity);
    (
        ByteSink::new(format!("{name} (write)"), writer),
        ByteSource::new(format!("{name} (read)"), reader),
    )
}

/// True when a write failed because the reading end was dropped.
pub fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset | io::ErrorKind::WriteZero
    )
}
