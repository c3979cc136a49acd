//! Output targets for generated declarations.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::config::OutputTarget;
use crate::error::{Result, TypegenError};

/// Ordered text output. `close` flushes and must be called exactly once;
/// writes after it fail.
pub trait DeclarationSink: Send {
    fn write(&mut self, text: &str) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    /// Short label for logs and run summaries.
    fn describe(&self) -> String;
}

/// [`DeclarationSink`] over any [`Write`].
#[derive(Debug)]
pub struct WriterSink<W: Write + Send> {
    writer: W,
    label: String,
    bytes_written: usize,
    closed: bool,
}

/// Sink writing to a file.
pub type FileSink = WriterSink<BufWriter<File>>;

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W, label: impl Into<String>) -> Self {
        Self {
            writer,
            label: label.into(),
            bytes_written: 0,
            closed: false,
        }
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Give back the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<Vec<u8>> {
    /// In-memory sink.
    pub fn buffer() -> Self {
        Self::new(Vec::new(), "memory")
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.writer).into_owned()
    }
}

impl FileSink {
    /// Create (or truncate) the file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), path.display().to_string()))
    }
}

impl<W: Write + Send> DeclarationSink for WriterSink<W> {
    fn write(&mut self, text: &str) -> Result<()> {
        if self.closed {
            return Err(TypegenError::Emit(format!(
                "write to {} after it was closed",
                self.label
            )));
        }
        self.writer.write_all(text.as_bytes())?;
        self.bytes_written += text.len();
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(TypegenError::Emit(format!("{} closed twice", self.label)));
        }
        self.closed = true;
        self.writer.flush()?;
        debug!("Closed {} after {} bytes", self.label, self.bytes_written);
        Ok(())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Open the sink for an output target.
pub fn open_sink(target: &OutputTarget) -> Result<Box<dyn DeclarationSink>> {
    match target {
        OutputTarget::Stdout => Ok(Box::new(WriterSink::new(std::io::stdout(), "stdout"))),
        OutputTarget::File(path) => Ok(Box::new(FileSink::create(path)?)),
    }
}
