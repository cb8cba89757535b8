use crate::endpoint::Sink;
use crate::error::{PipelineError, Result};
use crate::word::{encode, Word};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

struct FileWriter {
    writer: BufWriter<File>,
    scratch: Vec<u8>,
}

/// Appends every received word to a file, truncated on open.
pub struct FileSink<W: Word> {
    path: PathBuf,
    inner: Mutex<FileWriter>,
    _word: PhantomData<fn(W)>,
}

impl<W: Word> FileSink<W> {
    /// Create or truncate the file at `path`
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| PipelineError::io(path, e))?;

        debug!(path = %path.display(), "opened file sink");

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(FileWriter {
                writer: BufWriter::new(file),
                scratch: Vec::new(),
            }),
            _word: PhantomData,
        })
    }

    /// Get the path of the output file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Push buffered bytes to the file
    pub fn flush(&self) -> Result<()> {
        self.inner
            .lock()
            .writer
            .flush()
            .map_err(|e| PipelineError::io(&self.path, e))
    }
}

impl<W: Word> Sink<W> for FileSink<W> {
    fn consume(&self, src: &[W]) -> Result<usize> {
        let mut inner = self.inner.lock();
        let FileWriter { writer, scratch } = &mut *inner;

        encode(src, scratch);
        writer
            .write_all(scratch)
            .map_err(|e| PipelineError::io(&self.path, e))?;
        Ok(src.len())
    }

    fn signal_stop(&self) {
        if let Err(e) = self.flush() {
            warn!(error = %e, "failed to flush file sink on stop");
        }
    }
}

/// Accepts and discards everything.
#[derive(Debug)]
pub struct NullSink<W: Word> {
    _word: PhantomData<fn(W)>,
}

impl<W: Word> NullSink<W> {
    /// Create a sink that discards everything
    pub fn new() -> Self {
        Self { _word: PhantomData }
    }
}

impl<W: Word> Default for NullSink<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Word> Sink<W> for NullSink<W> {
    fn consume(&self, src: &[W]) -> Result<usize> {
        Ok(src.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sink_truncates_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.dat");
        std::fs::write(&path, b"stale contents").unwrap();

        let sink = FileSink::<u16>::create(&path).unwrap();
        assert_eq!(sink.consume(&[0x0102, 0x0304]).unwrap(), 2);
        assert_eq!(sink.consume(&[0x0506]).unwrap(), 1);
        sink.flush().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), vec![2, 1, 4, 3, 6, 5]);
    }

    #[test]
    fn test_file_sink_flushes_on_stop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.dat");

        let sink = FileSink::<u8>::create(&path).unwrap();
        sink.consume(&[9, 8, 7]).unwrap();
        Sink::signal_stop(&sink);

        assert_eq!(std::fs::read(&path).unwrap(), vec![9, 8, 7]);
    }

    #[test]
    fn test_file_sink_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileSink::<u8>::create(dir.path().join("no/such/dir/out.dat"));
        assert!(matches!(result, Err(PipelineError::Io { .. })));
    }

    #[test]
    fn test_null_sink() {
        let sink = NullSink::<u64>::new();
        assert_eq!(sink.consume(&[1, 2, 3]).unwrap(), 3);
        assert_eq!(sink.consume(&[]).unwrap(), 0);
    }
}
