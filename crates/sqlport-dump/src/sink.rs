//! Destinations for dump scripts

use async_trait::async_trait;
use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Receives the script text of one dump, in order
#[async_trait]
pub trait OutputSink: Send {
    async fn write(&mut self, text: &str) -> io::Result<()>;

    /// Flush and close; no writes follow
    async fn finish(&mut self) -> io::Result<()>;
}

/// Where a dump is saved, usually chosen by the user
#[async_trait]
pub trait SaveTarget: Send + Sync {
    /// Open a sink for a dump. `Ok(None)` means the user cancelled.
    async fn open_for_write(&self, suggested_name: &str) -> io::Result<Option<Box<dyn OutputSink>>>;
}

/// Buffered file output
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    pub async fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await?;
        tracing::debug!(path = %path.display(), "opened dump file");
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl OutputSink for FileSink {
    async fn write(&mut self, text: &str) -> io::Result<()> {
        self.writer.write_all(text.as_bytes()).await
    }

    async fn finish(&mut self) -> io::Result<()> {
        self.writer.flush().await?;
        self.writer.get_mut().sync_all().await
    }
}

#[derive(Debug, Default)]
struct MemoryBuffer {
    text: String,
    finished: bool,
}

/// In-memory output; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<MemoryBuffer>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.buffer.lock().text.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.buffer.lock().finished
    }
}

#[async_trait]
impl OutputSink for MemorySink {
    async fn write(&mut self, text: &str) -> io::Result<()> {
        let mut buffer = self.buffer.lock();
        if buffer.finished {
            return Err(io::Error::other("write after finish"));
        }
        buffer.text.push_str(text);
        Ok(())
    }

    async fn finish(&mut self) -> io::Result<()> {
        self.buffer.lock().finished = true;
        Ok(())
    }
}

/// Saves each dump as a file under a directory, using the suggested name
#[derive(Debug, Clone)]
pub struct DirectoryTarget {
    dir: PathBuf,
}

impl DirectoryTarget {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl SaveTarget for DirectoryTarget {
    async fn open_for_write(&self, suggested_name: &str) -> io::Result<Option<Box<dyn OutputSink>>> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let sink = FileSink::create(self.dir.join(suggested_name)).await?;
        Ok(Some(Box::new(sink)))
    }
}

/// Hands out a shared [`MemorySink`] and remembers the names it was offered
#[derive(Debug, Clone, Default)]
pub struct MemoryTarget {
    sink: MemorySink,
    names: Arc<Mutex<Vec<String>>>,
    declined: bool,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// A target that behaves like a dismissed save dialog
    pub fn declined() -> Self {
        Self {
            declined: true,
            ..Self::default()
        }
    }

    pub fn sink(&self) -> &MemorySink {
        &self.sink
    }

    pub fn suggested_names(&self) -> Vec<String> {
        self.names.lock().clone()
    }
}

#[async_trait]
impl SaveTarget for MemoryTarget {
    async fn open_for_write(&self, suggested_name: &str) -> io::Result<Option<Box<dyn OutputSink>>> {
        self.names.lock().push(suggested_name.to_string());
        if self.declined {
            return Ok(None);
        }
        Ok(Some(Box::new(self.sink.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_sink_writes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let target = DirectoryTarget::new(dir.path().join("dumps"));
        let mut sink = target.open_for_write("shop.sql").await.unwrap().unwrap();
        sink.write("SELECT 1;\n").await.unwrap();
        sink.write("SELECT 2;\n").await.unwrap();
        sink.finish().await.unwrap();

        let text = std::fs::read_to_string(dir.path().join("dumps").join("shop.sql")).unwrap();
        assert_eq!(text, "SELECT 1;\nSELECT 2;\n");
    }

    #[tokio::test]
    async fn test_memory_sink_rejects_writes_after_finish() {
        let mut sink = MemorySink::new();
        let handle = sink.clone();
        sink.write("a").await.unwrap();
        sink.finish().await.unwrap();
        assert!(sink.write("b").await.is_err());
        assert_eq!(handle.contents(), "a");
        assert!(handle.is_finished());
    }
}
