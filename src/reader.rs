use std::collections::VecDeque;
use std::path::Path;

use async_stream::try_stream;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::{HistoryError, Result};

/// File reader: whole-file reads for small JSON documents, lazy line streams
/// for logs that may be too large to buffer.
#[derive(Debug, Clone)]
pub struct FileReader {
    pub buffer_size: usize,
}

impl Default for FileReader {
    fn default() -> Self {
        Self::new(64 * 1024)
    }
}

impl FileReader {
    pub fn new(buffer_size: usize) -> Self {
        Self { buffer_size }
    }

    pub async fn read_to_string(&self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| HistoryError::io(path, e))
    }

    /// `Ok(None)` when the file does not exist.
    pub async fn read_optional(&self, path: &Path) -> Result<Option<String>> {
        match self.read_to_string(path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let raw = self.read_to_string(path).await?;
        serde_json::from_str(&raw).map_err(|e| HistoryError::parse(path, e))
    }

    pub async fn read_json_optional<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match self.read_optional(path).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| HistoryError::parse(path, e)),
            None => Ok(None),
        }
    }

    /// Stream lines without their terminators. The file handle lives inside the
    /// stream and is closed as soon as the stream is dropped, so a consumer that
    /// stops early never drains the rest of the file.
    pub async fn read_lines(&self, path: &Path) -> Result<BoxStream<'static, Result<String>>> {
        let file = File::open(path)
            .await
            .map_err(|e| HistoryError::io(path, e))?;
        let mut reader = BufReader::with_capacity(self.buffer_size, file);
        let path_buf = path.to_path_buf();

        let stream = try_stream! {
            let mut buf = Vec::new();
            loop {
                buf.clear();
                let n = reader
                    .read_until(b'\n', &mut buf)
                    .await
                    .map_err(|e| HistoryError::io(&path_buf, e))?;
                if n == 0 {
                    break;
                }
                yield String::from_utf8_lossy(trim_line_ending(&buf)).into_owned();
            }
        };
        Ok(Box::pin(stream))
    }

    /// Last `n` lines of the file, read in one pass with a bounded window.
    pub async fn tail_window(&self, path: &Path, n: usize) -> Result<TailWindow> {
        let mut lines = self.read_lines(path).await?;
        let mut window = TailWindow::new(n);
        while let Some(line) = lines.next().await {
            window.push(line?);
        }
        Ok(window)
    }

    pub async fn tail_lines(&self, path: &Path, n: usize) -> Result<Vec<String>> {
        Ok(self.tail_window(path, n).await?.into_lines())
    }
}

fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}

/// Sliding window over a line sequence. Holds at most `capacity + 1` lines at
/// any moment; the oldest is evicted as soon as the window overflows.
#[derive(Debug)]
pub struct TailWindow {
    capacity: usize,
    lines: VecDeque<String>,
    peak: usize,
}

impl TailWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            lines: VecDeque::with_capacity(capacity + 1),
            peak: 0,
        }
    }

    pub fn push(&mut self, line: String) {
        self.lines.push_back(line);
        self.peak = self.peak.max(self.lines.len());
        if self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    /// Largest number of lines buffered at once.
    pub fn peak(&self) -> usize {
        self.peak
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[tokio::test]
    async fn read_lines_strips_terminators() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.txt");
        std::fs::write(&path, "first\r\nsecond\nthird").unwrap();

        let reader = FileReader::new(16 * 1024);
        let mut stream = reader.read_lines(&path).await.unwrap();
        let mut lines = Vec::new();
        while let Some(line) = stream.next().await {
            lines.push(line.unwrap());
        }

        assert_eq!(lines, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn tail_of_large_file_uses_bounded_window() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.txt");
        let body: String = (1..=10_000).map(|i| format!("line {i}\n")).collect();
        std::fs::write(&path, body).unwrap();

        let window = FileReader::default().tail_window(&path, 5).await.unwrap();
        assert!(window.peak() <= 6);
        assert_eq!(
            window.into_lines(),
            vec!["line 9996", "line 9997", "line 9998", "line 9999", "line 10000"]
        );
    }

    #[tokio::test]
    async fn optional_reads_distinguish_absence_from_corruption() {
        #[derive(Debug, Deserialize)]
        struct Doc {
            #[allow(dead_code)]
            name: String,
        }

        let dir = tempdir().unwrap();
        let reader = FileReader::default();

        let missing = reader
            .read_json_optional::<Doc>(&dir.path().join("nope.json"))
            .await
            .unwrap();
        assert!(missing.is_none());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        let err = reader.read_json_optional::<Doc>(&bad).await.unwrap_err();
        assert!(matches!(err, HistoryError::Parse { .. }));
    }
}
