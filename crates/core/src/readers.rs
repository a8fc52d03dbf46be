//! Source readers: native corpus containers to positioned JSON items.
//!
//! Two container shapes exist. A single JSON document whose named field
//! holds the item array is parsed up front and its shape checked before
//! any item is handed out. A JSONL file is read lazily; a malformed line,
//! including one that is not valid UTF-8, is logged and skipped without
//! ending the read.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{error, warn};

use crate::error::{json_type_name, ReadError};

/// One raw record from a source corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceItem {
    /// 0-based index of the item in its container: the array index for a
    /// JSON document, the physical line index for JSONL.
    pub position: usize,
    pub value: Value,
}

/// Parse a whole JSON document.
pub fn read_json_document(path: &Path) -> Result<Value, ReadError> {
    let text = std::fs::read_to_string(path).map_err(|source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ReadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Read the array stored under `key` in the JSON object at `path`.
///
/// Fails with [`ReadError::Shape`] if the root is not an object, the key is
/// missing, or the value is not an array. No item is returned in that case.
pub fn read_json_array(path: &Path, key: &str) -> Result<Vec<SourceItem>, ReadError> {
    let document = read_json_document(path)?;
    items_from_document(document, key).map_err(|message| ReadError::Shape {
        path: path.to_path_buf(),
        message,
    })
}

/// Split an already-parsed document into items. Returns the shape error message.
pub fn items_from_document(document: Value, key: &str) -> Result<Vec<SourceItem>, String> {
    let mut root = match document {
        Value::Object(map) => map,
        other => {
            return Err(format!(
                "expected a JSON object with a '{}' array at the top level, found {}",
                key,
                json_type_name(&other)
            ))
        }
    };

    match root.remove(key) {
        Some(Value::Array(items)) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(position, value)| SourceItem { position, value })
            .collect()),
        Some(other) => Err(format!(
            "field '{}' must be an array, found {}",
            key,
            json_type_name(&other)
        )),
        None => Err(format!("missing top-level field '{}'", key)),
    }
}

/// Lazy reader over a JSONL file, yielding one [`SourceItem`] per valid line.
pub struct JsonlReader<R> {
    reader: R,
    buf: Vec<u8>,
    path: PathBuf,
    next_index: usize,
    malformed: usize,
    read_error: Option<io::Error>,
}

impl JsonlReader<BufReader<File>> {
    /// Open `path` for reading.
    pub fn open(path: &Path) -> Result<Self, ReadError> {
        let file = File::open(path).map_err(|source| ReadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_reader(BufReader::new(file), path))
    }
}

impl<R: BufRead> JsonlReader<R> {
    /// Wrap any buffered reader. `path` is only used in log messages.
    pub fn from_reader(reader: R, path: impl Into<PathBuf>) -> Self {
        JsonlReader {
            reader,
            buf: Vec::new(),
            path: path.into(),
            next_index: 0,
            malformed: 0,
            read_error: None,
        }
    }

    /// Number of lines skipped because they were not UTF-8 or not valid JSON.
    pub fn malformed_lines(&self) -> usize {
        self.malformed
    }

    /// The I/O error that ended the read early, if any. Lines after it were
    /// never seen.
    pub fn read_error(&self) -> Option<&io::Error> {
        self.read_error.as_ref()
    }

    /// Consume the reader, turning an early stop into a [`ReadError`].
    pub fn finish(self) -> Result<usize, ReadError> {
        match self.read_error {
            Some(source) => Err(ReadError::Io {
                path: self.path,
                source,
            }),
            None => Ok(self.malformed),
        }
    }

    fn skip_malformed(&mut self, position: usize, error: &dyn std::fmt::Display) {
        self.malformed += 1;
        warn!(
            path = %self.path.display(),
            line = position + 1,
            error = %error,
            "skipping malformed JSONL line"
        );
    }
}

impl<R: BufRead> Iterator for JsonlReader<R> {
    type Item = SourceItem;

    fn next(&mut self) -> Option<SourceItem> {
        if self.read_error.is_some() {
            return None;
        }
        loop {
            let position = self.next_index;
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    error!(
                        path = %self.path.display(),
                        line = position + 1,
                        error = %e,
                        "read error, stopping"
                    );
                    self.read_error = Some(e);
                    return None;
                }
            }
            self.next_index += 1;

            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    self.skip_malformed(position, &e);
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<Value>(line) {
                Ok(value) => return Some(SourceItem { position, value }),
                Err(e) => self.skip_malformed(position, &e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_items_from_document() {
        let doc = json!({"version": "1", "data": [{"a": 1}, {"a": 2}]});
        let items = items_from_document(doc, "data").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].position, 1);
        assert_eq!(items[1].value, json!({"a": 2}));
    }

    #[test]
    fn test_root_not_object() {
        let err = items_from_document(json!([1, 2]), "data").unwrap_err();
        assert!(err.contains("found array"));
    }

    #[test]
    fn test_missing_key() {
        let err = items_from_document(json!({"items": []}), "data").unwrap_err();
        assert!(err.contains("missing top-level field 'data'"));
    }

    #[test]
    fn test_key_not_array() {
        let err = items_from_document(json!({"data": {"x": 1}}), "data").unwrap_err();
        assert!(err.contains("must be an array, found object"));
    }

    #[test]
    fn test_jsonl_skips_blank_and_malformed_lines() {
        let text = "{\"a\":1}\n\nnot json\n{\"a\":2}\n";
        let mut reader = JsonlReader::from_reader(Cursor::new(text), "mem.jsonl");
        let items: Vec<SourceItem> = reader.by_ref().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].position, 0);
        // Positions are physical line indices, unaffected by skipped lines.
        assert_eq!(items[1].position, 3);
        assert_eq!(reader.malformed_lines(), 1);
    }

    #[test]
    fn test_jsonl_invalid_utf8_line_is_skipped() {
        let bytes: &[u8] = b"{\"a\":1}\n{\"a\":\"\xff\xfe\"}\n{\"a\":3}\n{\"a\":4}\n";
        let mut reader = JsonlReader::from_reader(Cursor::new(bytes), "mem.jsonl");
        let items: Vec<SourceItem> = reader.by_ref().collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].value, json!({"a": 3}));
        assert_eq!(items[1].position, 2);
        assert_eq!(reader.malformed_lines(), 1);
        assert!(reader.read_error().is_none());
        assert_eq!(reader.finish().unwrap(), 1);
    }

    #[test]
    fn test_jsonl_last_line_without_newline() {
        let mut reader = JsonlReader::from_reader(Cursor::new("{\"a\":1}\r\n{\"a\":2}"), "mem.jsonl");
        let items: Vec<SourceItem> = reader.by_ref().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].value, json!({"a": 2}));
    }

    struct FailingAfterFirstLine {
        inner: Cursor<&'static [u8]>,
    }

    impl io::Read for FailingAfterFirstLine {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            io::Read::read(&mut self.inner, buf)
        }
    }

    impl BufRead for FailingAfterFirstLine {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            if self.inner.position() > 0 {
                return Err(io::Error::other("disk gone"));
            }
            self.inner.fill_buf()
        }

        fn consume(&mut self, amt: usize) {
            self.inner.consume(amt)
        }
    }

    #[test]
    fn test_jsonl_io_error_is_reported() {
        let source = FailingAfterFirstLine {
            inner: Cursor::new(&b"{\"a\":1}\n{\"a\":2}\n"[..]),
        };
        let mut reader = JsonlReader::from_reader(source, "mem.jsonl");
        let items: Vec<SourceItem> = reader.by_ref().collect();
        assert_eq!(items.len(), 1);
        assert!(reader.read_error().is_some());
        assert!(reader.next().is_none());
        assert!(matches!(reader.finish(), Err(ReadError::Io { .. })));
    }

    #[test]
    fn test_jsonl_open_missing_file() {
        let err = JsonlReader::open(Path::new("/nonexistent/dir/x.jsonl"))
            .err()
            .expect("open should fail");
        assert!(matches!(err, ReadError::Io { .. }));
    }
}
