use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::contract::NormalizedRecord;

/// The ordered records produced by one harvest run, in fetch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    records: Vec<NormalizedRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotWriteError {
    #[error("refusing to write an empty snapshot")]
    Empty,
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Snapshot {
    pub fn new(records: Vec<NormalizedRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// UTF-8 JSON array with four-space indentation. Non-ASCII characters are
    /// written as-is, never `\u` escaped.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.records.serialize(&mut ser)?;
        buf.push(b'\n');
        String::from_utf8(buf).map_err(|e| {
            serde_json::Error::io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Write the snapshot to `path` via a temp file in the same directory, so
    /// readers never see a half-written file. Empty snapshots are refused.
    pub fn write_to(&self, path: &Path) -> Result<(), SnapshotWriteError> {
        if self.is_empty() {
            return Err(SnapshotWriteError::Empty);
        }
        let json = self.to_json()?;
        let io_err = |source: std::io::Error| SnapshotWriteError::Io {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(io_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.persist(path).map_err(|e| {
            error!(error = ?e.error, path = %path.display(), "Failed to move snapshot into place");
            io_err(e.error)
        })?;

        info!(path = %path.display(), records = self.len(), "Wrote local snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str) -> NormalizedRecord {
        NormalizedRecord {
            title: title.to_string(),
            link: format!("https://example.org/{title}"),
            body: "body".to_string(),
            publish_date: "2024-01-01T00:00:00".to_string(),
        }
    }

    #[test]
    fn json_keeps_unicode_and_uses_four_space_indent() {
        let snapshot = Snapshot::new(vec![record("Überblick – ČSN")]);
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("Überblick – ČSN"));
        assert!(!json.contains("\\u"));
        assert!(json.contains("\n        \"title\""));
    }

    #[test]
    fn json_never_substitutes_replacement_characters() {
        let snapshot = Snapshot::new(vec![record("日本語 🚀 naïve")]);
        let json = snapshot.to_json().unwrap();
        assert!(!json.contains('\u{FFFD}'));
        assert_eq!(Snapshot::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn json_field_order_is_stable() {
        let json = Snapshot::new(vec![record("a")]).to_json().unwrap();
        let title = json.find("\"title\"").unwrap();
        let link = json.find("\"link\"").unwrap();
        let body = json.find("\"body\"").unwrap();
        let date = json.find("\"publish_date\"").unwrap();
        assert!(title < link && link < body && body < date);
    }

    #[test]
    fn write_to_creates_parent_dirs_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("kb.json");
        let snapshot = Snapshot::new(vec![record("a"), record("b")]);
        snapshot.write_to(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(Snapshot::from_json(&text).unwrap(), snapshot);
    }

    #[test]
    fn write_to_refuses_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.json");
        assert!(matches!(
            Snapshot::empty().write_to(&path),
            Err(SnapshotWriteError::Empty)
        ));
        assert!(!path.exists());
    }
}
