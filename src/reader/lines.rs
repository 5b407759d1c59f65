//! Line-batch mode for plain delimited-text sources.
//!
//! Files arrive in UTF-8 or UTF-16 with a BOM; the encoding is sniffed
//! from the first bytes and the decoded text is yielded as fixed-size
//! line batches. The graph core does not use this mode; it exists for
//! the straight-through text importers sharing the reader interface.

use std::path::Path;

use encoding_rs::{Encoding, UTF_8};

use super::ReadError;

/// Default lines per batch.
pub const DEFAULT_LINES_PER_BATCH: usize = 20;

/// Reader yielding batches of decoded text lines.
pub struct LineReader {
    lines: std::vec::IntoIter<String>,
    batch_size: usize,
}

impl LineReader {
    /// Open a text file, sniffing UTF-8/UTF-16 from its BOM.
    pub fn open(path: &Path, batch_size: usize) -> Result<Self, ReadError> {
        let bytes = std::fs::read(path)?;
        let encoding = Encoding::for_bom(&bytes)
            .map(|(encoding, _)| encoding)
            .unwrap_or(UTF_8);
        // decode() strips the BOM itself.
        let (text, _, had_errors) = encoding.decode(&bytes);
        if had_errors {
            tracing::warn!(path = %path.display(), encoding = encoding.name(), "replacement characters while decoding text source");
        }
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        Ok(Self {
            lines: lines.into_iter(),
            batch_size: batch_size.max(1),
        })
    }
}

impl Iterator for LineReader {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Vec<String>> {
        let batch: Vec<String> = self.lines.by_ref().take(self.batch_size).collect();
        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn utf8_file_batches_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "one").unwrap();
        writeln!(file, "two").unwrap();
        writeln!(file, "three").unwrap();

        let mut reader = LineReader::open(file.path(), 2).unwrap();
        assert_eq!(reader.next().unwrap(), vec!["one", "two"]);
        assert_eq!(reader.next().unwrap(), vec!["three"]);
        assert!(reader.next().is_none());
    }

    #[test]
    fn utf16le_bom_is_sniffed() {
        let mut bytes: Vec<u8> = vec![0xFF, 0xFE];
        for unit in "héllo\nwörld".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();

        let mut reader = LineReader::open(file.path(), DEFAULT_LINES_PER_BATCH).unwrap();
        assert_eq!(reader.next().unwrap(), vec!["héllo", "wörld"]);
    }

    #[test]
    fn empty_file_yields_nothing() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut reader = LineReader::open(file.path(), 4).unwrap();
        assert!(reader.next().is_none());
    }
}
