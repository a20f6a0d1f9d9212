//! Corpus enumeration: one directory, one extension, no recursion.

use crate::error::{CorpusError, Result};
use std::path::{Path, PathBuf};

/// Lists the source files of a corpus directory.
pub struct CorpusScanner {
    dir: PathBuf,
    extension: String,
}

impl CorpusScanner {
    pub fn new(dir: PathBuf, extension: impl Into<String>) -> Self {
        Self {
            dir,
            extension: extension.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Enumerate matching files, sorted by file name so repeated runs process
    /// the corpus in a stable order. Subdirectories are not descended into.
    /// An empty result is not an error here; the caller decides whether
    /// "no files found" is fatal.
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(CorpusError::MissingDirectory(self.dir.clone()).into());
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|source| CorpusError::Read {
            path: self.dir.clone(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    tracing::warn!(dir = %self.dir.display(), %error, "skipping unreadable directory entry");
                    continue;
                }
            };

            let path = entry.path();
            if path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
            {
                files.push(path);
            }
        }

        files.sort();
        tracing::info!(dir = %self.dir.display(), count = files.len(), "scanned corpus directory");
        Ok(files)
    }
}

/// Read a corpus file as text, trying UTF-8 first and falling back to a
/// Latin-1 interpretation for legacy corpora. Latin-1 maps every byte to a
/// char, so the fallback cannot fail.
pub fn read_corpus_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|source| CorpusError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(error) => {
            tracing::debug!(path = %path.display(), "file is not valid UTF-8, decoding as Latin-1");
            let text = error
                .into_bytes()
                .iter()
                .map(|&byte| byte as char)
                .collect();
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).expect("write fixture file");
        path
    }

    #[test]
    fn scan_filters_by_extension_and_sorts() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_file(temp.path(), "b.txt", b"beta");
        write_file(temp.path(), "a.txt", b"alpha");
        write_file(temp.path(), "notes.md", b"ignored");
        write_file(temp.path(), "README", b"ignored");

        let scanner = CorpusScanner::new(temp.path().to_path_buf(), "txt");
        let files = scanner.scan().expect("scan");

        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn scan_does_not_recurse() {
        let temp = tempfile::tempdir().expect("tempdir");
        let nested = temp.path().join("nested");
        std::fs::create_dir(&nested).expect("create nested dir");
        write_file(&nested, "deep.txt", b"should not be found");
        write_file(temp.path(), "top.txt", b"top");

        let scanner = CorpusScanner::new(temp.path().to_path_buf(), "txt");
        let files = scanner.scan().expect("scan");
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("top.txt"));
    }

    #[test]
    fn scan_empty_directory_yields_empty_list() {
        let temp = tempfile::tempdir().expect("tempdir");
        let scanner = CorpusScanner::new(temp.path().to_path_buf(), "txt");
        assert!(scanner.scan().expect("scan").is_empty());
    }

    #[test]
    fn scan_missing_directory_is_an_error() {
        let scanner = CorpusScanner::new(PathBuf::from("/definitely/not/here"), "txt");
        assert!(scanner.scan().is_err());
    }

    #[test]
    fn read_falls_back_to_latin1() {
        let temp = tempfile::tempdir().expect("tempdir");
        // "aÃ±o" in Latin-1: 0xF1 is not valid UTF-8 on its own.
        let path = write_file(temp.path(), "legacy.txt", &[b'a', 0xF1, b'o']);
        let text = read_corpus_file(&path).expect("read");
        assert_eq!(text, "a\u{f1}o");
    }
}
