use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

// @module: File naming and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Make a character key safe to use inside a file name.
    ///
    /// Whitespace and path separators become `_`, other characters that are
    /// awkward on common filesystems are dropped.
    pub fn sanitize_file_component(key: &str) -> String {
        let sanitized: String = key
            .trim()
            .chars()
            .filter_map(|c| match c {
                c if c.is_whitespace() => Some('_'),
                '/' | '\\' => Some('_'),
                ':' | '*' | '?' | '"' | '<' | '>' | '|' => None,
                c if c.is_control() => None,
                c => Some(c),
            })
            .collect();

        let sanitized = sanitized.trim_matches('.');
        if sanitized.is_empty() {
            "UNNAMED".to_string()
        } else {
            sanitized.to_string()
        }
    }

    // @generates: Final per-line file name, 1-based index
    pub fn line_file_name(key: &str, index: usize, extension: &str) -> String {
        format!("{}_line_{:03}.{}", Self::sanitize_file_component(key), index, extension)
    }

    // @generates: Staging file name, unique per dialogue sequence
    pub fn staging_file_name(key: &str, sequence: u64, extension: &str) -> String {
        format!("{}_seq_{:06}.{}", Self::sanitize_file_component(key), sequence, extension)
    }

    // @generates: Archive path for one character
    pub fn archive_path<P: AsRef<Path>>(output_dir: P, key: &str) -> PathBuf {
        output_dir
            .as_ref()
            .join(format!("{}_all_lines.zip", Self::sanitize_file_component(key)))
    }

    // @generates: Batch report path next to the archives
    pub fn report_path<P1: AsRef<Path>, P2: AsRef<Path>>(output_dir: P1, script: P2) -> PathBuf {
        let stem = script
            .as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "script".to_string());
        output_dir.as_ref().join(format!("{}.report.json", stem))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;
        Ok(())
    }
}
