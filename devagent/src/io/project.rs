//! Read-side helpers over the generated project tree (listing, viewing, zipping).

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::core::language::language_for;
use crate::core::path::{relative_slash_path, resolve_in_project};

pub const ARCHIVE_NAME: &str = "generated_project.zip";

/// A regular file under the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    /// `/`-separated path relative to the project root.
    pub path: String,
    pub language: Option<String>,
    pub size: u64,
    #[serde(skip)]
    pub absolute: PathBuf,
}

/// All regular files under `root`, sorted by relative path.
///
/// A missing root yields an empty list.
pub fn list_generated_files(root: &Path) -> Result<Vec<GeneratedFile>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(path) = relative_slash_path(root, entry.path()) else {
            continue;
        };
        let size = entry
            .metadata()
            .with_context(|| format!("stat {}", entry.path().display()))?
            .len();
        files.push(GeneratedFile {
            language: language_for(entry.path()),
            path,
            size,
            absolute: entry.path().to_path_buf(),
        });
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// Resolve a project-relative path to an existing regular file.
pub fn resolve_generated_file(root: &Path, rel: &str) -> Result<PathBuf> {
    let resolved = resolve_in_project(root, rel)?;
    if !resolved.is_file() {
        return Err(anyhow!("no generated file '{rel}'"));
    }
    Ok(resolved)
}

pub fn read_generated_file(root: &Path, rel: &str) -> Result<String> {
    let resolved = resolve_generated_file(root, rel)?;
    fs::read_to_string(&resolved).with_context(|| format!("read {}", resolved.display()))
}

/// Build a deflate-compressed zip of every generated file.
pub fn create_zip(root: &Path) -> Result<Vec<u8>> {
    let files = list_generated_files(root)?;
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for file in &files {
        let bytes =
            fs::read(&file.absolute).with_context(|| format!("read {}", file.absolute.display()))?;
        zip.start_file(file.path.as_str(), options)
            .with_context(|| format!("add {} to archive", file.path))?;
        zip.write_all(&bytes)
            .with_context(|| format!("write {} to archive", file.path))?;
    }
    let cursor = zip.finish().context("finish archive")?;
    Ok(cursor.into_inner())
}

/// Write the archive to `out`, returning the number of files it holds.
pub fn write_zip(root: &Path, out: &Path) -> Result<usize> {
    let count = list_generated_files(root)?.len();
    let bytes = create_zip(root)?;
    fs::write(out, bytes).with_context(|| format!("write {}", out.display()))?;
    Ok(count)
}
