//! File tools exposed to the coder agent.
//!
//! Every tool is confined to the project root. Failures are rendered as
//! `ERROR: ...` text and handed back to the model instead of aborting the run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::core::path::{relative_slash_path, resolve_in_project};
use crate::io::model::{ToolCall, ToolSpec};
use crate::io::prompt::truncate_with_marker;

pub const READ_FILE: &str = "read_file";
pub const WRITE_FILE: &str = "write_file";
pub const LIST_FILES: &str = "list_files";
pub const GET_CURRENT_DIRECTORY: &str = "get_current_directory";

/// Read/write/list tools bound to one project root.
#[derive(Debug, Clone)]
pub struct ProjectTools {
    root: PathBuf,
    output_limit_bytes: usize,
}

#[derive(Deserialize)]
struct PathArgs {
    path: String,
}

#[derive(Deserialize)]
struct WriteArgs {
    path: String,
    content: String,
}

#[derive(Deserialize)]
struct ListArgs {
    #[serde(default = "current_dir_arg")]
    directory: String,
}

fn current_dir_arg() -> String {
    ".".to_string()
}

impl ProjectTools {
    /// Create the project root if needed and bind tools to its canonical path.
    pub fn new(root: &Path, output_limit_bytes: usize) -> Result<Self> {
        fs::create_dir_all(root)
            .with_context(|| format!("create project root {}", root.display()))?;
        let root = root
            .canonicalize()
            .with_context(|| format!("canonicalize {}", root.display()))?;
        Ok(Self {
            root,
            output_limit_bytes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Schemas advertised to the model.
    pub fn specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: READ_FILE.to_string(),
                description: "Read a file inside the project. Returns an empty string if it does not exist.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": {"type": "string", "description": "Project-relative file path"}
                    },
                    "required": ["path"]
                }),
            },
            ToolSpec {
                name: WRITE_FILE.to_string(),
                description: "Write the full content of a file inside the project, creating parent directories.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": {"type": "string", "description": "Project-relative file path"},
                        "content": {"type": "string", "description": "Complete new file content"}
                    },
                    "required": ["path", "content"]
                }),
            },
            ToolSpec {
                name: LIST_FILES.to_string(),
                description: "List all files under a project directory.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "directory": {"type": "string", "description": "Project-relative directory (default \".\")"}
                    }
                }),
            },
            ToolSpec {
                name: GET_CURRENT_DIRECTORY.to_string(),
                description: "Return the absolute path of the project root.".to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            },
        ]
    }

    /// Execute one tool call and return the text handed back to the model.
    pub fn call(&self, call: &ToolCall) -> String {
        let name = call.function.name.as_str();
        debug!(tool = name, id = call.id.as_str(), "executing tool call");
        let result = match name {
            READ_FILE => parse_args::<PathArgs>(&call.function.arguments)
                .and_then(|args| self.read_file(&args.path)),
            WRITE_FILE => parse_args::<WriteArgs>(&call.function.arguments)
                .and_then(|args| self.write_file(&args.path, &args.content)),
            LIST_FILES => parse_args::<ListArgs>(&call.function.arguments)
                .and_then(|args| self.list_files(&args.directory)),
            GET_CURRENT_DIRECTORY => Ok(self.get_current_directory()),
            other => Err(anyhow!("unknown tool '{other}'")),
        };

        match result {
            Ok(text) => truncate_with_marker(&text, self.output_limit_bytes),
            Err(err) => {
                warn!(tool = name, error = %format!("{err:#}"), "tool call failed");
                format!("ERROR: {err:#}")
            }
        }
    }

    /// Content of `path`, or an empty string when the file does not exist.
    pub fn read_file(&self, path: &str) -> Result<String> {
        let resolved = resolve_in_project(&self.root, path)?;
        if !resolved.exists() {
            return Ok(String::new());
        }
        fs::read_to_string(&resolved).with_context(|| format!("read {}", resolved.display()))
    }

    pub fn write_file(&self, path: &str, content: &str) -> Result<String> {
        let resolved = resolve_in_project(&self.root, path)?;
        if resolved == self.root {
            return Err(anyhow!("'{path}' is the project root, not a file"));
        }
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(&resolved, content).with_context(|| format!("write {}", resolved.display()))?;
        Ok(format!("WROTE:{}", resolved.display()))
    }

    pub fn list_files(&self, directory: &str) -> Result<String> {
        let resolved = resolve_in_project(&self.root, directory)?;
        if !resolved.is_dir() {
            return Err(anyhow!("'{directory}' is not a directory"));
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&resolved).sort_by_file_name() {
            let entry = entry.with_context(|| format!("walk {}", resolved.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(rel) = relative_slash_path(&self.root, entry.path()) {
                files.push(rel);
            }
        }
        if files.is_empty() {
            return Ok("No files found.".to_string());
        }
        Ok(files.join("\n"))
    }

    pub fn get_current_directory(&self) -> String {
        self.root.display().to_string()
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(raw: &str) -> Result<T> {
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    serde_json::from_str(raw).with_context(|| format!("invalid tool arguments {raw}"))
}
