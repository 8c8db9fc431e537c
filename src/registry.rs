//! Route discovery.
//!
//! Every immediate subdirectory of the handler directory that contains a
//! `post` executable becomes a route named after the directory. The `login`
//! directory is reserved for authentication and never becomes a data route.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const LOGIN_ROUTE: &str = "login";
pub const HANDLER_PROGRAM: &str = "post";
pub const INPUT_SCHEMA: &str = "validate-input.json";
pub const OUTPUT_SCHEMA: &str = "validate-output.json";

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("cannot read handler directory {path}: {source}")]
    ReadDir { path: PathBuf, source: io::Error },

    #[error("cannot inspect handler entry {path}: {source}")]
    Entry { path: PathBuf, source: io::Error },
}

/// Resolved metadata for one route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerDescriptor {
    pub name: String,
    pub program: PathBuf,
    pub input_schema: Option<PathBuf>,
    pub output_schema: Option<PathBuf>,
}

/// What the scan observed about one directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub name: String,
    pub dir: PathBuf,
    pub is_dir: bool,
    pub has_program: bool,
    pub has_input_schema: bool,
    pub has_output_schema: bool,
}

/// Immutable route table, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    routes: BTreeMap<String, HandlerDescriptor>,
}

impl HandlerRegistry {
    /// Scan `base_dir` and build the route table.
    ///
    /// Scan failures are logged and leave the affected routes out; they never
    /// abort startup.
    pub fn build(base_dir: &Path) -> Self {
        let (entries, errors) = scan(base_dir);
        for err in &errors {
            tracing::error!("handler scan: {}", err);
        }
        Self::from_entries(entries)
    }

    /// Build the route table from an already collected snapshot.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = RouteEntry>,
    {
        let mut routes = BTreeMap::new();
        for entry in entries {
            if !entry.is_dir || !entry.has_program || entry.name == LOGIN_ROUTE {
                continue;
            }
            let descriptor = HandlerDescriptor {
                program: entry.dir.join(HANDLER_PROGRAM),
                input_schema: entry.has_input_schema.then(|| entry.dir.join(INPUT_SCHEMA)),
                output_schema: entry.has_output_schema.then(|| entry.dir.join(OUTPUT_SCHEMA)),
                name: entry.name,
            };
            routes.entry(descriptor.name.clone()).or_insert(descriptor);
        }
        Self { routes }
    }

    pub fn get(&self, name: &str) -> Option<&HandlerDescriptor> {
        self.routes.get(name)
    }

    /// Routes in name order.
    pub fn routes(&self) -> impl Iterator<Item = &HandlerDescriptor> {
        self.routes.values()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Take a sorted snapshot of the handler directory.
///
/// Per-entry failures are returned alongside the entries that could be read.
pub fn scan(base_dir: &Path) -> (Vec<RouteEntry>, Vec<ScanError>) {
    let mut entries = Vec::new();
    let mut errors = Vec::new();

    let read_dir = match fs::read_dir(base_dir) {
        Ok(read_dir) => read_dir,
        Err(source) => {
            errors.push(ScanError::ReadDir {
                path: base_dir.to_path_buf(),
                source,
            });
            return (entries, errors);
        }
    };

    for item in read_dir {
        let item = match item {
            Ok(item) => item,
            Err(source) => {
                errors.push(ScanError::Entry {
                    path: base_dir.to_path_buf(),
                    source,
                });
                continue;
            }
        };
        let dir = item.path();
        let Some(name) = item.file_name().to_str().map(str::to_string) else {
            tracing::warn!("skipping handler directory with non UTF-8 name: {}", dir.display());
            continue;
        };
        // Follow symlinks so a linked handler directory still counts
        let is_dir = match fs::metadata(&dir) {
            Ok(meta) => meta.is_dir(),
            Err(source) => {
                errors.push(ScanError::Entry { path: dir, source });
                continue;
            }
        };
        let program = dir.join(HANDLER_PROGRAM);
        let has_program = is_dir && program_present(&program);
        entries.push(RouteEntry {
            has_input_schema: is_dir && dir.join(INPUT_SCHEMA).is_file(),
            has_output_schema: is_dir && dir.join(OUTPUT_SCHEMA).is_file(),
            name,
            dir,
            is_dir,
            has_program,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    (entries, errors)
}

fn program_present(program: &Path) -> bool {
    let Ok(meta) = fs::metadata(program) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 == 0 {
            tracing::warn!("{} is not executable, requests to it will fail", program.display());
        }
    }
    true
}
