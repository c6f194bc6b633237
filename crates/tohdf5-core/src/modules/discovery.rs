//! Input discovery: which files exist and which particle type each belongs to.
//!
//! Discovery is kept free of decoding so the type order can be checked
//! without touching file contents.

use crate::common::SpeciesNaming;
use crate::domain::{IngestError, IngestResult};
use globset::GlobBuilder;
use indexmap::IndexSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedPath {
    pub key: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Discovery {
    /// Files in listing order, each tagged with its type key.
    pub entries: Vec<TypedPath>,
    /// Files whose name could not produce a key.
    pub unrecognized: Vec<PathBuf>,
}

impl Discovery {
    /// Type keys in first-seen order.
    pub fn keys(&self) -> Vec<&str> {
        let keys: IndexSet<&str> = self.entries.iter().map(|entry| entry.key.as_str()).collect();
        keys.into_iter().collect()
    }
}

/// Species key for one file name, or `None` when the name is not longer than the suffix.
pub fn species_key(file_name: &str, naming: &SpeciesNaming) -> Option<String> {
    let char_count = file_name.chars().count();
    if char_count <= naming.suffix_len {
        return None;
    }
    let stem: String = file_name.chars().take(char_count - naming.suffix_len).collect();

    if naming.strip_index_token {
        if let Some((head, tail)) = stem.rsplit_once('_') {
            if !head.is_empty() && !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) {
                return Some(head.to_string());
            }
        }
    }
    Some(stem)
}

pub fn discover_species(paths: &[PathBuf], naming: &SpeciesNaming) -> Discovery {
    let mut discovery = Discovery::default();
    for path in paths {
        let key = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| species_key(name, naming));
        match key {
            Some(key) => discovery.entries.push(TypedPath {
                key,
                path: path.clone(),
            }),
            None => discovery.unrecognized.push(path.clone()),
        }
    }
    discovery
}

pub fn directory_key(path: &Path) -> String {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            parent.to_string_lossy().replace('\\', "/")
        }
        _ => ".".to_string(),
    }
}

pub fn discover_directories(paths: &[PathBuf]) -> Discovery {
    Discovery {
        entries: paths
            .iter()
            .map(|path| TypedPath {
                key: directory_key(path),
                path: path.clone(),
            })
            .collect(),
        unrecognized: Vec::new(),
    }
}

/// Regular files directly under `directory`, sorted by file name.
pub fn list_directory(directory: &Path) -> IngestResult<Vec<PathBuf>> {
    let read_error = |source: std::io::Error| {
        IngestError::io_system(
            "IO.LIST_DIRECTORY",
            format!("failed to list directory '{}': {}", directory.display(), source),
        )
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(directory).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        if entry.file_type().map_err(read_error)?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Expands shell-style patterns the shell left unexpanded.
///
/// Plain paths pass through untouched. Pattern matches are sorted per pattern
/// and duplicates across patterns keep their first position.
pub fn expand_patterns<S: AsRef<str>>(patterns: &[S]) -> IngestResult<Vec<PathBuf>> {
    let mut expanded: IndexSet<PathBuf> = IndexSet::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        if !has_glob_meta(pattern) {
            expanded.insert(PathBuf::from(pattern));
            continue;
        }

        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| {
                IngestError::input_validation(
                    "INPUT.GLOB_PATTERN",
                    format!("invalid glob pattern '{}': {}", pattern, source),
                )
            })?
            .compile_matcher();

        let root = literal_prefix(pattern);
        let scope = WalkScope::for_pattern(pattern);
        let mut candidates = Vec::new();
        if root.is_dir() {
            collect_candidates(&root, 1, &scope, &mut candidates)?;
        }
        let mut matched: Vec<PathBuf> = candidates
            .into_iter()
            .filter(|candidate| matcher.is_match(strip_current_dir(candidate)))
            .collect();
        matched.sort();
        expanded.extend(matched);
    }
    Ok(expanded.into_iter().collect())
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn literal_prefix(pattern: &str) -> PathBuf {
    let mut root = PathBuf::new();
    for component in Path::new(pattern).components() {
        if has_glob_meta(&component.as_os_str().to_string_lossy()) {
            break;
        }
        root.push(component.as_os_str());
    }
    if root.as_os_str().is_empty() {
        return PathBuf::from(".");
    }
    root
}

fn strip_current_dir(path: &Path) -> &Path {
    match path.components().next() {
        Some(Component::CurDir) => path.strip_prefix(".").unwrap_or(path),
        _ => path,
    }
}

/// How far below the literal prefix a pattern can reach.
struct WalkScope {
    /// `None` once a `**` component appears.
    max_depth: Option<usize>,
    include_hidden: bool,
}

impl WalkScope {
    fn for_pattern(pattern: &str) -> Self {
        let glob_components: Vec<String> = Path::new(pattern)
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .skip_while(|component| !has_glob_meta(component))
            .collect();
        let recursive = glob_components.iter().any(|component| component == "**");
        Self {
            max_depth: (!recursive).then_some(glob_components.len()),
            include_hidden: glob_components.iter().any(|component| component.starts_with('.')),
        }
    }

    fn descends_below(&self, depth: usize) -> bool {
        self.max_depth.is_none_or(|max_depth| depth < max_depth)
    }
}

fn collect_candidates(
    directory: &Path,
    depth: usize,
    scope: &WalkScope,
    results: &mut Vec<PathBuf>,
) -> IngestResult<()> {
    let read_error = |source: std::io::Error| {
        IngestError::io_system(
            "IO.LIST_DIRECTORY",
            format!("failed to list directory '{}': {}", directory.display(), source),
        )
    };

    for entry in fs::read_dir(directory).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        if !scope.include_hidden && entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let entry_path = entry.path();
        let file_type = entry.file_type().map_err(read_error)?;
        if file_type.is_dir() {
            if scope.descends_below(depth) {
                collect_candidates(&entry_path, depth + 1, scope, results)?;
            }
        } else if file_type.is_file() {
            results.push(entry_path);
        }
    }
    Ok(())
}
