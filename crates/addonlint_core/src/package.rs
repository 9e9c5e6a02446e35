//! Packaged files.
//!
//! The engine only sees a package through [`FileOracle`]: which normalized
//! paths exist and a byte stream per file. Directories are listed with a
//! trailing `/`.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;
use walkdir::WalkDir;

use crate::LinterError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// How a file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Raw bytes.
    Binary,
    /// UTF-8 text with any leading byte order mark removed.
    Text,
}

/// A readable file stream.
pub type PackageStream = Pin<Box<dyn AsyncRead + Send>>;

/// Read-only view of the files in a package.
pub trait FileOracle: Send + Sync {
    /// Whether a file or directory exists at the normalized path.
    fn exists(&self, path: &str) -> bool;

    /// Opens a file for reading.
    fn open_stream(&self, path: &str, mode: StreamMode) -> io::Result<PackageStream>;

    /// Every path in the package, sorted.
    fn paths(&self) -> Vec<&str>;
}

/// Normalizes a manifest-relative path (`./icons\a.png` → `icons/a.png`).
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut path = path.as_str();
    loop {
        if let Some(rest) = path.strip_prefix("./") {
            path = rest;
        } else if let Some(rest) = path.strip_prefix('/') {
            path = rest;
        } else {
            break;
        }
    }
    path.to_string()
}

/// Reads a whole file as text.
pub async fn read_text(oracle: &dyn FileOracle, path: &str) -> io::Result<String> {
    let mut stream = oracle.open_stream(path, StreamMode::Text)?;
    let mut content = String::new();
    stream.read_to_string(&mut content).await?;
    Ok(content)
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{} is not in the package", path))
}

/// A package held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryPackage {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl MemoryPackage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, registering its parent directories.
    pub fn with_file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        let path = normalize_path(path);
        let mut parent = path.as_str();
        while let Some((dir, _)) = parent.rsplit_once('/') {
            self.dirs.insert(format!("{}/", dir));
            parent = dir;
        }
        self.files.insert(path, content.into());
        self
    }

    /// Adds an empty directory.
    pub fn with_dir(mut self, path: &str) -> Self {
        let path = normalize_path(path);
        let path = path.trim_end_matches('/');
        self.dirs.insert(format!("{}/", path));
        self
    }
}

impl FileOracle for MemoryPackage {
    fn exists(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.files.contains_key(&path) || self.dirs.contains(&path)
    }

    fn open_stream(&self, path: &str, mode: StreamMode) -> io::Result<PackageStream> {
        let path = normalize_path(path);
        let bytes = self.files.get(&path).ok_or_else(|| not_found(&path))?;
        let bytes = match mode {
            StreamMode::Binary => bytes.clone(),
            StreamMode::Text => strip_bom(bytes).to_vec(),
        };
        Ok(Box::pin(Cursor::new(bytes)))
    }

    fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self
            .files
            .keys()
            .chain(self.dirs.iter())
            .map(String::as_str)
            .collect();
        paths.sort_unstable();
        paths
    }
}

/// A package unpacked in a directory.
#[derive(Debug, Clone)]
pub struct DirectoryPackage {
    root: PathBuf,
    entries: BTreeSet<String>,
}

impl DirectoryPackage {
    /// Lists every file and directory below `root`.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, LinterError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(LinterError::file(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let mut entries = BTreeSet::new();
        for entry in WalkDir::new(&root).min_depth(1).follow_links(false) {
            let entry = entry.map_err(|e| LinterError::file(e.to_string()))?;
            let Ok(relative) = entry.path().strip_prefix(&root) else {
                continue;
            };
            let mut path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if entry.file_type().is_dir() {
                path.push('/');
            }
            entries.insert(path);
        }
        debug!("Listed {} entries in {}", entries.len(), root.display());

        Ok(Self { root, entries })
    }
}

impl FileOracle for DirectoryPackage {
    fn exists(&self, path: &str) -> bool {
        self.entries.contains(&normalize_path(path))
    }

    fn open_stream(&self, path: &str, mode: StreamMode) -> io::Result<PackageStream> {
        let path = normalize_path(path);
        if !self.entries.contains(&path) || path.ends_with('/') {
            return Err(not_found(&path));
        }
        let full_path = self.root.join(&path);
        match mode {
            StreamMode::Binary => {
                let file = std::fs::File::open(full_path)?;
                Ok(Box::pin(tokio::fs::File::from_std(file)))
            }
            StreamMode::Text => {
                let bytes = std::fs::read(full_path)?;
                Ok(Box::pin(Cursor::new(strip_bom(&bytes).to_vec())))
            }
        }
    }

    fn paths(&self) -> Vec<&str> {
        self.entries.iter().map(String::as_str).collect()
    }
}
