//! Rooted project trees and the files they track.

use std::fs;
use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::debug;
use upkeep_crypto::{ContentHasher, HasherError};
use upkeep_types::Fingerprint;
use walkdir::WalkDir;

use crate::error::{TreeError, TreeResult};
use crate::path::{file_name_of, normalize};

/// Files and directories that never take part in identification or upgrade.
///
/// Gitignore syntax, matched case-insensitively at any depth.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    "modelindex.xml",
    "project.info.xml",
    "Bundle Manifests/",
    "deployment/",
    "bundleData.xml",
    "manifest.xml",
    "manifest.json",
    ".svn/",
    ".git/",
];

/// A file inside a project tree that is not excluded by the ignore rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedFile {
    /// Tree-relative path, `/`-separated.
    pub path: String,
    /// Location on disk.
    pub location: PathBuf,
}

impl TrackedFile {
    /// The last path segment.
    pub fn file_name(&self) -> &str {
        file_name_of(&self.path)
    }

    /// Whether the filename carries `suffix`, ignoring ASCII case.
    pub fn has_suffix(&self, suffix: &str) -> bool {
        let name = self.path.as_bytes();
        let suffix = suffix.as_bytes();
        name.len() >= suffix.len() && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
    }

    /// Read the file's bytes.
    pub fn read(&self) -> TreeResult<Vec<u8>> {
        fs::read(&self.location).map_err(|e| TreeError::io(&self.location, e))
    }

    /// Fingerprint the file's current bytes.
    pub fn fingerprint(&self) -> TreeResult<Fingerprint> {
        ContentHasher::FILE
            .hash_file(&self.location)
            .map_err(|err| match err {
                HasherError::Io(e) => TreeError::io(&self.location, e),
            })
    }
}

/// A directory tree with its ignore rules.
pub struct ProjectTree {
    root: PathBuf,
    ignore: Gitignore,
}

impl ProjectTree {
    /// Open an existing tree using [`DEFAULT_IGNORE_PATTERNS`].
    pub fn open(root: impl AsRef<Path>) -> TreeResult<Self> {
        Self::with_ignore_patterns(root, DEFAULT_IGNORE_PATTERNS)
    }

    /// Open an existing tree with a custom ignore set.
    pub fn with_ignore_patterns<S: AsRef<str>>(
        root: impl AsRef<Path>,
        patterns: &[S],
    ) -> TreeResult<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(TreeError::NotADirectory(root.to_path_buf()));
        }
        let root = fs::canonicalize(root).map_err(|e| TreeError::io(root, e))?;

        let mut builder = GitignoreBuilder::new(&root);
        builder
            .case_insensitive(true)
            .map_err(|e| TreeError::InvalidPattern(e.to_string()))?;
        for pattern in patterns {
            builder
                .add_line(None, pattern.as_ref())
                .map_err(|e| TreeError::InvalidPattern(e.to_string()))?;
        }
        let ignore = builder
            .build()
            .map_err(|e| TreeError::InvalidPattern(e.to_string()))?;
        Ok(Self { root, ignore })
    }

    /// Create the directory if needed, then open it.
    pub fn create<S: AsRef<str>>(root: impl AsRef<Path>, patterns: &[S]) -> TreeResult<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|e| TreeError::io(root, e))?;
        Self::with_ignore_patterns(root, patterns)
    }

    /// The canonical tree root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a path (relative or under the root) is excluded. Absolute
    /// paths outside the root are never excluded.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        let path = match path.strip_prefix(&self.root) {
            Ok(rel) => rel,
            Err(_) if path.has_root() => return false,
            Err(_) => path,
        };
        if path.as_os_str().is_empty() {
            return false;
        }
        self.ignore
            .matched_path_or_any_parents(path, is_dir)
            .is_ignore()
    }

    /// Every tracked file, sorted by path.
    pub fn tracked_files(&self) -> TreeResult<Vec<TrackedFile>> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !self.is_ignored(entry.path(), entry.file_type().is_dir()));
        for entry in walker {
            let entry = entry.map_err(|e| TreeError::Walk(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            files.push(self.tracked(entry.path())?);
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(root = %self.root.display(), count = files.len(), "tree walked");
        Ok(files)
    }

    /// Every file below `rel_dir`, ignore rules not applied. Missing
    /// directories yield nothing.
    pub fn files_under(&self, rel_dir: &str) -> TreeResult<Vec<TrackedFile>> {
        let Some(dir) = self.locate(rel_dir)? else {
            return Ok(Vec::new());
        };
        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).follow_links(false) {
            let entry = entry.map_err(|e| TreeError::Walk(e.to_string()))?;
            if entry.file_type().is_file() {
                files.push(self.tracked(entry.path())?);
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    fn tracked(&self, location: &Path) -> TreeResult<TrackedFile> {
        let rel = location
            .strip_prefix(&self.root)
            .map_err(|_| TreeError::OutsideTree(location.display().to_string()))?;
        Ok(TrackedFile {
            path: normalize(&rel.to_string_lossy())?,
            location: location.to_path_buf(),
        })
    }

    /// Where `rel` would live under the root, whether or not it exists.
    pub fn resolve(&self, rel: &str) -> TreeResult<PathBuf> {
        let rel = normalize(rel)?;
        Ok(rel.split('/').fold(self.root.clone(), |acc, part| acc.join(part)))
    }

    /// Find an existing entry for `rel`, matching each segment exactly or,
    /// failing that, ignoring ASCII case.
    pub fn locate(&self, rel: &str) -> TreeResult<Option<PathBuf>> {
        let rel = normalize(rel)?;
        let mut current = self.root.clone();
        for part in rel.split('/').filter(|p| !p.is_empty()) {
            let exact = current.join(part);
            if exact.exists() {
                current = exact;
                continue;
            }
            let Ok(entries) = fs::read_dir(&current) else {
                return Ok(None);
            };
            let found = entries
                .filter_map(Result::ok)
                .find(|e| e.file_name().to_string_lossy().eq_ignore_ascii_case(part));
            match found {
                Some(entry) => current = entry.path(),
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// The tracked-file handle for an existing file at `rel`.
    pub fn file(&self, rel: &str) -> TreeResult<Option<TrackedFile>> {
        match self.locate(rel)? {
            Some(location) if location.is_file() => Ok(Some(self.tracked(&location)?)),
            _ => Ok(None),
        }
    }

    /// Whether a file exists at `rel` (segment case ignored).
    pub fn exists(&self, rel: &str) -> TreeResult<bool> {
        Ok(self.file(rel)?.is_some())
    }

    /// Read the file at `rel`.
    pub fn read(&self, rel: &str) -> TreeResult<Vec<u8>> {
        let location = match self.locate(rel)? {
            Some(location) => location,
            None => self.resolve(rel)?,
        };
        fs::read(&location).map_err(|e| TreeError::io(location, e))
    }

    /// Write `bytes` to `rel`, creating parent directories. An existing file
    /// is overwritten in place, keeping its on-disk casing.
    pub fn write(&self, rel: &str, bytes: &[u8]) -> TreeResult<()> {
        let location = match self.locate(rel)? {
            Some(location) if location.is_file() => location,
            _ => self.resolve(rel)?,
        };
        if let Some(parent) = location.parent() {
            fs::create_dir_all(parent).map_err(|e| TreeError::io(parent, e))?;
        }
        fs::write(&location, bytes).map_err(|e| TreeError::io(location, e))
    }

    /// Copy the file at `rel` from `other` into this tree.
    pub fn copy_from(&self, other: &ProjectTree, rel: &str) -> TreeResult<()> {
        let bytes = other.read(rel)?;
        self.write(rel, &bytes)
    }
}

impl std::fmt::Debug for ProjectTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectTree")
            .field("root", &self.root)
            .field("ignore_rules", &self.ignore.num_ignores())
            .finish()
    }
}
