//! Lookup of the image file associated with a record identifier.
//!
//! Resolution is deterministic and never substring based:
//!
//! 1. an artifact whose file name equals the identifier;
//! 2. an artifact whose file name equals the identifier's base name
//!    (identifiers may carry a `/` or `\` separated directory);
//! 3. an artifact whose file stem equals the identifier's stem.
//!
//! Within a tier the lexically smallest file name wins.

use crate::error::{Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions picked up by [`ArtifactIndex::scan_dir`].
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// An external artifact (image) that a record may refer to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactHandle {
    pub name: String,
    pub path: PathBuf,
}

/// Sorted set of known artifacts.
#[derive(Debug, Clone, Default)]
pub struct ArtifactIndex {
    artifacts: Vec<ArtifactHandle>,
}

impl ArtifactIndex {
    pub fn new(artifacts: impl IntoIterator<Item = ArtifactHandle>) -> Self {
        let mut artifacts: Vec<ArtifactHandle> = artifacts.into_iter().collect();
        artifacts.sort();
        Self { artifacts }
    }

    /// Index bare names, using each name as its path.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(|name| {
            let name = name.into();
            ArtifactHandle {
                path: PathBuf::from(&name),
                name,
            }
        }))
    }

    /// Index the image files directly inside `dir` (not recursive).
    pub fn scan_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let entries =
            std::fs::read_dir(dir).context(format!("Failed to read {}", dir.display()))?;

        let mut artifacts = Vec::new();
        for entry in entries {
            let path = entry
                .context(format!("Failed to read entry in {}", dir.display()))?
                .path();
            if !path.is_file() || !has_image_extension(&path) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                artifacts.push(ArtifactHandle {
                    name: name.to_string(),
                    path: path.clone(),
                });
            }
        }

        debug!("Indexed {} images in {}", artifacts.len(), dir.display());
        Ok(Self::new(artifacts))
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn artifacts(&self) -> &[ArtifactHandle] {
        &self.artifacts
    }

    /// Resolve the artifact for a record identifier.
    pub fn resolve(&self, identifier: &str) -> Option<&ArtifactHandle> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return None;
        }
        let base = base_name(identifier);
        let stem = file_stem(base);

        self.find(|a| a.name == identifier)
            .or_else(|| self.find(|a| a.name == base))
            .or_else(|| self.find(|a| file_stem(&a.name) == stem))
    }

    fn find(&self, predicate: impl Fn(&ArtifactHandle) -> bool) -> Option<&ArtifactHandle> {
        self.artifacts.iter().find(|a| predicate(a))
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Last path segment, accepting both separators.
fn base_name(identifier: &str) -> &str {
    identifier
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(identifier)
}

/// Name without its final extension; dotfiles keep their name.
fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}
