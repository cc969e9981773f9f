//! On-disk layout of an archive root: store files, media directories, digests and exports.
//!
//! The root is an explicit value threaded through storage, media and digest code.

use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\-. ]").expect("valid filename pattern"));

/// Replaces every character outside word characters, dash, dot and space with `_`.
pub fn sanitize_filename(name: &str) -> String {
    UNSAFE_FILENAME_CHARS.replace_all(name, "_").into_owned()
}

/// Paths under one archive root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLayout {
    root: PathBuf,
}

impl ArchiveLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the root directory if missing.
    pub fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    /// Sanitized `<entity_id>_<display_name>` stem shared by the store and digest files.
    pub fn entity_stem(entity_id: i64, display_name: &str) -> String {
        sanitize_filename(&format!("{}_{}", entity_id, display_name))
    }

    pub fn store_path(&self, entity_id: i64, display_name: &str) -> PathBuf {
        self.root
            .join(format!("{}.db", Self::entity_stem(entity_id, display_name)))
    }

    pub fn media_dir(&self, entity_id: i64) -> PathBuf {
        self.root.join("media").join(entity_id.to_string())
    }

    pub fn digest_path(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{}.html", stem))
    }

    /// Digest over every entity in a store, kept apart from the single-entity digest.
    pub fn combined_digest_path(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{}_all.html", stem))
    }

    pub fn contacts_path(&self, phone: &str) -> PathBuf {
        self.root
            .join(format!("contacts_{}.csv", sanitize_filename(phone)))
    }

    pub fn entities_path(&self, phone: &str) -> PathBuf {
        self.root
            .join(format!("entities_{}.csv", sanitize_filename(phone)))
    }

    /// `path` relative to the root, for links inside digests. Paths outside the root are
    /// returned unchanged.
    pub fn relative_to_root(&self, path: &str) -> String {
        let candidate = Path::new(path);
        match candidate.strip_prefix(&self.root) {
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => path.to_string(),
        }
    }
}
