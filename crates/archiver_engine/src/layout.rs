use std::path::{Path, PathBuf};

pub const AUTHORS_DIR: &str = "authors";
pub const AUTHORS_FILE: &str = "authors.json";
pub const CATEGORIES_FILE: &str = "categories.json";
pub const POSTS_DIR: &str = "posts";
pub const META_FILE: &str = "meta.json";
pub const CONTENT_FILE: &str = "index.md";

/// Paths inside one site's archive root.
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

    pub fn authors_dir(&self) -> PathBuf {
        self.root.join(AUTHORS_DIR)
    }

    pub fn authors_file(&self) -> PathBuf {
        self.authors_dir().join(AUTHORS_FILE)
    }

    pub fn categories_file(&self) -> PathBuf {
        self.root.join(CATEGORIES_FILE)
    }

    pub fn post_dir(&self, local_id: &str) -> PathBuf {
        self.root.join(POSTS_DIR).join(local_id)
    }
}
