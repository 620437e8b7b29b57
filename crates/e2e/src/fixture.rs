//! Seeded folder/file listing served by the backend mock

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// Listing returned for read requests against the media API.
///
/// Serialises to the wire shape the application expects:
/// `{ "prefix": "", "folders": [{"key","name"}], "files": [{"key","url","type"}] }`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FixtureListing {
    /// Current path prefix
    #[serde(default)]
    pub prefix: String,

    #[serde(default)]
    pub folders: Vec<FolderDescriptor>,

    #[serde(default)]
    pub files: Vec<FileDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderDescriptor {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub key: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl FixtureListing {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    pub fn with_folder(mut self, key: impl Into<String>, name: impl Into<String>) -> Self {
        self.folders.push(FolderDescriptor {
            key: key.into(),
            name: name.into(),
        });
        self
    }

    pub fn with_file(mut self, key: impl Into<String>, url: impl Into<String>, kind: MediaKind) -> Self {
        self.files.push(FileDescriptor {
            key: key.into(),
            url: url.into(),
            kind,
        });
        self
    }

    /// One folder `folder1` and one image `image.png` at the root.
    pub fn drag_drop_sample() -> Self {
        Self::new("")
            .with_folder("folder1", "folder1")
            .with_file("image.png", "http://example.com/image.png", MediaKind::Image)
    }

    /// Keys must be unique across folders and files.
    pub fn validate(&self) -> E2eResult<()> {
        let mut seen = HashSet::new();
        let keys = self
            .folders
            .iter()
            .map(|f| f.key.as_str())
            .chain(self.files.iter().map(|f| f.key.as_str()));

        for key in keys {
            if !seen.insert(key) {
                return Err(E2eError::InvalidMock(format!(
                    "duplicate key '{}' in listing for prefix '{}'",
                    key, self.prefix
                )));
            }
        }
        Ok(())
    }

    /// Label the application gives a file tile: last path segment + " 預覽".
    pub fn preview_label(key: &str) -> String {
        let name = key.rsplit('/').next().unwrap_or(key);
        format!("{} 預覽", name)
    }
}
