use std::path::PathBuf;
use tracing::debug;

use crate::RunError;

/// Name used when a draft yields no usable words
pub const DEFAULT_FILENAME: &str = "article.md";
const EXTENSION: &str = ".md";
const MAX_NAME_WORDS: usize = 6;

/// Derive a filesystem-safe file name from the opening words of a draft.
///
/// Keeps alphanumerics, spaces and hyphens, takes at most six words, joins
/// them with hyphens and lower-cases the result. Line breaks are dropped
/// rather than treated as separators, so words on adjacent lines fuse.
pub fn derive_filename(draft: &str) -> String {
    let kept: String = draft
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
        .collect();

    let stem = kept
        .trim_end()
        .split_whitespace()
        .take(MAX_NAME_WORDS)
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();

    if stem.chars().any(char::is_alphanumeric) {
        format!("{}{}", stem, EXTENSION)
    } else {
        DEFAULT_FILENAME.to_string()
    }
}

/// Writes the final draft into the output directory.
///
/// Writes truncate and overwrite in place; an interrupted write can leave a
/// partially written file behind.
#[derive(Debug, Clone)]
pub struct ArtifactPersister {
    output_dir: PathBuf,
}

impl ArtifactPersister {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Write `content` to `file_name` inside the output directory
    pub async fn persist(&self, file_name: &str, content: &str) -> Result<PathBuf, RunError> {
        let path = self.output_dir.join(file_name);
        debug!(path = %path.display(), bytes = content.len(), "Writing artifact");

        let to_error = |source| RunError::Persistence {
            path: path.clone(),
            source,
        };
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(to_error)?;
        tokio::fs::write(&path, content).await.map_err(to_error)?;

        Ok(path)
    }
}
