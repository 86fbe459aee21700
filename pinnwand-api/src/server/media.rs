use axum::body::Bytes;
use pinnwand_common::model::{Id, user::UserMarker};
use std::path::PathBuf;
use thiserror::Error;
use time::UtcDateTime;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Writing the uploaded file failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Disk-backed blob store. Files land under `<root>/<user id>/` and are
/// served back at `<public base>/media/...`. Nothing ever deletes them; an
/// upload whose post never materializes stays orphaned.
#[derive(Clone, Debug)]
pub struct MediaStore {
    root: PathBuf,
    public_base_url: String,
}

impl MediaStore {
    #[must_use]
    pub fn new(root: PathBuf, public_base_url: String) -> Self {
        Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Stores the bytes and returns the public URL. The stored name is
    /// prefixed with the current time so repeated uploads of one file never
    /// collide.
    pub async fn store(
        &self,
        owner: Id<UserMarker>,
        file_name: &str,
        bytes: Bytes,
    ) -> Result<String, MediaError> {
        let name = format!(
            "{}_{}",
            UtcDateTime::now().unix_timestamp_nanos(),
            sanitize_file_name(file_name)
        );

        let dir = self.root.join(owner.to_string());
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&name), &bytes).await?;

        Ok(format!("{}/media/{owner}/{name}", self.public_base_url))
    }
}

/// Reduces a client-supplied filename to a single safe path component.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "upload".to_owned()
    } else {
        trimmed.to_owned()
    }
}
