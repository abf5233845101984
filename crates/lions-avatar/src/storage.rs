use anyhow::Context;
use lions_types::{ForumError, ForumResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// URL prefix under which stored avatars are served.
pub const PUBLIC_PREFIX: &str = "/uploads/avatars";

/// On-disk avatar directory. One file per user, named after the user id;
/// a new upload silently replaces the old one.
pub struct AvatarStore {
    dir: PathBuf,
}

impl AvatarStore {
    pub async fn new(dir: PathBuf) -> anyhow::Result<Self> {
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating avatar directory {}", dir.display()))?;
        info!("Avatar directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(user_id: i64) -> String {
        format!("{}.jpg", user_id)
    }

    pub fn file_path(&self, user_id: i64) -> PathBuf {
        self.dir.join(Self::file_name(user_id))
    }

    /// Path recorded on the user and used by clients to fetch the image.
    pub fn public_path(user_id: i64) -> String {
        format!("{}/{}", PUBLIC_PREFIX, Self::file_name(user_id))
    }

    /// Write the encoded avatar and return its public path.
    pub async fn save(&self, user_id: i64, jpeg: &[u8]) -> ForumResult<String> {
        let path = self.file_path(user_id);
        fs::write(&path, jpeg)
            .await
            .with_context(|| format!("writing avatar {}", path.display()))
            .map_err(ForumError::Storage)?;
        info!("Stored avatar for user {} ({} bytes)", user_id, jpeg.len());
        Ok(Self::public_path(user_id))
    }
}
