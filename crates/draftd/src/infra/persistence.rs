use {
    anyhow::{Context, Result},
    model::Snapshot,
    std::path::{Path, PathBuf},
};

/// Gateway to the durable draft snapshot.
///
/// The snapshot is one small JSON document, so it lives in a single file
/// that is replaced atomically (write to a sibling temp file, then rename)
/// on every save. A crash between a save and the following broadcast only
/// costs observers a missed notification, never a lost transition.
#[derive(Clone, Debug)]
pub struct Snapshots {
    path: PathBuf,
}

impl Snapshots {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("draft.json"),
        }
    }

    /// Loads the last saved snapshot. `None` if no draft was ever persisted,
    /// in which case the caller falls back to pending defaults.
    pub async fn load(&self) -> Result<Option<Snapshot>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err).context("read draft snapshot"),
        };
        let snapshot = serde_json::from_slice(&raw).context("deserialize draft snapshot")?;
        Ok(Some(snapshot))
    }

    pub async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let raw = serde_json::to_vec_pretty(snapshot).context("serialize draft snapshot")?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw)
            .await
            .context("write draft snapshot")?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .context("replace draft snapshot")?;
        Ok(())
    }

    /// Drops the persisted snapshot. Missing file is fine, restarting a
    /// draft that was never saved is a no-op here.
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).context("remove draft snapshot"),
        }
    }
}
