//! Job working directory
//!
//! A [`JobWorkspace`] is created fresh for one job. The executor removes it
//! with [`JobWorkspace::remove`] when the job ends; if the job future is
//! dropped first (panic, cancellation) the directory is removed on drop.

use std::path::{Path, PathBuf};
use tracing::{error, info};
use warden_core::domain::job::JobId;

pub struct JobWorkspace {
    path: PathBuf,
    removed: bool,
}

impl JobWorkspace {
    /// Creates `<base>/<job id>`, discarding leftovers from an earlier job
    /// with the same id
    pub async fn create(base: &Path, job_id: &JobId) -> std::io::Result<Self> {
        let path = base.join(job_id.as_str());

        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => info!("Removed stale work directory: {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        tokio::fs::create_dir_all(&path).await?;

        info!("Work directory created: {}", path.display());
        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the directory on the blocking pool
    pub async fn remove(mut self) {
        let result = tokio::fs::remove_dir_all(&self.path).await;
        self.removed = true;
        log_removal(&self.path, result);
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if !self.removed {
            log_removal(&self.path, std::fs::remove_dir_all(&self.path));
        }
    }
}

fn log_removal(path: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => info!("Work directory cleaned up: {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => error!("Failed to clean up work directory {}: {}", path.display(), e),
    }
}
