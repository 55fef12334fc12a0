use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;

const BACKUP_PREFIX: &str = "lc_tracker_";
const BACKUP_EXT: &str = "db";

/// Copy the database into `backup_dir` and prune to the newest `keep` copies.
/// Returns the new backup path, or `None` when there is no database yet.
pub fn backup_database(db_path: &Path, backup_dir: &Path, keep: usize) -> Result<Option<PathBuf>> {
    if !db_path.exists() {
        debug!(path = %db_path.display(), "no database file, skipping backup");
        return Ok(None);
    }

    fs::create_dir_all(backup_dir)?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let backup_path = backup_dir.join(format!("{}{}.{}", BACKUP_PREFIX, stamp, BACKUP_EXT));
    fs::copy(db_path, &backup_path)?;
    info!(path = %backup_path.display(), "database backed up");

    prune_backups(backup_dir, keep)?;
    Ok(Some(backup_path))
}

pub fn list_backups(backup_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut backups = Vec::new();
    for entry in fs::read_dir(backup_dir)? {
        let path = entry?.path();
        let is_backup = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(BACKUP_PREFIX) && n.ends_with(&format!(".{}", BACKUP_EXT)))
            .unwrap_or(false);
        if is_backup {
            backups.push(path);
        }
    }
    Ok(backups)
}

// Newest first by modification time; file name breaks ties since the stamp
// sorts chronologically.
fn prune_backups(backup_dir: &Path, keep: usize) -> Result<()> {
    let mut backups = Vec::new();
    for path in list_backups(backup_dir)? {
        let modified = fs::metadata(&path)?.modified()?;
        backups.push((modified, path));
    }
    backups.sort_by(|a, b| b.cmp(a));

    for (_, old) in backups.into_iter().skip(keep) {
        debug!(path = %old.display(), "removing old backup");
        if let Err(e) = fs::remove_file(&old) {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(e.into());
            }
        }
    }
    Ok(())
}
