use anyhow::{bail, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// `$BDAY_HOME`, or `~/.bday`.
pub fn bday_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("BDAY_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".bday"))
}

pub fn ensure_bday_home() -> Result<PathBuf> {
    let dir = bday_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn outbox_path() -> Result<PathBuf> {
    Ok(ensure_bday_home()?.join("outbox.json"))
}

pub fn default_contacts_path() -> Result<PathBuf> {
    Ok(bday_home()?.join("contacts.csv"))
}

/// Cross-process guard so only one scheduling pass touches the outbox at a
/// time. Holds the owner's PID; removed on drop. A crash leaves the file
/// behind, and the error names the PID so a stale lock can be spotted.
#[derive(Debug)]
pub struct PassLock {
    path: PathBuf,
}

impl PassLock {
    pub fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join("schedule.lock");
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let lock = Self { path };
                writeln!(file, "{}", std::process::id())
                    .with_context(|| format!("write {}", lock.path.display()))?;
                Ok(lock)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let owner = fs::read_to_string(&path).unwrap_or_default();
                let owner = match owner.trim() {
                    "" => "unknown pid".to_string(),
                    pid => format!("pid {pid}"),
                };
                bail!(
                    "another scheduling pass ({owner}) holds {} (remove it if that process is not running)",
                    path.display()
                )
            }
            Err(e) => Err(e).with_context(|| format!("create {}", path.display())),
        }
    }
}

impl Drop for PassLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release schedule lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_is_exclusive_and_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let lock = PassLock::acquire(dir.path()).unwrap();
        assert!(PassLock::acquire(dir.path()).is_err());
        drop(lock);
        assert!(!dir.path().join("schedule.lock").exists());
        assert!(PassLock::acquire(dir.path()).is_ok());
    }

    #[test]
    fn lock_records_owner_pid() {
        let dir = tempfile::tempdir().unwrap();
        let _lock = PassLock::acquire(dir.path()).unwrap();
        let pid = std::process::id().to_string();

        let contents = fs::read_to_string(dir.path().join("schedule.lock")).unwrap();
        assert_eq!(contents.trim(), pid);

        let err = PassLock::acquire(dir.path()).unwrap_err().to_string();
        assert!(err.contains(&format!("pid {pid}")), "{err}");
    }

    #[test]
    fn leftover_lock_blocks_until_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedule.lock");
        fs::write(&path, "424242\n").unwrap();

        let err = PassLock::acquire(dir.path()).unwrap_err().to_string();
        assert!(err.contains("pid 424242"), "{err}");

        fs::remove_file(&path).unwrap();
        assert!(PassLock::acquire(dir.path()).is_ok());
    }
}
