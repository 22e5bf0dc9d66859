// File: src/storage.rs
use crate::model::Session;
use crate::paths::AppPaths;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[cfg(not(target_os = "android"))]
use fs2::FileExt;

/// Process-wide holder of the current session.
///
/// Implementations must replace or remove the whole `Session` in one step so that
/// a token is never visible without its user id (or the other way round).
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Option<Session>;
    fn store(&self, session: &Session) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    session: Mutex<Option<Session>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<Session> {
        self.session.lock().ok().and_then(|guard| guard.clone())
    }

    fn store(&self, session: &Session) -> Result<()> {
        let mut guard = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("credential store poisoned"))?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("credential store poisoned"))?;
        *guard = None;
        Ok(())
    }
}

/// Keeps the session as JSON in the app's private data directory.
pub struct FileCredentialStore {
    path: PathBuf,
    // Serializes access inside the process; the file lock covers other processes.
    guard: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            guard: Mutex::new(()),
        }
    }

    /// Store at the default location (`session.json` in the data dir).
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(AppPaths::get_session_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `session.json` locks through `session.json.lock`.
    #[cfg(not(target_os = "android"))]
    fn get_lock_path(file_path: &Path) -> PathBuf {
        let mut lock_path = file_path.to_path_buf();
        if let Some(ext) = lock_path.extension() {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".lock");
            lock_path.set_extension(new_ext);
        } else {
            lock_path.set_extension("lock");
        }
        lock_path
    }

    /// Runs `f` under the process mutex and, off Android, an exclusive lock on the sidecar file.
    fn with_lock<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let _held = self
            .guard
            .lock()
            .map_err(|_| anyhow::anyhow!("credential store poisoned"))?;

        // The lock file and the session file share this directory.
        if let Some(parent) = self.path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        #[cfg(target_os = "android")]
        {
            f()
        }

        #[cfg(not(target_os = "android"))]
        {
            let lock_path = Self::get_lock_path(&self.path);
            let file = fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&lock_path)?;

            file.lock_exclusive()?;
            let result = f();
            file.unlock()?;
            result
        }
    }

    fn atomic_write<C: AsRef<[u8]>>(path: &Path, contents: C) -> Result<()> {
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    fn read(&self) -> Result<Option<Session>> {
        self.with_lock(|| {
            if !self.path.exists() {
                return Ok(None);
            }
            let json = fs::read_to_string(&self.path)?;
            let session = serde_json::from_str::<Session>(&json)?;
            Ok(Some(session))
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Option<Session> {
        match self.read() {
            Ok(session) => session,
            Err(e) => {
                log::warn!("Ignoring unreadable session file {:?}: {}", self.path, e);
                None
            }
        }
    }

    fn store(&self, session: &Session) -> Result<()> {
        self.with_lock(|| {
            let json = serde_json::to_string_pretty(session)?;
            Self::atomic_write(&self.path, json)
        })
    }

    fn clear(&self) -> Result<()> {
        self.with_lock(|| {
            if self.path.exists() {
                fs::remove_file(&self.path)?;
            }
            Ok(())
        })
    }
}
