use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::errors::Error;

use super::Session;

/// Persistent client-side storage for the session.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<Session>, Error>;
    fn save(&self, session: &Session) -> Result<(), Error>;
    /// Removing an absent session is not an error.
    fn remove(&self) -> Result<(), Error>;
}

#[derive(Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<Session>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<Session>>, Error> {
        self.slot
            .lock()
            .map_err(|_| Error::Storage("memory storage lock poisoned".into()))
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Session>, Error> {
        Ok(self.slot()?.clone())
    }

    fn save(&self, session: &Session) -> Result<(), Error> {
        *self.slot()? = Some(session.clone());
        Ok(())
    }

    fn remove(&self) -> Result<(), Error> {
        *self.slot()? = None;
        Ok(())
    }
}

/// Stores the session as a JSON document on disk.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<Session>, Error> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, session: &Session) -> Result<(), Error> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        // readers never observe a partially written file
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec(session)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), Error> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
