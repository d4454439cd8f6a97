// ── File-backed session store ──
//
// One JSON document per profile holding the bearer token, its expiry and
// the last identity used to log in. Writes replace the whole file.

use std::fs::OpenOptions;
use std::io::Write as _;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt as _, PermissionsExt as _};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use netdiag_core::{CachedCredentials, CoreError, SessionStore, StoredToken};

#[cfg(unix)]
const SESSION_FILE_MODE: u32 = 0o600;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<StoredToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    credentials: Option<CachedCredentials>,
}

/// [`SessionStore`] persisted as JSON at a fixed path.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<SessionFile, CoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SessionFile::default()),
            Err(e) => return Err(storage_error(&self.path, &e)),
        };
        // A corrupt file is treated as an empty session; the next write replaces it.
        Ok(serde_json::from_str(&text).unwrap_or_else(|e| {
            debug!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
            SessionFile::default()
        }))
    }

    /// Replace the file. It holds a bearer token, so it is owner-only
    /// (0600) on unix, including when an older, wider file is overwritten.
    fn write(&self, file: &SessionFile) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| storage_error(parent, &e))?;
        }
        let json = serde_json::to_string_pretty(file).map_err(|e| CoreError::Storage {
            message: e.to_string(),
        })?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(SESSION_FILE_MODE);

        let mut out = options
            .open(&self.path)
            .map_err(|e| storage_error(&self.path, &e))?;
        #[cfg(unix)]
        out.set_permissions(std::fs::Permissions::from_mode(SESSION_FILE_MODE))
            .map_err(|e| storage_error(&self.path, &e))?;
        out.write_all(json.as_bytes())
            .map_err(|e| storage_error(&self.path, &e))
    }

    fn update(&self, f: impl FnOnce(&mut SessionFile)) -> Result<(), CoreError> {
        let _guard = self.lock.lock();
        let mut file = self.read()?;
        f(&mut file);
        self.write(&file)
    }
}

fn storage_error(path: &Path, err: &std::io::Error) -> CoreError {
    CoreError::Storage {
        message: format!("{}: {err}", path.display()),
    }
}

impl SessionStore for FileSessionStore {
    fn load_token(&self) -> Result<Option<StoredToken>, CoreError> {
        Ok(self.read()?.token)
    }

    fn save_token(&self, token: &StoredToken) -> Result<(), CoreError> {
        self.update(|file| file.token = Some(token.clone()))
    }

    fn clear_token(&self) -> Result<(), CoreError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|file| file.token = None)
    }

    fn load_credentials(&self) -> Result<Option<CachedCredentials>, CoreError> {
        Ok(self.read()?.credentials)
    }

    fn save_credentials(&self, credentials: &CachedCredentials) -> Result<(), CoreError> {
        self.update(|file| file.credentials = Some(credentials.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;

    fn token() -> StoredToken {
        StoredToken {
            token: "tok".into(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    fn identity() -> CachedCredentials {
        CachedCredentials {
            host: "https://192.168.1.1".into(),
            username: "admin".into(),
            site: "default".into(),
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("none.json"));
        assert!(store.load_token().unwrap().is_none());
        assert!(store.load_credentials().unwrap().is_none());
        store.clear_token().unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn token_and_identity_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions").join("lab.json");
        let saved = token();
        {
            let store = FileSessionStore::new(&path);
            store.save_token(&saved).unwrap();
            store.save_credentials(&identity()).unwrap();
        }

        let store = FileSessionStore::new(&path);
        assert_eq!(store.load_token().unwrap(), Some(saved));
        assert_eq!(store.load_credentials().unwrap(), Some(identity()));
    }

    #[test]
    fn clearing_token_keeps_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("s.json"));
        store.save_token(&token()).unwrap();
        store.save_credentials(&identity()).unwrap();

        store.clear_token().unwrap();

        assert!(store.load_token().unwrap().is_none());
        assert_eq!(store.load_credentials().unwrap(), Some(identity()));
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = FileSessionStore::new(&path);

        assert!(store.load_token().unwrap().is_none());
        store.save_credentials(&identity()).unwrap();
        assert_eq!(store.load_credentials().unwrap(), Some(identity()));
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileSessionStore::new(&path);
        store.save_token(&token()).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let fresh = dir.path().join("fresh.json");
        FileSessionStore::new(&fresh).save_token(&token()).unwrap();
        let mode = std::fs::metadata(&fresh).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
