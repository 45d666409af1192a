//! Credential store seam
//!
//! The data-access layer owns accounts and their hashed credentials. The
//! core only needs to look a record up by principal and write back a
//! replaced hash, which is what [`CredentialStore`] captures. Two
//! implementations ship with the crate: an in-memory map and a JSON file.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};
use crate::principal::{CredentialRecord, Principal, PrincipalId};

/// Current on-disk format version
const STORE_VERSION: u32 = 1;

/// Lookup and write-back of principals and credential records
pub trait CredentialStore: Send + Sync {
    /// Find the credential record for a principal
    fn find_credential_record(&self, id: PrincipalId) -> Result<Option<CredentialRecord>>;

    /// Insert or replace a credential record
    fn save_credential_record(&self, record: &CredentialRecord) -> Result<()>;

    /// Find a principal by id
    fn find_principal(&self, id: PrincipalId) -> Result<Option<Principal>>;

    /// Find a principal by email, ignoring ASCII case and surrounding whitespace
    fn find_principal_by_email(&self, email: &str) -> Result<Option<Principal>>;

    /// Insert or replace a principal
    fn save_principal(&self, principal: &Principal) -> Result<()>;
}

/// Principals and credentials keyed by id
#[derive(Clone, Debug, Default)]
struct Accounts {
    principals: HashMap<PrincipalId, Principal>,
    credentials: HashMap<PrincipalId, CredentialRecord>,
}

impl Accounts {
    fn principal_by_email(&self, email: &str) -> Option<Principal> {
        let email = email.trim();
        if email.is_empty() {
            return None;
        }
        self.principals
            .values()
            .find(|p| p.email.trim().eq_ignore_ascii_case(email))
            .cloned()
    }

    fn check_principal(principal: &Principal) -> Result<()> {
        if !principal.id.is_bound() {
            return Err(AuthError::InvalidInput(
                "principal id must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    fn check_record(record: &CredentialRecord) -> Result<()> {
        if !record.identifier().is_bound() {
            return Err(AuthError::InvalidInput(
                "credential identifier must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// In-memory credential store
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    accounts: RwLock<Accounts>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Accounts>> {
        self.accounts
            .read()
            .map_err(|_| AuthError::Storage("credential store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Accounts>> {
        self.accounts
            .write()
            .map_err(|_| AuthError::Storage("credential store lock poisoned".to_string()))
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn find_credential_record(&self, id: PrincipalId) -> Result<Option<CredentialRecord>> {
        Ok(self.read()?.credentials.get(&id).cloned())
    }

    fn save_credential_record(&self, record: &CredentialRecord) -> Result<()> {
        Accounts::check_record(record)?;
        self.write()?
            .credentials
            .insert(record.identifier(), record.clone());
        Ok(())
    }

    fn find_principal(&self, id: PrincipalId) -> Result<Option<Principal>> {
        Ok(self.read()?.principals.get(&id).cloned())
    }

    fn find_principal_by_email(&self, email: &str) -> Result<Option<Principal>> {
        Ok(self.read()?.principal_by_email(email))
    }

    fn save_principal(&self, principal: &Principal) -> Result<()> {
        Accounts::check_principal(principal)?;
        self.write()?
            .principals
            .insert(principal.id, principal.clone());
        Ok(())
    }
}

/// Store file format (persisted to disk)
#[derive(Serialize, Deserialize)]
struct StoreFile {
    /// Version for future migrations
    version: u32,
    principals: Vec<Principal>,
    credentials: Vec<CredentialRecord>,
}

impl From<&Accounts> for StoreFile {
    fn from(accounts: &Accounts) -> Self {
        let mut principals: Vec<Principal> = accounts.principals.values().cloned().collect();
        principals.sort_by_key(|p| p.id);
        let mut credentials: Vec<CredentialRecord> =
            accounts.credentials.values().cloned().collect();
        credentials.sort_by_key(|c| c.identifier());

        Self {
            version: STORE_VERSION,
            principals,
            credentials,
        }
    }
}

impl From<StoreFile> for Accounts {
    fn from(file: StoreFile) -> Self {
        Self {
            principals: file.principals.into_iter().map(|p| (p.id, p)).collect(),
            credentials: file
                .credentials
                .into_iter()
                .map(|c| (c.identifier(), c))
                .collect(),
        }
    }
}

/// Credential store backed by a JSON file
///
/// The whole file is loaded on open and rewritten on every save, through a
/// temporary file and rename so a crash never leaves a truncated store.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    accounts: Mutex<Accounts>,
}

impl FileCredentialStore {
    /// Open the store at the default path
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path())
    }

    /// Get the default store path
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("payvault")
            .join("credentials.json")
    }

    /// Open a store file, creating parent directories; a missing file is an empty store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let accounts = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let file: StoreFile = serde_json::from_str(&contents).map_err(|e| {
                AuthError::Storage(format!("Failed to parse credential store: {}", e))
            })?;
            if file.version != STORE_VERSION {
                return Err(AuthError::Storage(format!(
                    "Unsupported credential store version {}",
                    file.version
                )));
            }
            Accounts::from(file)
        } else {
            Accounts::default()
        };

        tracing::debug!(
            "Opened credential store at {:?} ({} principals)",
            path,
            accounts.principals.len()
        );

        Ok(Self {
            path,
            accounts: Mutex::new(accounts),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Accounts>> {
        self.accounts
            .lock()
            .map_err(|_| AuthError::Storage("credential store lock poisoned".to_string()))
    }

    fn update(&self, apply: impl FnOnce(&mut Accounts)) -> Result<()> {
        let mut accounts = self.lock()?;
        let mut next = accounts.clone();
        apply(&mut next);
        self.write_file(&next)?;
        *accounts = next;
        Ok(())
    }

    fn write_file(&self, accounts: &Accounts) -> Result<()> {
        let contents = serde_json::to_string_pretty(&StoreFile::from(accounts))?;

        // Write atomically; the temp file is private before any hash lands in it
        let temp_path = self.path.with_extension("json.tmp");
        let mut file = create_private(&temp_path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

/// Create or truncate a file readable only by its owner (Unix only)
fn create_private(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        let file = options.open(path)?;
        // `mode` only applies on creation; tighten a leftover temp file too
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
        Ok(file)
    }
    #[cfg(not(unix))]
    {
        Ok(options.open(path)?)
    }
}

impl CredentialStore for FileCredentialStore {
    fn find_credential_record(&self, id: PrincipalId) -> Result<Option<CredentialRecord>> {
        Ok(self.lock()?.credentials.get(&id).cloned())
    }

    fn save_credential_record(&self, record: &CredentialRecord) -> Result<()> {
        Accounts::check_record(record)?;
        self.update(|accounts| {
            accounts
                .credentials
                .insert(record.identifier(), record.clone());
        })
    }

    fn find_principal(&self, id: PrincipalId) -> Result<Option<Principal>> {
        Ok(self.lock()?.principals.get(&id).cloned())
    }

    fn find_principal_by_email(&self, email: &str) -> Result<Option<Principal>> {
        Ok(self.lock()?.principal_by_email(email))
    }

    fn save_principal(&self, principal: &Principal) -> Result<()> {
        Accounts::check_principal(principal)?;
        self.update(|accounts| {
            accounts.principals.insert(principal.id, principal.clone());
        })
    }
}
