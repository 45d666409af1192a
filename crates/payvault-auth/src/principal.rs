//! Principals and their stored credentials

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::authz::{self, Role};
use crate::error::Result;
use crate::hasher::CredentialHasher;

/// Numeric principal key; zero means "not bound to an account"
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PrincipalId(u64);

impl PrincipalId {
    /// Placeholder for a model not yet bound to an account
    pub const UNBOUND: Self = Self(0);

    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    pub fn is_bound(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PrincipalId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Descriptive identity of an employee account
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Role label, e.g. "HR", "IT" or "Employee"
    pub role: String,
}

impl Principal {
    pub fn new(
        id: u64,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            id: PrincipalId::new(id),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            role: role.into(),
        }
    }

    pub fn full_name(&self) -> String {
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => format!("{} {}", self.first_name, self.last_name),
            (false, true) => self.first_name.clone(),
            (true, false) => self.last_name.clone(),
            (true, true) => String::new(),
        }
    }

    /// Parsed role, `None` when the label is empty
    pub fn parsed_role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }

    pub fn is_admin(&self) -> bool {
        authz::is_admin(&self.role)
    }

    pub fn is_employee(&self) -> bool {
        authz::is_employee(&self.role)
    }
}

/// Stored credential for one principal
///
/// The salted hash is the only form of the password that ever leaves the
/// hasher. `Debug` output redacts it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    identifier: PrincipalId,
    salted_hash: String,
}

impl CredentialRecord {
    /// Wrap an existing `salt:hash` representation
    pub fn new(identifier: u64, salted_hash: impl Into<String>) -> Self {
        Self {
            identifier: PrincipalId::new(identifier),
            salted_hash: salted_hash.into(),
        }
    }

    /// Hash a plaintext password into a new record
    pub fn from_password(
        identifier: u64,
        password: &str,
        hasher: &CredentialHasher,
    ) -> Result<Self> {
        Ok(Self::new(identifier, hasher.hash_password(password)?))
    }

    pub fn identifier(&self) -> PrincipalId {
        self.identifier
    }

    pub fn salted_hash(&self) -> &str {
        &self.salted_hash
    }

    pub(crate) fn replace_hash(&mut self, salted_hash: String) {
        self.salted_hash = salted_hash;
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("identifier", &self.identifier)
            .field("salted_hash", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::HasherConfig;

    #[test]
    fn test_principal_id() {
        assert!(!PrincipalId::UNBOUND.is_bound());
        assert!(!PrincipalId::default().is_bound());
        assert!(PrincipalId::new(42).is_bound());
        assert_eq!(PrincipalId::from(42u64).to_string(), "42");
    }

    #[test]
    fn test_full_name() {
        let p = Principal::new(1, "ana@example.com", "Ana", "Reyes", "HR");
        assert_eq!(p.full_name(), "Ana Reyes");

        let p = Principal {
            last_name: String::new(),
            ..p
        };
        assert_eq!(p.full_name(), "Ana");
        assert_eq!(Principal::default().full_name(), "");
    }

    #[test]
    fn test_principal_roles() {
        let hr = Principal::new(1, "hr@example.com", "Ana", "Reyes", "HR");
        assert!(hr.is_admin());
        assert!(!hr.is_employee());
        assert_eq!(hr.parsed_role(), Some(Role::Hr));

        let staff = Principal::new(2, "staff@example.com", "Ben", "Cruz", "Employee");
        assert!(!staff.is_admin());
        assert!(staff.is_employee());
    }

    #[test]
    fn test_debug_redacts_hash() {
        let hasher = CredentialHasher::new(HasherConfig::low_cost());
        let record = CredentialRecord::from_password(7, "Abcdef1!", &hasher).unwrap();

        let debug = format!("{:?}", record);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(record.salted_hash()));
        assert!(hasher.verify_password("Abcdef1!", record.salted_hash()));
    }

    #[test]
    fn test_serialized_record_holds_no_plaintext() {
        let hasher = CredentialHasher::new(HasherConfig::low_cost());
        let record = CredentialRecord::from_password(7, "Abcdef1!", &hasher).unwrap();

        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("Abcdef1!"));

        let parsed: CredentialRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
