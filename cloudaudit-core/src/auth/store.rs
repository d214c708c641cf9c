use std::{fmt, sync::Arc};

use cloudaudit_model::{Credential, ProjectRef, SessionId};
use dashmap::DashMap;

/// Cache key: credentials are scoped to a session and a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CredentialKey {
    pub session: SessionId,
    pub project: ProjectRef,
}

impl CredentialKey {
    pub fn new(session: SessionId, project: ProjectRef) -> Self {
        Self { session, project }
    }
}

/// Shared, mutable credential cache handed explicitly to every caller.
///
/// Writes are last-write-wins. Two jobs that both observe an expired token
/// may both refresh it; the later write simply replaces the earlier one.
#[derive(Clone, Default)]
pub struct CredentialStore {
    entries: Arc<DashMap<CredentialKey, Credential>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CredentialKey) -> Option<Credential> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Store `credential`, returning the one it replaced.
    pub fn put(
        &self,
        key: CredentialKey,
        credential: Credential,
    ) -> Option<Credential> {
        self.entries.insert(key, credential)
    }

    pub fn invalidate(&self, key: &CredentialKey) -> Option<Credential> {
        self.entries.remove(key).map(|(_, credential)| credential)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("entries", &self.entries.len())
            .finish()
    }
}
