use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;

/// Identity directory backed by a concurrent map. Seeded from settings for the
/// command-line tool and used as the user source in tests.
#[derive(Default)]
pub struct InMemoryIdentityDirectory {
    identities: DashMap<UserId, Identity>,
}

impl InMemoryIdentityDirectory {
    pub fn new() -> Self {
        Self {
            identities: DashMap::new(),
        }
    }

    pub fn from_identities(identities: impl IntoIterator<Item = Identity>) -> Self {
        let directory = Self::new();
        for identity in identities {
            directory.insert(identity);
        }
        directory
    }

    /// Insert or replace.
    pub fn insert(&self, identity: Identity) {
        self.identities.insert(identity.id, identity);
    }

    pub fn remove(&self, id: UserId) -> Option<Identity> {
        self.identities.remove(&id).map(|(_, identity)| identity)
    }
}

#[async_trait::async_trait]
impl IdentityDirectory for InMemoryIdentityDirectory {
    async fn get_identity(&self, id: UserId) -> Result<Option<Identity>, TokenError> {
        Ok(self.identities.get(&id).map(|entry| entry.value().clone()))
    }
}
