//! Production collaborators: session file, backend client, profile cache.

use taskdeck_api::{ApiError, BackendClient};
use taskdeck_core::{
    Identity, ProfileCache, ProfileRecord, ProfileUpdate, SessionStore, StoreError, UserId,
};

use crate::ports::{AuthProvider, LocalProfiles, RemoteProfiles};

impl AuthProvider for SessionStore {
    type Error = StoreError;

    fn current_identity(&self) -> Result<Option<Identity>, StoreError> {
        self.load()
    }
}

impl RemoteProfiles for BackendClient {
    type Error = ApiError;

    fn fetch_profile(&self, identity: &Identity) -> Result<Option<ProfileRecord>, ApiError> {
        BackendClient::fetch_profile(self, identity)
    }

    fn update_profile(&self, identity: &Identity, update: &ProfileUpdate) -> Result<(), ApiError> {
        BackendClient::update_profile(self, identity, update).map(|_| ())
    }
}

impl LocalProfiles for ProfileCache {
    type Error = StoreError;

    fn get(&self, id: &UserId) -> Result<Option<ProfileRecord>, StoreError> {
        ProfileCache::get(self, id)
    }

    fn upsert(&self, record: &ProfileRecord) -> Result<(), StoreError> {
        ProfileCache::upsert(self, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[test]
    fn profile_cache_satisfies_local_store_contract() {
        let home = TempDir::new().unwrap();
        let cache = ProfileCache::at(home.path());
        let store: &dyn LocalProfiles<Error = StoreError> = &cache;

        let record = ProfileRecord {
            id: UserId::from("u1"),
            username: "jdoe".to_string(),
            display_name: "John Doe".to_string(),
            email: None,
            avatar_ref: None,
            updated_at: Utc.with_ymd_and_hms(2025, 1, 2, 10, 0, 0).unwrap(),
        };
        assert_eq!(store.get(&record.id).unwrap(), None);
        store.upsert(&record).unwrap();
        assert_eq!(store.get(&record.id).unwrap(), Some(record));
    }

    #[test]
    fn session_store_is_auth_provider() {
        let home = TempDir::new().unwrap();
        let session = SessionStore::at(home.path());
        assert_eq!(session.current_identity().unwrap(), None);
    }
}
