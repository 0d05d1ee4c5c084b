//! Collaborators consumed by the sync job runner.
//!
//! The runner is generic over these traits so tests can substitute fakes.
//! Production implementations live in [`crate::adapters`].

use taskdeck_core::{Identity, ProfileRecord, ProfileUpdate, UserId};

/// Source of the currently authenticated identity.
pub trait AuthProvider {
    type Error: std::error::Error + Send + Sync + 'static;

    /// `Ok(None)` when nobody is signed in.
    fn current_identity(&self) -> Result<Option<Identity>, Self::Error>;
}

/// The backend's copy of the profile.
pub trait RemoteProfiles {
    type Error: std::error::Error + Send + Sync + 'static;

    /// `Ok(None)` when the backend has no row for this user.
    fn fetch_profile(&self, identity: &Identity) -> Result<Option<ProfileRecord>, Self::Error>;

    /// Write the mutable fields for the authenticated user.
    fn update_profile(&self, identity: &Identity, update: &ProfileUpdate)
        -> Result<(), Self::Error>;
}

/// The local cache, keyed by user id with upsert semantics.
pub trait LocalProfiles {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get(&self, id: &UserId) -> Result<Option<ProfileRecord>, Self::Error>;

    /// Insert if absent, replace if present, as one atomic step.
    fn upsert(&self, record: &ProfileRecord) -> Result<(), Self::Error>;
}

impl<T: AuthProvider + ?Sized> AuthProvider for &T {
    type Error = T::Error;

    fn current_identity(&self) -> Result<Option<Identity>, Self::Error> {
        (**self).current_identity()
    }
}

impl<T: RemoteProfiles + ?Sized> RemoteProfiles for &T {
    type Error = T::Error;

    fn fetch_profile(&self, identity: &Identity) -> Result<Option<ProfileRecord>, Self::Error> {
        (**self).fetch_profile(identity)
    }

    fn update_profile(
        &self,
        identity: &Identity,
        update: &ProfileUpdate,
    ) -> Result<(), Self::Error> {
        (**self).update_profile(identity, update)
    }
}

impl<T: LocalProfiles + ?Sized> LocalProfiles for &T {
    type Error = T::Error;

    fn get(&self, id: &UserId) -> Result<Option<ProfileRecord>, Self::Error> {
        (**self).get(id)
    }

    fn upsert(&self, record: &ProfileRecord) -> Result<(), Self::Error> {
        (**self).upsert(record)
    }
}
