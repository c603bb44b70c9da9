use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::principal::Role;

/// Profile record keyed by user id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl Profile {
    pub fn new<S: Into<String>>(user_id: S) -> Self { Self { user_id: user_id.into(), ..Default::default() } }

    pub fn with_role<S: Into<String>>(mut self, role: S) -> Self { self.role = Some(role.into()); self }

    pub fn role(&self) -> Role { Role::from_label(self.role.as_deref()) }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("no profile for user {0}")]
    NotFound(String),
    #[error("profile store unavailable: {0}")]
    Unavailable(String),
}

pub trait ProfileStore: Send + Sync {
    fn get_profile(&self, user_id: &str) -> impl Future<Output = Result<Profile, ProfileError>> + Send;
}

impl<T: ProfileStore + ?Sized> ProfileStore for Arc<T> {
    fn get_profile(&self, user_id: &str) -> impl Future<Output = Result<Profile, ProfileError>> + Send {
        (**self).get_profile(user_id)
    }
}

#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, Profile>>,
    outage: RwLock<Option<String>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self { Self::default() }

    pub fn put(&self, profile: Profile) -> Option<Profile> {
        self.profiles.write().insert(profile.user_id.clone(), profile)
    }

    pub fn remove(&self, user_id: &str) -> Option<Profile> { self.profiles.write().remove(user_id) }

    pub fn set_unavailable(&self, reason: Option<String>) { *self.outage.write() = reason; }
}

impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, user_id: &str) -> Result<Profile, ProfileError> {
        if let Some(reason) = self.outage.read().clone() {
            return Err(ProfileError::Unavailable(reason));
        }
        self.profiles
            .read()
            .get(user_id)
            .cloned()
            .ok_or_else(|| ProfileError::NotFound(user_id.to_string()))
    }
}
