use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Role label carried on a profile record. Anything that is not `admin`
/// and not `user` is kept verbatim so custom roles still compare by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    #[default]
    User,
    Admin,
    Named(String),
}

impl Role {
    /// Map an optional profile label to a role; a missing label means `user`.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|s| s.trim()) {
            None | Some("") => Role::User,
            Some(s) if s.eq_ignore_ascii_case("user") => Role::User,
            Some(s) if s.eq_ignore_ascii_case("admin") => Role::Admin,
            Some(s) => Role::Named(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Named(s) => s.as_str(),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl From<String> for Role {
    fn from(s: String) -> Self { Role::from_label(Some(&s)) }
}

impl From<Role> for String {
    fn from(r: Role) -> Self { r.as_str().to_string() }
}

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserIdentity {
    pub fn new<S: Into<String>>(user_id: S) -> Self { Self { user_id: user_id.into(), email: None } }
}

/// Snapshot of the session state read by the gate for one navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Identity {
    #[default]
    SignedOut,
    SignedIn(UserIdentity),
}

impl Identity {
    pub fn is_signed_in(&self) -> bool { matches!(self, Identity::SignedIn(_)) }

    pub fn user(&self) -> Option<&UserIdentity> {
        match self {
            Identity::SignedIn(u) => Some(u),
            Identity::SignedOut => None,
        }
    }
}

impl From<Option<UserIdentity>> for Identity {
    fn from(u: Option<UserIdentity>) -> Self {
        match u {
            Some(u) => Identity::SignedIn(u),
            None => Identity::SignedOut,
        }
    }
}
