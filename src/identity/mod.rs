//! Identity for the navigation gate: who is signed in, their session, and their profile role.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod session;
mod provider;
mod profile;

pub use principal::{Identity, Role, UserIdentity};
pub use session::{Session, SessionError, SessionToken, SessionManager};
pub use provider::{AuthState, IdentityListener, IdentityProvider, LocalIdentityProvider, ProviderFailure, Subscription};
pub use profile::{InMemoryProfileStore, Profile, ProfileError, ProfileStore};
