//! Navigation authorization gate.
//!
//! Every navigation is checked against the target route's access policy and a
//! fresh read of the identity provider. The gate owns no identity state: each
//! check subscribes, takes the first notification, and unsubscribes before
//! deciding. Internal failures become decisions (fail closed on protected
//! routes, fail open elsewhere) and are only logged.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::GateError;
use crate::identity::{AuthState, Identity, IdentityProvider, ProfileError, ProfileStore, ProviderFailure, Role};

use super::route::{AccessPolicy, Route, RouteTable};
use super::title::TitleSink;

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const REDIRECT_PARAM: &str = "redirect";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// Send the user to login, remembering where they were going.
    Login { destination: String },
    Dashboard { access_denied: bool },
}

impl Redirect {
    pub fn location(&self) -> String {
        match self {
            Redirect::Login { destination } => {
                format!("{}?{}={}", LOGIN_PATH, REDIRECT_PARAM, encode_query_value(destination))
            }
            Redirect::Dashboard { access_denied: false } => DASHBOARD_PATH.to_string(),
            Redirect::Dashboard { access_denied: true } => format!("{}?error=access_denied", DASHBOARD_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    Allow,
    RedirectTo(Redirect),
}

impl NavigationDecision {
    pub fn login<S: Into<String>>(destination: S) -> Self {
        NavigationDecision::RedirectTo(Redirect::Login { destination: destination.into() })
    }

    pub fn dashboard() -> Self { NavigationDecision::RedirectTo(Redirect::Dashboard { access_denied: false }) }

    pub fn access_denied() -> Self { NavigationDecision::RedirectTo(Redirect::Dashboard { access_denied: true }) }

    pub fn is_allow(&self) -> bool { matches!(self, NavigationDecision::Allow) }

    /// Where the browser should go instead, if anywhere.
    pub fn location(&self) -> Option<String> {
        match self {
            NavigationDecision::Allow => None,
            NavigationDecision::RedirectTo(r) => Some(r.location()),
        }
    }
}

/// Keep `/`, `:` and `@` literal so login URLs stay readable (`/login?redirect=/admin/users`).
fn encode_query_value(v: &str) -> String {
    urlencoding::encode(v).replace("%2F", "/").replace("%3A", ":").replace("%40", "@")
}

/// Where login should forward to after success, given the login page's query string.
/// Only same-site absolute paths are honored; anything else goes to the dashboard.
pub fn post_login_target(login_query: &str) -> String {
    let query = login_query.trim_start_matches('?');
    let target = query
        .split('&')
        .filter_map(|kv| kv.split_once('='))
        .find(|(k, _)| *k == REDIRECT_PARAM)
        .and_then(|(_, v)| urlencoding::decode(&v.replace('+', " ")).ok().map(|c| c.into_owned()));
    match target {
        Some(t) if t.starts_with('/') && !t.starts_with("//") && !t.contains('\\') => t,
        _ => DASHBOARD_PATH.to_string(),
    }
}

/// One navigation: the resolved target route, where the user is coming from,
/// and the full destination path including the query string.
#[derive(Debug, Clone)]
pub struct NavigationRequest {
    pub route: Route,
    pub from: String,
    pub destination: String,
}

impl NavigationRequest {
    pub fn new<S: Into<String>>(route: Route, from: S, destination: S) -> Self {
        Self { route, from: from.into(), destination: destination.into() }
    }

    /// Resolve `to` against the route table.
    pub fn resolve(table: &RouteTable, from: &str, to: &str) -> Self {
        Self::new(table.resolve(to).clone(), from, to)
    }
}

pub struct AuthorizationGate<S> {
    provider: Arc<dyn IdentityProvider>,
    profiles: S,
    title: Arc<dyn TitleSink>,
    generation: AtomicU64,
}

impl<S: ProfileStore> AuthorizationGate<S> {
    pub fn new(provider: Arc<dyn IdentityProvider>, profiles: S, title: Arc<dyn TitleSink>) -> Self {
        Self { provider, profiles, title, generation: AtomicU64::new(0) }
    }

    /// Generation of the most recent `navigate` call.
    pub fn generation(&self) -> u64 { self.generation.load(Ordering::SeqCst) }

    /// Wait for the provider's first notification, then release the listener.
    pub async fn resolve_identity(&self) -> Result<Identity, GateError> {
        let (tx, rx) = oneshot::channel::<AuthState>();
        let mut tx = Some(tx);
        let subscription = self.provider.subscribe(Box::new(move |state: AuthState| {
            if let Some(tx) = tx.take() {
                let _ = tx.send(state);
            }
        }))?;
        let first = rx.await;
        subscription.unsubscribe();
        match first {
            Ok(Ok(user)) => Ok(user.into()),
            Ok(Err(failure)) => Err(failure.into()),
            Err(_) => Err(ProviderFailure("listener released before first notification".into()).into()),
        }
    }

    /// Decide one navigation and apply the title side effect. No staleness check.
    pub async fn evaluate(&self, req: &NavigationRequest) -> NavigationDecision {
        let decision = self.decide(req).await;
        self.apply(req, &decision);
        decision
    }

    /// Like [`evaluate`](Self::evaluate), but a check overtaken by a newer
    /// `navigate` call is discarded: returns `None` and leaves the title alone.
    pub async fn navigate(&self, req: &NavigationRequest) -> Option<NavigationDecision> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let decision = self.decide(req).await;
        let latest = self.generation.load(Ordering::SeqCst);
        if latest != ticket {
            debug!(target: "gate", to = %req.destination, ticket, latest, "gate.superseded");
            return None;
        }
        self.apply(req, &decision);
        Some(decision)
    }

    async fn decide(&self, req: &NavigationRequest) -> NavigationDecision {
        let policy = &req.route.policy;
        let identity = match self.resolve_identity().await {
            Ok(identity) => identity,
            Err(e) => return self.on_failure(req, e),
        };

        if policy.is_protected() && !identity.is_signed_in() {
            debug!(target: "gate", to = %req.destination, route = %req.route.name, "gate.login_required");
            return NavigationDecision::login(req.destination.clone());
        }

        if *policy == AccessPolicy::GuestOnly && identity.is_signed_in() {
            debug!(target: "gate", to = %req.destination, route = %req.route.name, "gate.guest_only");
            return NavigationDecision::dashboard();
        }

        if let (AccessPolicy::RequiresRole(required), Identity::SignedIn(user)) = (policy, &identity) {
            let role = match self.profiles.get_profile(&user.user_id).await {
                Ok(profile) => profile.role(),
                Err(ProfileError::NotFound(_)) => Role::User,
                Err(e) => return self.on_failure(req, e.into()),
            };
            if role != *required {
                debug!(target: "gate", user_id = %user.user_id, %role, %required, "gate.policy_mismatch");
                return NavigationDecision::access_denied();
            }
        }

        NavigationDecision::Allow
    }

    fn on_failure(&self, req: &NavigationRequest, err: GateError) -> NavigationDecision {
        if req.route.policy.is_protected() {
            warn!(target: "gate", to = %req.destination, error = %err, "gate.fail_closed");
            NavigationDecision::login(req.destination.clone())
        } else {
            warn!(target: "gate", to = %req.destination, error = %err, "gate.fail_open");
            NavigationDecision::Allow
        }
    }

    fn apply(&self, req: &NavigationRequest, decision: &NavigationDecision) {
        if !decision.is_allow() { return; }
        if let Some(title) = req.route.title.as_deref() {
            self.title.set_title(title);
        }
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
