use super::*;
use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use parking_lot::Mutex;

use crate::identity::{IdentityListener, LocalIdentityProvider, Profile, Subscription, UserIdentity};
use crate::router::DocumentTitle;

/// Provider spy: scripted state, counts subscribe/unsubscribe, can hold notifications back.
#[derive(Default)]
struct SpyInner {
    state: Mutex<Option<AuthState>>,
    refuse: Mutex<Option<String>>,
    hold: std::sync::atomic::AtomicBool,
    held: Mutex<Vec<(usize, IdentityListener)>>,
    subscribed: AtomicUsize,
    unsubscribed: AtomicUsize,
}

#[derive(Clone, Default)]
struct SpyProvider(Arc<SpyInner>);

impl SpyProvider {
    fn with_state(state: AuthState) -> Self {
        let p = SpyProvider::default();
        *p.0.state.lock() = Some(state);
        p
    }
    fn signed_out() -> Self { Self::with_state(Ok(None)) }
    fn signed_in(uid: &str) -> Self { Self::with_state(Ok(Some(UserIdentity::new(uid)))) }
    fn failing() -> Self { Self::with_state(Err(ProviderFailure("sdk rejected".into()))) }
    fn subscribed(&self) -> usize { self.0.subscribed.load(Ordering::SeqCst) }
    fn unsubscribed(&self) -> usize { self.0.unsubscribed.load(Ordering::SeqCst) }
    fn held(&self) -> usize { self.0.held.lock().len() }
    fn set_hold(&self, on: bool) { self.0.hold.store(on, Ordering::SeqCst); }
    fn flush(&self) {
        let state = self.0.state.lock().clone().unwrap_or(Ok(None));
        let pending: Vec<_> = self.0.held.lock().drain(..).collect();
        for (_, mut l) in pending { l(state.clone()); }
    }
}

impl IdentityProvider for SpyProvider {
    fn subscribe(&self, mut listener: IdentityListener) -> Result<Subscription, ProviderFailure> {
        if let Some(reason) = self.0.refuse.lock().clone() {
            return Err(ProviderFailure(reason));
        }
        let id = self.0.subscribed.fetch_add(1, Ordering::SeqCst);
        if self.0.hold.load(Ordering::SeqCst) {
            self.0.held.lock().push((id, listener));
        } else {
            let state = self.0.state.lock().clone().unwrap_or(Ok(None));
            listener(state);
        }
        let inner = self.0.clone();
        Ok(Subscription::new(move || {
            inner.unsubscribed.fetch_add(1, Ordering::SeqCst);
        }))
    }
}

#[derive(Default)]
struct FakeProfiles {
    profiles: Mutex<HashMap<String, Profile>>,
    down: Mutex<bool>,
}

impl FakeProfiles {
    fn with(uid: &str, role: &str) -> Arc<Self> {
        let p = FakeProfiles::default();
        p.profiles.lock().insert(uid.into(), Profile::new(uid).with_role(role));
        Arc::new(p)
    }
}

impl ProfileStore for FakeProfiles {
    async fn get_profile(&self, user_id: &str) -> Result<Profile, ProfileError> {
        if *self.down.lock() { return Err(ProfileError::Unavailable("connection reset".into())); }
        self.profiles.lock().get(user_id).cloned().ok_or_else(|| ProfileError::NotFound(user_id.into()))
    }
}

fn gate(provider: &SpyProvider, profiles: Arc<FakeProfiles>) -> (AuthorizationGate<Arc<FakeProfiles>>, Arc<DocumentTitle>) {
    let title = Arc::new(DocumentTitle::new());
    (AuthorizationGate::new(Arc::new(provider.clone()), profiles, title.clone()), title)
}

fn req(to: &str) -> NavigationRequest {
    NavigationRequest::resolve(&RouteTable::default(), "/", to)
}

#[tokio::test]
async fn public_routes_allow_signed_out_users() {
    let p = SpyProvider::signed_out();
    let (g, _) = gate(&p, Arc::new(FakeProfiles::default()));
    for to in ["/", "/recipes", "/events", "/nowhere"] {
        assert_eq!(g.evaluate(&req(to)).await, NavigationDecision::Allow, "{to}");
    }
}

#[tokio::test]
async fn requires_auth_redirects_to_login_with_exact_destination() {
    let p = SpyProvider::signed_out();
    let (g, _) = gate(&p, Arc::new(FakeProfiles::default()));
    for to in ["/dashboard", "/groups?tab=mine&page=2", "/profile"] {
        assert_eq!(g.evaluate(&req(to)).await, NavigationDecision::login(to));
    }
}

#[tokio::test]
async fn guest_only_redirects_signed_in_users_to_dashboard() {
    let p = SpyProvider::signed_in("u1");
    let (g, _) = gate(&p, Arc::new(FakeProfiles::default()));
    for to in ["/login", "/register"] {
        let d = g.evaluate(&req(to)).await;
        assert_eq!(d, NavigationDecision::dashboard());
        assert_eq!(d.location().as_deref(), Some("/dashboard"));
    }
}

#[tokio::test]
async fn guest_only_allows_signed_out_users() {
    let p = SpyProvider::signed_out();
    let (g, _) = gate(&p, Arc::new(FakeProfiles::default()));
    assert!(g.evaluate(&req("/login")).await.is_allow());
}

#[tokio::test]
async fn role_check_compares_profile_role() {
    let p = SpyProvider::signed_in("u1");
    let (g, _) = gate(&p, FakeProfiles::with("u1", "user"));
    assert_eq!(g.evaluate(&req("/admin")).await, NavigationDecision::access_denied());

    let (g, _) = gate(&p, FakeProfiles::with("u1", "admin"));
    assert_eq!(g.evaluate(&req("/admin")).await, NavigationDecision::Allow);
}

#[tokio::test]
async fn missing_profile_counts_as_user_role() {
    let p = SpyProvider::signed_in("u1");
    let (g, _) = gate(&p, Arc::new(FakeProfiles::default()));
    let d = g.evaluate(&req("/admin/users")).await;
    assert_eq!(d.location().as_deref(), Some("/dashboard?error=access_denied"));
}

#[tokio::test]
async fn profile_outage_fails_closed() {
    let p = SpyProvider::signed_in("u1");
    let profiles = FakeProfiles::with("u1", "admin");
    *profiles.down.lock() = true;
    let (g, _) = gate(&p, profiles);
    assert_eq!(g.evaluate(&req("/admin")).await, NavigationDecision::login("/admin"));
}

#[tokio::test]
async fn same_snapshot_gives_same_decision() {
    let p = SpyProvider::signed_in("u1");
    let (g, _) = gate(&p, FakeProfiles::with("u1", "user"));
    for to in ["/admin", "/login", "/dashboard", "/recipes"] {
        let a = g.evaluate(&req(to)).await;
        let b = g.evaluate(&req(to)).await;
        assert_eq!(a, b, "{to}");
    }
}

#[tokio::test]
async fn every_check_unsubscribes_exactly_once() {
    for p in [SpyProvider::signed_out(), SpyProvider::signed_in("u1"), SpyProvider::failing()] {
        let (g, _) = gate(&p, FakeProfiles::with("u1", "user"));
        for (i, to) in ["/recipes", "/dashboard", "/login", "/admin"].iter().enumerate() {
            let _ = g.evaluate(&req(to)).await;
            assert_eq!(p.subscribed(), i + 1);
            assert_eq!(p.unsubscribed(), i + 1);
        }
    }
}

#[tokio::test]
async fn refused_subscription_is_treated_as_provider_failure() {
    let p = SpyProvider::signed_in("u1");
    *p.0.refuse.lock() = Some("not initialised".into());
    let (g, _) = gate(&p, Arc::new(FakeProfiles::default()));
    assert!(g.evaluate(&req("/recipes")).await.is_allow());
    assert_eq!(g.evaluate(&req("/profile")).await, NavigationDecision::login("/profile"));
    assert_eq!(p.unsubscribed(), 0);
}

#[tokio::test]
async fn signed_out_admin_users_goes_to_login_with_redirect() {
    let p = SpyProvider::signed_out();
    let (g, _) = gate(&p, Arc::new(FakeProfiles::default()));
    let d = g.evaluate(&req("/admin/users")).await;
    assert_eq!(d.location().as_deref(), Some("/login?redirect=/admin/users"));
}

#[tokio::test]
async fn login_while_signed_in_goes_to_dashboard_for_any_role() {
    for role in ["user", "admin"] {
        let p = SpyProvider::signed_in("u1");
        let (g, _) = gate(&p, FakeProfiles::with("u1", role));
        let d = g.evaluate(&req("/login")).await;
        assert_eq!(d.location().as_deref(), Some("/dashboard"));
    }
}

#[tokio::test]
async fn provider_failure_fails_open_on_public_route() {
    let p = SpyProvider::failing();
    let (g, title) = gate(&p, Arc::new(FakeProfiles::default()));
    assert_eq!(g.evaluate(&req("/recipes")).await, NavigationDecision::Allow);
    assert_eq!(title.current(), "Recipes - Global Plate");
    assert!(g.evaluate(&req("/login")).await.is_allow());
}

#[tokio::test]
async fn provider_failure_fails_closed_on_admin_route() {
    let p = SpyProvider::failing();
    let (g, _) = gate(&p, Arc::new(FakeProfiles::default()));
    let d = g.evaluate(&req("/admin")).await;
    assert_eq!(d.location().as_deref(), Some("/login?redirect=/admin"));
}

#[tokio::test]
async fn title_only_changes_on_allow() {
    let p = SpyProvider::signed_out();
    let (g, title) = gate(&p, Arc::new(FakeProfiles::default()));
    g.evaluate(&req("/events")).await;
    g.evaluate(&req("/dashboard")).await;
    assert_eq!(title.history(), vec!["Events - Global Plate".to_string()]);
}

#[tokio::test]
async fn superseded_navigation_is_discarded() {
    let p = SpyProvider::signed_out();
    let (g, title) = gate(&p, Arc::new(FakeProfiles::default()));
    let g = Arc::new(g);

    p.set_hold(true);
    let first = tokio::spawn({
        let g = g.clone();
        async move { g.navigate(&req("/events")).await }
    });
    while p.held() == 0 { tokio::task::yield_now().await; }

    p.set_hold(false);
    let second = g.navigate(&req("/recipes")).await;
    assert_eq!(second, Some(NavigationDecision::Allow));
    assert_eq!(g.generation(), 2);

    p.flush();
    assert_eq!(first.await.unwrap(), None);
    assert_eq!(title.history(), vec!["Recipes - Global Plate".to_string()]);
    assert_eq!(p.unsubscribed(), 2);
}

#[tokio::test]
async fn local_provider_leaves_no_listeners_behind() {
    let provider = LocalIdentityProvider::default();
    let title = Arc::new(DocumentTitle::new());
    let g = AuthorizationGate::new(Arc::new(provider.clone()), Arc::new(FakeProfiles::default()), title);
    assert_eq!(g.evaluate(&req("/profile")).await, NavigationDecision::login("/profile"));
    provider.sign_in(UserIdentity::new("u9")).unwrap();
    assert!(g.evaluate(&req("/profile")).await.is_allow());
    assert_eq!(provider.listener_count(), 0);
}

#[test]
fn login_location_encodes_query_destination() {
    let d = NavigationDecision::login("/recipes?cuisine=thai&diet=vegan");
    assert_eq!(d.location().as_deref(), Some("/login?redirect=/recipes%3Fcuisine%3Dthai%26diet%3Dvegan"));
}

#[test]
fn post_login_target_round_trips_and_rejects_offsite() {
    let loc = NavigationDecision::login("/recipes?cuisine=thai&diet=vegan").location().unwrap();
    let query = loc.split_once('?').map(|(_, q)| q).unwrap();
    assert_eq!(post_login_target(query), "/recipes?cuisine=thai&diet=vegan");
    assert_eq!(post_login_target("?redirect=/admin/users"), "/admin/users");
    assert_eq!(post_login_target("redirect=//evil.example"), "/dashboard");
    assert_eq!(post_login_target("redirect=https%3A%2F%2Fevil.example"), "/dashboard");
    assert_eq!(post_login_target(""), "/dashboard");
}
