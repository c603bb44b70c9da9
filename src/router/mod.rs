//! Page routes and the navigation authorization gate.

mod route;
mod title;
mod gate;

pub use route::{normalize_path, AccessPolicy, Route, RouteTable};
pub use title::{DocumentTitle, TitleSink};
pub use gate::{
    post_login_target, AuthorizationGate, NavigationDecision, NavigationRequest, Redirect, DASHBOARD_PATH, LOGIN_PATH,
    REDIRECT_PARAM,
};
