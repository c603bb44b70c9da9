use serde::{Deserialize, Serialize};

use crate::identity::Role;

/// Who may view a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "role", rename_all = "snake_case")]
pub enum AccessPolicy {
    Public,
    RequiresAuth,
    GuestOnly,
    RequiresRole(Role),
}

impl AccessPolicy {
    /// Protected routes need a signed-in user and fail closed.
    pub fn is_protected(&self) -> bool {
        matches!(self, AccessPolicy::RequiresAuth | AccessPolicy::RequiresRole(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    pub policy: AccessPolicy,
}

impl Route {
    pub fn new<S: Into<String>>(path: S, name: S, title: S, policy: AccessPolicy) -> Self {
        Self { path: path.into(), name: name.into(), title: Some(title.into()), policy }
    }
}

/// Strip fragment, query string and trailing slash. The root stays `/`.
pub fn normalize_path(full_path: &str) -> &str {
    let p = full_path.split('#').next().unwrap_or("");
    let p = p.split('?').next().unwrap_or("");
    let p = p.trim_end_matches('/');
    if p.is_empty() { "/" } else { p }
}

/// Ordered route list with a catch-all `NotFound` route for unmatched paths.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
    not_found: Route,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes,
            not_found: Route::new("/:pathMatch(.*)*", "NotFound", "NotFound - Global Plate", AccessPolicy::Public),
        }
    }

    pub fn with_not_found(mut self, route: Route) -> Self { self.not_found = route; self }

    /// First route whose path equals the normalized path, ignoring ASCII case; otherwise the catch-all.
    pub fn resolve(&self, full_path: &str) -> &Route {
        let path = normalize_path(full_path);
        self.routes
            .iter()
            .find(|r| normalize_path(&r.path).eq_ignore_ascii_case(path))
            .unwrap_or(&self.not_found)
    }

    pub fn by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().chain(std::iter::once(&self.not_found)).find(|r| r.name == name)
    }

    pub fn routes(&self) -> &[Route] { &self.routes }
}

impl Default for RouteTable {
    /// The Global Plate page routes.
    fn default() -> Self {
        use AccessPolicy::*;
        RouteTable::new(vec![
            Route::new("/", "Home", "Global Plate - A nutritional food community that connects international students with the world", Public),
            Route::new("/login", "Login", "Login - Global Plate", GuestOnly),
            Route::new("/register", "Register", "Register - Global Plate", GuestOnly),
            Route::new("/dashboard", "Dashboard", "Dashboard- Global Plate", RequiresAuth),
            Route::new("/recipes", "Recipes", "Recipes - Global Plate", Public),
            Route::new("/groups", "Groups", "Groups - Global Plate", RequiresAuth),
            Route::new("/events", "Events", "Events - Global Plate", Public),
            Route::new("/profile", "Profile", "Profile - Global Plate", RequiresAuth),
            Route::new("/admin", "Admin", "Admin - Global Plate", RequiresRole(Role::Admin)),
            Route::new("/admin/users", "AdminUsers", "User Management - Global Plate", RequiresRole(Role::Admin)),
        ])
    }
}

#[cfg(test)]
#[path = "route_tests.rs"]
mod tests;
