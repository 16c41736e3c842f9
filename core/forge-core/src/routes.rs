//! Application routes and path helpers.
//!
//! | Pattern              | View         | Access     |
//! |----------------------|--------------|------------|
//! | `/`                  | Home         | Public     |
//! | `/login`             | Login        | PublicOnly |
//! | `/register`          | Register     | PublicOnly |
//! | `/dashboard`         | Dashboard    | Protected  |
//! | `/profile`           | Profile      | Protected  |
//! | `/friends`           | Friends      | Protected  |
//! | `/messages`          | Messages     | Protected  |
//! | `/messages/:userId`  | Messages     | Protected  |
//! | `/achievements`      | Achievements | Protected  |
//! | `/practice`          | Practice     | Protected  |

use std::collections::BTreeMap;

use serde::Serialize;

pub const HOME_ROUTE: &str = "/";
pub const LOGIN_ROUTE: &str = "/login";
pub const REGISTER_ROUTE: &str = "/register";
pub const MESSAGES_ROUTE: &str = "/messages";

/// Redirect-after-login target when no last route is remembered.
pub const DEFAULT_LANDING_ROUTE: &str = "/dashboard";

/// Deep link to one conversation; valid independently of notifications.
pub fn messages_route(conversation_id: &str) -> String {
    format!("{}/{}", MESSAGES_ROUTE, conversation_id)
}

/// Canonical form of a location: query and fragment dropped, leading slash
/// ensured, duplicate and trailing slashes removed (except for root).
pub fn normalize_path(path: &str) -> String {
    let without_suffix = path
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim();
    let segments: Vec<&str> = without_suffix
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        HOME_ROUTE.to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// True for the views only anonymous users should see.
pub fn is_auth_entry_route(path: &str) -> bool {
    let normalized = normalize_path(path);
    normalized == LOGIN_ROUTE || normalized == REGISTER_ROUTE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAccess {
    Public,
    Protected,
    PublicOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Home,
    Login,
    Register,
    Dashboard,
    Profile,
    Friends,
    Messages,
    Achievements,
    Practice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub pattern: &'static str,
    pub view: View,
    pub access: RouteAccess,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteMatch {
    pub pattern: &'static str,
    pub view: View,
    pub access: RouteAccess,
    pub path: String,
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl Default for RouteTable {
    fn default() -> Self {
        use RouteAccess::{Protected, Public, PublicOnly};
        let entry = |pattern, view, access| RouteEntry {
            pattern,
            view,
            access,
        };
        Self::new(vec![
            entry(HOME_ROUTE, View::Home, Public),
            entry(LOGIN_ROUTE, View::Login, PublicOnly),
            entry(REGISTER_ROUTE, View::Register, PublicOnly),
            entry(DEFAULT_LANDING_ROUTE, View::Dashboard, Protected),
            entry("/profile", View::Profile, Protected),
            entry("/friends", View::Friends, Protected),
            entry(MESSAGES_ROUTE, View::Messages, Protected),
            entry("/messages/:userId", View::Messages, Protected),
            entry("/achievements", View::Achievements, Protected),
            entry("/practice", View::Practice, Protected),
        ])
    }
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// First entry whose pattern matches `path`, or None for unknown paths.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        let normalized = normalize_path(path);
        let segments: Vec<&str> = split_segments(&normalized);

        self.entries.iter().find_map(|entry| {
            let params = match_pattern(entry.pattern, &segments)?;
            Some(RouteMatch {
                pattern: entry.pattern,
                view: entry.view,
                access: entry.access,
                path: normalized.clone(),
                params,
            })
        })
    }
}

fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

fn match_pattern(pattern: &str, segments: &[&str]) -> Option<BTreeMap<String, String>> {
    let pattern_segments = split_segments(pattern);
    if pattern_segments.len() != segments.len() {
        return None;
    }

    let mut params = BTreeMap::new();
    for (expected, actual) in pattern_segments.iter().zip(segments) {
        match expected.strip_prefix(':') {
            Some(name) => {
                params.insert(name.to_string(), (*actual).to_string());
            }
            None if expected == actual => {}
            None => return None,
        }
    }
    Some(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_noise() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("friends/"), "/friends");
        assert_eq!(normalize_path("//messages//c1/?tab=media#top"), "/messages/c1");
    }

    #[test]
    fn auth_entry_routes_are_exact() {
        assert!(is_auth_entry_route("/login"));
        assert!(is_auth_entry_route("/register/?next=/friends"));
        assert!(!is_auth_entry_route("/dashboard"));
        assert!(!is_auth_entry_route("/profile/login-history"));
    }

    #[test]
    fn resolves_static_routes() {
        let table = RouteTable::default();
        let matched = table.resolve("/friends").unwrap();
        assert_eq!(matched.view, View::Friends);
        assert_eq!(matched.access, RouteAccess::Protected);
        assert!(matched.params.is_empty());

        assert_eq!(table.resolve("/").unwrap().access, RouteAccess::Public);
        assert_eq!(table.resolve("/login").unwrap().access, RouteAccess::PublicOnly);
    }

    #[test]
    fn resolves_conversation_deep_link() {
        let table = RouteTable::default();
        let matched = table.resolve(&messages_route("abc123")).unwrap();
        assert_eq!(matched.pattern, "/messages/:userId");
        assert_eq!(matched.params.get("userId").map(String::as_str), Some("abc123"));
    }

    #[test]
    fn unknown_paths_do_not_resolve() {
        let table = RouteTable::default();
        assert!(table.resolve("/settings").is_none());
        assert!(table.resolve("/messages/a/b").is_none());
    }
}
