//! Navigation intents, resume paths, and the redirect orchestrator.
//!
//! SYSTEM CONTEXT
//! ==============
//! Guards decide; this module turns a decision into a location. A denied
//! unauthenticated visit becomes `/login?next=<original path>`, so the resume
//! path lives in the URL and survives a reload or an e-mail link round trip.
//! An unauthorized visit becomes `/` with nothing carried forward.

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use serde::Serialize;
use tokio::sync::watch;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";
/// Query parameter carrying the resume path on the login URL.
pub const RESUME_PARAM: &str = "next";
/// Query parameter a static host's 404 page uses to bounce deep links to `/`.
pub const DEEP_LINK_PARAM: &str = "p";

// =============================================================================
// INTENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Allow,
    Login,
    Home,
}

/// Outcome of a guard evaluation, consumed by whoever owns the location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationIntent {
    pub destination: Destination,
    /// Only set for `Login`: the pathname at the moment of denial.
    pub original_path: Option<String>,
}

impl NavigationIntent {
    #[must_use]
    pub fn allow() -> Self {
        Self { destination: Destination::Allow, original_path: None }
    }

    #[must_use]
    pub fn login(original_path: impl Into<String>) -> Self {
        Self { destination: Destination::Login, original_path: Some(original_path.into()) }
    }

    #[must_use]
    pub fn home() -> Self {
        Self { destination: Destination::Home, original_path: None }
    }

    #[must_use]
    pub fn preserves_original_path(&self) -> bool {
        self.destination == Destination::Login && self.original_path.is_some()
    }

    /// Redirect target for this intent, `None` when access is allowed.
    #[must_use]
    pub fn href(&self) -> Option<String> {
        match self.destination {
            Destination::Allow => None,
            Destination::Home => Some(HOME_PATH.to_owned()),
            Destination::Login => Some(
                self.original_path
                    .as_deref()
                    .map_or_else(|| LOGIN_PATH.to_owned(), login_href),
            ),
        }
    }
}

/// `/login?next=<encoded path>`.
#[must_use]
pub fn login_href(original_path: &str) -> String {
    format!("{LOGIN_PATH}?{RESUME_PARAM}={}", urlencoding::encode(original_path))
}

// =============================================================================
// LOCATION HELPERS
// =============================================================================

/// Strip query string and fragment from a location.
#[must_use]
pub fn pathname(location: &str) -> &str {
    location.find(['?', '#']).map_or(location, |idx| &location[..idx])
}

/// Decode the first value of `name` in the location's query string.
#[must_use]
pub fn query_param(location: &str, name: &str) -> Option<String> {
    let (_, query) = location.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key != name {
            return None;
        }
        urlencoding::decode(&value.replace('+', " "))
            .ok()
            .map(std::borrow::Cow::into_owned)
    })
}

/// Accept only same-origin absolute paths.
#[must_use]
pub fn sanitize_local_path(raw: &str) -> Option<String> {
    let path = raw.trim();
    if !path.starts_with('/') || path.starts_with("//") || path.starts_with("/\\") {
        return None;
    }
    if path.chars().any(char::is_control) {
        return None;
    }
    Some(path.to_owned())
}

/// Where a successful sign-in should land. A resume path pointing back at the
/// login page is ignored.
#[must_use]
pub fn resume_path(next: Option<&str>, default: &str) -> String {
    next.and_then(sanitize_local_path)
        .filter(|path| pathname(path) != LOGIN_PATH)
        .unwrap_or_else(|| default.to_owned())
}

/// `/?p=/reset-password` → `/reset-password`.
#[must_use]
pub fn restore_deep_link(location: &str) -> Option<String> {
    if pathname(location) != HOME_PATH {
        return None;
    }
    query_param(location, DEEP_LINK_PARAM).and_then(|path| sanitize_local_path(&path))
}

// =============================================================================
// ROUTE SCOPE
// =============================================================================

/// Path prefix a guard is mounted on. Matches whole segments only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteScope(String);

impl RouteScope {
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        let trimmed = prefix.trim_end_matches('/');
        if trimmed.is_empty() { Self(HOME_PATH.to_owned()) } else { Self(trimmed.to_owned()) }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn contains(&self, location: &str) -> bool {
        let path = pathname(location);
        if self.0 == HOME_PATH {
            return path.starts_with('/');
        }
        path.strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

// =============================================================================
// NAVIGATOR
// =============================================================================

/// Owns the current location and applies guard intents to it.
///
/// Guards only ever read the location through [`Navigator::location`]; the
/// navigator is the single writer.
pub struct Navigator {
    location: watch::Sender<String>,
}

impl Navigator {
    /// Start at `initial`, restoring a bounced deep link first.
    #[must_use]
    pub fn new(initial: &str) -> Self {
        let start = restore_deep_link(initial).unwrap_or_else(|| initial.to_owned());
        let (location, _) = watch::channel(start);
        Self { location }
    }

    #[must_use]
    pub fn location(&self) -> watch::Receiver<String> {
        self.location.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> String {
        self.location.borrow().clone()
    }

    pub fn push(&self, location: impl Into<String>) {
        let location = location.into();
        self.location.send_if_modified(|current| {
            if *current == location {
                return false;
            }
            *current = location;
            true
        });
    }

    /// Apply a guard's redirect. `Allow` leaves the location untouched.
    pub fn follow(&self, intent: &NavigationIntent) {
        if let Some(href) = intent.href() {
            tracing::debug!(from = %self.current(), to = %href, "guard redirect");
            self.push(href);
        }
    }
}
