//! Canned HTTP responses for `curl`
//!
//! There is no real networking. `curl` answers from a table of per-host rules,
//! usually loaded from a JSON file shaped like:
//!
//! ```json
//! {
//!   "example.com": {
//!     "upgrade_http": true,
//!     "/": { "status": 200, "body": "hello" },
//!     "/old": { "status": 302, "redirect_to": "https://example.com/" },
//!     "/404": { "status": 404, "body": "nothing here" }
//!   }
//! }
//! ```
//!
//! Hosts without rules do not resolve.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};

/// Paths answered with a stock 404 on every host.
const RESERVED_PATHS: &[&str] = &["/403", "/404", "/500"];

/// One path's canned response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Route {
    /// HTTP status code
    #[serde(default = "default_status")]
    pub status: u16,
    /// Response headers; `Content-Type: text/plain` when absent
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    /// Response body
    #[serde(default)]
    pub body: String,
    /// Adds a `Location` header
    #[serde(default)]
    pub redirect_to: Option<String>,
}

fn default_status() -> u16 {
    200
}

impl Default for Route {
    fn default() -> Self {
        Self {
            status: default_status(),
            headers: None,
            body: String::new(),
            redirect_to: None,
        }
    }
}

impl Route {
    /// A route answering with `status` and an empty body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Set the body.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Answer with a `Location` header.
    pub fn redirect_to(mut self, location: impl Into<String>) -> Self {
        self.redirect_to = Some(location.into());
        self
    }
}

/// Rules for one host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HostRules {
    /// Answer plain `http` requests with a 301 to `https`
    #[serde(default)]
    pub upgrade_http: bool,
    /// Routes keyed by exact path
    #[serde(flatten)]
    pub routes: HashMap<String, Route>,
}

impl HostRules {
    /// Empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the http to https redirect.
    pub fn upgrade_http(mut self, upgrade: bool) -> Self {
        self.upgrade_http = upgrade;
        self
    }

    /// Add a route.
    pub fn route(mut self, path: impl Into<String>, route: Route) -> Self {
        self.routes.insert(path.into(), route);
        self
    }
}

/// A rendered HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: u16,
    /// Reason phrase after the code, if any
    pub reason: Option<&'static str>,
    /// Header lines in output order
    pub headers: Vec<(String, String)>,
    /// Body text; `None` ends the output after the blank line
    pub body: Option<String>,
}

impl Response {
    fn not_found() -> Self {
        Self {
            status: 404,
            reason: Some("Not Found"),
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: Some("404 Not Found".to_string()),
        }
    }

    /// The text `curl` prints.
    pub fn render(&self) -> String {
        let mut out = match self.reason {
            Some(reason) => format!("HTTP/1.1 {} {reason}\n", self.status),
            None => format!("HTTP/1.1 {}\n", self.status),
        };
        for (name, value) in &self.headers {
            out.push_str(&format!("{name}: {value}\n"));
        }
        out.push('\n');
        if let Some(body) = &self.body {
            out.push_str(body);
            out.push('\n');
        }
        out
    }
}

/// Per-host canned responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct NetworkOverrides {
    hosts: HashMap<String, HostRules>,
}

impl NetworkOverrides {
    /// No overrides: every host fails to resolve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the JSON override table.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Parse(format!("curl overrides: {e}")))
    }

    /// Add or replace the rules for `host`.
    pub fn host(mut self, host: impl Into<String>, rules: HostRules) -> Self {
        self.hosts.insert(host.into(), rules);
        self
    }

    /// True when no host has rules.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Answer a request, or `None` when the host does not resolve.
    pub fn respond(&self, scheme: &str, host: &str, path: &str) -> Option<Response> {
        if RESERVED_PATHS.contains(&path) {
            return Some(Response::not_found());
        }

        let rules = self.hosts.get(host)?;
        if scheme == "http" && rules.upgrade_http {
            return Some(Response {
                status: 301,
                reason: Some("Moved Permanently"),
                headers: vec![("Location".to_string(), format!("https://{host}{path}"))],
                body: None,
            });
        }

        let Some(route) = rules.routes.get(path).or_else(|| rules.routes.get("/404")) else {
            return Some(Response::not_found());
        };

        let mut status = route.status;
        let mut body = route.body.clone();
        if body.is_empty() && matches!(status, 403 | 500) {
            if let Some(error_route) = rules.routes.get(&format!("/{status}")) {
                status = error_route.status;
                body = error_route.body.clone();
            }
        }

        let mut headers: Vec<(String, String)> = match &route.headers {
            Some(headers) => headers.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            None => vec![("Content-Type".to_string(), "text/plain".to_string())],
        };
        if let Some(location) = &route.redirect_to {
            headers.push(("Location".to_string(), location.clone()));
        }

        Some(Response {
            status,
            reason: None,
            headers,
            body: Some(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> NetworkOverrides {
        NetworkOverrides::from_json(
            r#"{
                "example.com": {
                    "upgrade_http": true,
                    "/": { "body": "hello" },
                    "/old": { "status": 302, "redirect_to": "https://example.com/" },
                    "/secret": { "status": 403 },
                    "/403": { "status": 403, "body": "go away" }
                },
                "plain.test": {
                    "/": { "headers": { "X-Fake": "1" }, "body": "hi" }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_route_defaults() {
        let overrides = sample();
        let response = overrides.respond("https", "example.com", "/").unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(
            response.render(),
            "HTTP/1.1 200\nContent-Type: text/plain\n\nhello\n"
        );
    }

    #[test]
    fn test_upgrade_http() {
        let response = sample().respond("http", "example.com", "/x").unwrap();
        assert_eq!(
            response.render(),
            "HTTP/1.1 301 Moved Permanently\nLocation: https://example.com/x\n\n"
        );
    }

    #[test]
    fn test_redirect_and_error_routes() {
        let overrides = sample();
        let moved = overrides.respond("https", "example.com", "/old").unwrap();
        assert!(moved.render().contains("Location: https://example.com/\n"));

        let secret = overrides.respond("https", "example.com", "/secret").unwrap();
        assert_eq!(secret.status, 403);
        assert_eq!(secret.body.as_deref(), Some("go away"));
    }

    #[test]
    fn test_missing_route_and_reserved_paths() {
        let overrides = sample();
        let missing = overrides.respond("http", "plain.test", "/nope").unwrap();
        assert_eq!(
            missing.render(),
            "HTTP/1.1 404 Not Found\nContent-Type: text/plain\n\n404 Not Found\n"
        );

        let reserved = overrides.respond("https", "unknown.test", "/500").unwrap();
        assert_eq!(reserved.status, 404);
    }

    #[test]
    fn test_custom_headers_replace_default() {
        let response = sample().respond("http", "plain.test", "/").unwrap();
        assert_eq!(response.render(), "HTTP/1.1 200\nX-Fake: 1\n\nhi\n");
    }

    #[test]
    fn test_unknown_host_does_not_resolve() {
        assert!(sample().respond("https", "nowhere.test", "/").is_none());
        assert!(NetworkOverrides::new().is_empty());
    }

    #[test]
    fn test_builder() {
        let overrides = NetworkOverrides::new().host(
            "api.test",
            HostRules::new().route("/v1", Route::new(201).body("made").header("X-Id", "7")),
        );
        let response = overrides.respond("https", "api.test", "/v1").unwrap();
        assert_eq!(response.render(), "HTTP/1.1 201\nX-Id: 7\n\nmade\n");
    }

    #[test]
    fn test_invalid_json() {
        let err = NetworkOverrides::from_json("{ not json").unwrap_err();
        assert!(err.to_string().starts_with("parse error: curl overrides:"));
    }
}
