//! Request population filter - injects a default `populate` directive into
//! read requests against the content API.
//!
//! Callers that pass their own `populate` always win; the filter only
//! supplies a default for requests that carry none.

use serde_json::{json, Map, Value};

use crate::inflect::singularize;
use crate::populate::{build_with, PopulateOptions};
use crate::types::Schema;

/// Query key holding the populate directive.
pub const POPULATE_KEY: &str = "populate";

/// Relation added for localized content types.
pub const LOCALIZATIONS_KEY: &str = "localizations";

/// An inbound request as seen by the filter.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRequest {
    pub method: String,
    pub url: String,
    /// Parsed query parameters; `populate` is written here.
    pub query: Map<String, Value>,
}

impl ContentRequest {
    /// Create a request, parsing the query string of `url` into `query`.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let query = parse_query(&url);
        Self {
            method: method.into(),
            url,
            query,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Set a query parameter (builder style).
    pub fn with_query(mut self, key: impl Into<String>, value: Value) -> Self {
        self.query.insert(key.into(), value);
        self
    }

    /// The populate directive currently attached to the request, if any.
    pub fn populate(&self) -> Option<&Value> {
        self.query.get(POPULATE_KEY)
    }

    /// Returns true if the caller already asked for a populate depth.
    ///
    /// `null`, `false`, and `""` count as absent; bracketed keys such as
    /// `populate[0]` count as present.
    pub fn has_explicit_populate(&self) -> bool {
        self.query.iter().any(|(key, value)| {
            if key == POPULATE_KEY {
                !matches!(value, Value::Null | Value::Bool(false))
                    && value.as_str().map_or(true, |s| !s.is_empty())
            } else {
                key.starts_with("populate[")
            }
        })
    }
}

/// Why a request was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Path is outside the content API prefix.
    NotApi,
    /// Method is not `GET`.
    NotRead,
    /// The request already carries a populate directive.
    ExplicitPopulate,
    /// Path targets an excluded endpoint.
    Excluded,
}

/// Result of running the filter over one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    Skipped(SkipReason),
    /// The resolved UID is not in the schema; request unchanged.
    UnknownContentType(String),
    /// `populate` was set for the resolved UID.
    Populated(String),
}

impl FilterOutcome {
    pub fn is_populated(&self) -> bool {
        matches!(self, FilterOutcome::Populated(_))
    }
}

/// Filter configuration.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Path prefix of the content API.
    pub api_prefix: String,
    /// Path fragments never auto-populated.
    pub excluded: Vec<String>,
    /// Path fragment whose requests never get `localizations` injected.
    pub unlocalized_marker: Option<String>,
    pub populate: PopulateOptions,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api/".to_string(),
            excluded: vec!["/api/users".to_string(), "/api/seo".to_string()],
            unlocalized_marker: Some("products".to_string()),
            populate: PopulateOptions::default(),
        }
    }
}

impl FilterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Add an excluded path fragment.
    pub fn exclude(mut self, fragment: impl Into<String>) -> Self {
        self.excluded.push(fragment.into());
        self
    }

    pub fn unlocalized_marker(mut self, marker: Option<String>) -> Self {
        self.unlocalized_marker = marker;
        self
    }

    pub fn populate_options(mut self, options: PopulateOptions) -> Self {
        self.populate = options;
        self
    }
}

/// Applies schema-derived populate directives to inbound read requests.
#[derive(Debug, Clone)]
pub struct PopulateFilter<'a> {
    schema: &'a Schema,
    config: FilterConfig,
}

impl<'a> PopulateFilter<'a> {
    pub fn new(schema: &'a Schema, config: FilterConfig) -> Self {
        Self { schema, config }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Run the filter over `request`, mutating its `populate` query in place.
    ///
    /// Never fails: unknown content types pass through with a warning.
    pub fn apply(&self, request: &mut ContentRequest) -> FilterOutcome {
        if let Some(reason) = self.skip_reason(request) {
            log::debug!(
                "[deep-populate] skipping {} {}: {:?}",
                request.method,
                request.url,
                reason
            );
            return FilterOutcome::Skipped(reason);
        }

        log::info!(
            "[deep-populate] populating {} {}",
            request.method,
            request.url
        );

        let uid = resolve_uid(&request.url, &self.config.api_prefix);
        let Some(content_type) = self.schema.get(&uid) else {
            log::warn!("[deep-populate] unknown content type: {}", uid);
            return FilterOutcome::UnknownContentType(uid);
        };

        let mut populate = build_with(self.schema, &uid, &self.config.populate).to_map();
        if content_type.is_localized() && !self.is_unlocalized_path(&request.url) {
            populate.insert(LOCALIZATIONS_KEY.to_string(), json!({ "populate": {} }));
        }

        request
            .query
            .insert(POPULATE_KEY.to_string(), Value::Object(populate));
        FilterOutcome::Populated(uid)
    }

    fn skip_reason(&self, request: &ContentRequest) -> Option<SkipReason> {
        if !request.url.starts_with(&self.config.api_prefix) {
            Some(SkipReason::NotApi)
        } else if !request.method.eq_ignore_ascii_case("GET") {
            Some(SkipReason::NotRead)
        } else if request.has_explicit_populate() {
            Some(SkipReason::ExplicitPopulate)
        } else if self
            .config
            .excluded
            .iter()
            .any(|fragment| request.url.contains(fragment.as_str()))
        {
            Some(SkipReason::Excluded)
        } else {
            None
        }
    }

    fn is_unlocalized_path(&self, url: &str) -> bool {
        match &self.config.unlocalized_marker {
            Some(marker) if !marker.is_empty() => url.contains(marker.as_str()),
            _ => false,
        }
    }
}

/// Resolve the content-type UID targeted by `url`.
///
/// Takes the first path segment after `api_prefix`, singularizes it, and
/// qualifies it: `/api/projects/abc?x=1` resolves to `api::project.project`.
pub fn resolve_uid(url: &str, api_prefix: &str) -> String {
    let rest = url.strip_prefix(api_prefix).unwrap_or(url);
    let segment = rest
        .trim_start_matches('/')
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let singular = singularize(segment);
    format!("api::{0}.{0}", singular)
}

// --- Internal implementation ---

fn parse_query(url: &str) -> Map<String, Value> {
    let Some((_, query)) = url.split_once('?') else {
        return Map::new();
    };
    let query = query.split('#').next().unwrap_or_default();

    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), Value::String(decode(value)))
        })
        .collect()
}

fn decode(component: &str) -> String {
    let plus_decoded = component.replace('+', " ");
    urlencoding::decode(&plus_decoded)
        .map(|s| s.into_owned())
        .unwrap_or(plus_decoded)
}
