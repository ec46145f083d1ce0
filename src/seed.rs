//! Content seeding over the content REST API.
//!
//! Every write is an idempotent upsert: look the record up by a natural key
//! (slug, username, or any field), update it when found, create it otherwise.
//! Lookups fall back from a filtered query to a full listing, and a create that
//! trips a unique constraint falls back to searching for the existing record.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{SchemaError, SeedError};
use crate::loader::read_file;

/// Default timeout for HTTP requests (10 seconds).
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_BASE_URL: &str = "http://localhost:1337";
pub const DEFAULT_LOCALE: &str = "fr";

/// Fields the CMS manages itself; never sent on create or update.
pub const SYSTEM_FIELDS: &[&str] = &[
    "id",
    "documentId",
    "createdAt",
    "updatedAt",
    "publishedAt",
    "createdBy",
    "updatedBy",
];

/// Fields tried, in order, to find a record after a unique-constraint violation.
const FALLBACK_KEYS: &[&str] = &["slug", "username", "name"];

/// Connection settings for the content API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedConfig {
    pub base_url: String,
    /// API token sent as a bearer token.
    pub token: Option<String>,
    /// Locale used for localized collections and single types.
    pub locale: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl SeedConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Read `STRAPI_URL` (or `API_URL`), `STRAPI_TOKEN`, and `SEED_LOCALE`.
    ///
    /// Unset or empty variables fall back to [`DEFAULT_BASE_URL`], no token,
    /// and [`DEFAULT_LOCALE`].
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let base_url = var("STRAPI_URL")
            .or_else(|| var("API_URL"))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let locale = var("SEED_LOCALE").unwrap_or_else(|| DEFAULT_LOCALE.to_string());

        Self::new(base_url).token(var("STRAPI_TOKEN")).locale(locale)
    }

    pub fn warn_if_anonymous(&self) {
        if self.token.is_none() {
            log::warn!("[seed] missing STRAPI_TOKEN; requests are sent without authorization");
        }
    }
}

/// Blocking client performing find-or-create-or-update calls.
#[derive(Debug, Clone)]
pub struct SeedClient {
    config: SeedConfig,
    http: Client,
}

impl SeedClient {
    /// # Errors
    ///
    /// Returns `SeedError::Network` if the HTTP client cannot be built.
    pub fn new(config: SeedConfig) -> Result<Self, SeedError> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|source| SeedError::Network {
                url: config.base_url.clone(),
                source,
            })?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &SeedConfig {
        &self.config
    }

    /// Fetch the first record of `collection` matching `filters`.
    ///
    /// Drafts are included. A non-success status is logged and reads as `None`.
    pub fn get_one(
        &self,
        collection: &str,
        filters: &[(&str, &str)],
        locale: Option<&str>,
    ) -> Result<Option<Value>, SeedError> {
        let url = self.url(collection);
        let builder = self
            .request(Method::GET, &url, locale)
            .query(filters)
            .query(&[("publicationState", "preview"), ("pagination[pageSize]", "1")]);
        let response = self.send(builder, &url)?;

        if !response.status().is_success() {
            let status = response.status();
            log::warn!(
                "[seed] getOne {} failed: {} {}",
                collection,
                status.as_u16(),
                truncate(&response.text().unwrap_or_default())
            );
            return Ok(None);
        }

        Ok(match read_data(response, &url)? {
            Value::Array(items) => items.into_iter().next(),
            Value::Null => None,
            other => Some(other),
        })
    }

    /// Fetch up to 1000 records of `collection`, drafts included.
    pub fn list_all(&self, collection: &str, locale: Option<&str>) -> Result<Vec<Value>, SeedError> {
        let url = self.url(collection);
        let builder = self
            .request(Method::GET, &url, locale)
            .query(&[("publicationState", "preview"), ("pagination[pageSize]", "1000")]);
        let response = self.send(builder, &url)?;

        if !response.status().is_success() {
            let status = response.status();
            log::warn!(
                "[seed] listAll {} failed: {} {}",
                collection,
                status.as_u16(),
                truncate(&response.text().unwrap_or_default())
            );
            return Ok(Vec::new());
        }

        Ok(match read_data(response, &url)? {
            Value::Array(items) => items,
            _ => Vec::new(),
        })
    }

    /// Create a record.
    ///
    /// A 400 mentioning a unique constraint means the record exists but was not
    /// found by the lookup; the existing record is searched for by slug,
    /// username, then name. `None` means it could not be found.
    pub fn create_one(
        &self,
        collection: &str,
        data: &Value,
        locale: Option<&str>,
    ) -> Result<Option<Value>, SeedError> {
        let url = self.url(collection);
        let builder = self
            .request(Method::POST, &url, locale)
            .json(&json!({ "data": strip_system_fields(data) }));
        let response = self.send(builder, &url)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            if status == StatusCode::BAD_REQUEST && body.contains("unique") {
                log::warn!(
                    "[seed] create {} hit a unique constraint, searching for existing record",
                    collection
                );
                return Ok(self.find_existing(collection, data, locale));
            }
            return Err(SeedError::Status {
                method: "POST",
                collection: collection.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(Some(read_data(response, &url)?))
    }

    /// Update record `id`; a 404 falls back to creating it.
    pub fn update_one(
        &self,
        collection: &str,
        id: u64,
        data: &Value,
        locale: Option<&str>,
    ) -> Result<Option<Value>, SeedError> {
        let url = self.url(&format!("{}/{}", collection, id));
        let sanitized = strip_system_fields(data);
        let builder = self
            .request(Method::PUT, &url, locale)
            .json(&json!({ "data": sanitized }));
        let response = self.send(builder, &url)?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            log::warn!(
                "[seed] update {}#{} returned 404; creating instead",
                collection,
                id
            );
            return self.create_one(collection, &sanitized, locale);
        }
        if !status.is_success() {
            return Err(SeedError::Status {
                method: "PUT",
                collection: format!("{}#{}", collection, id),
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        Ok(Some(read_data(response, &url)?))
    }

    /// Upsert the record whose `field` equals `value`; returns its id.
    ///
    /// Existing attributes are merged under `data` before updating.
    pub fn upsert_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        data: &Value,
        locale: Option<&str>,
    ) -> Result<Option<u64>, SeedError> {
        let filter = format!("filters[{}][$eq]", field);
        let mut existing = self.get_one(collection, &[(filter.as_str(), value)], locale)?;
        if existing.is_none() {
            // Filtered lookups can 400 on some field types; scan the listing instead.
            existing = self
                .list_all(collection, locale)?
                .into_iter()
                .find(|entry| field_equals(entry, field, value));
        }

        if let Some(existing) = existing {
            if let Some(id) = record_id(&existing) {
                log::info!(
                    "[seed] updating existing {} with {}: {}",
                    collection,
                    field,
                    value
                );
                let merged = merge(attributes_of(&existing), data);
                let updated = self.update_one(collection, id, &merged, locale)?;
                return Ok(updated.as_ref().and_then(record_id));
            }
        }

        log::info!("[seed] creating new {} with {}: {}", collection, field, value);
        let created = self.create_one(collection, data, locale)?;
        Ok(created.as_ref().and_then(record_id))
    }

    pub fn upsert_by_slug(
        &self,
        collection: &str,
        slug: &str,
        data: &Value,
        locale: Option<&str>,
    ) -> Result<Option<u64>, SeedError> {
        self.upsert_by_field(collection, "slug", slug, data, locale)
    }

    pub fn upsert_by_username(
        &self,
        collection: &str,
        username: &str,
        data: &Value,
    ) -> Result<Option<u64>, SeedError> {
        self.upsert_by_field(collection, "username", username, data, None)
    }

    /// Fetch a single type; `None` when it does not exist yet.
    pub fn get_single(&self, uid: &str, locale: Option<&str>) -> Result<Option<Value>, SeedError> {
        let url = self.url(uid);
        let response = self.send(self.request(Method::GET, &url, locale), &url)?;
        if !response.status().is_success() {
            return Ok(None);
        }
        Ok(match read_data(response, &url)? {
            Value::Null => None,
            other => Some(other),
        })
    }

    /// Write a single type: update first, create on 404.
    pub fn set_single(
        &self,
        uid: &str,
        data: &Value,
        locale: Option<&str>,
    ) -> Result<Value, SeedError> {
        let url = self.url(uid);
        let body = json!({ "data": data });
        let mut response = self.send(
            self.request(Method::PUT, &url, locale).json(&body),
            &url,
        )?;
        if response.status() == StatusCode::NOT_FOUND {
            response = self.send(
                self.request(Method::POST, &url, locale).json(&body),
                &url,
            )?;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(SeedError::Status {
                method: "PUT",
                collection: uid.to_string(),
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        read_data(response, &url)
    }

    fn find_existing(&self, collection: &str, data: &Value, locale: Option<&str>) -> Option<Value> {
        let existing = match self.list_all(collection, locale) {
            Ok(existing) => existing,
            Err(e) => {
                log::warn!("[seed] search failed for {}: {}", collection, e);
                return None;
            }
        };
        log::debug!("[seed] got {} existing {} records", existing.len(), collection);

        for key in FALLBACK_KEYS {
            let Some(value) = data.get(*key).and_then(Value::as_str) else {
                continue;
            };
            if let Some(found) = existing.iter().find(|entry| field_equals(entry, key, value)) {
                log::info!("[seed] found existing {} with {}: {}", collection, key, value);
                return Some(found.clone());
            }
        }

        log::warn!(
            "[seed] could not find existing record after unique violation; skipping {} creation",
            collection
        );
        None
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, url: &str, locale: Option<&str>) -> RequestBuilder {
        let mut builder = self.http.request(method, url);
        if let Some(token) = &self.config.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(locale) = locale {
            builder = builder.query(&[("locale", locale)]);
        }
        builder
    }

    fn send(&self, builder: RequestBuilder, url: &str) -> Result<Response, SeedError> {
        builder.send().map_err(|source| SeedError::Network {
            url: url.to_string(),
            source,
        })
    }
}

/// Remove CMS-managed fields from a payload. Non-objects pass through.
pub fn strip_system_fields(data: &Value) -> Value {
    match data {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !SYSTEM_FIELDS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Lowercase ASCII slug: diacritics transliterated, other runs collapsed to `-`.
pub fn slugify(input: &str) -> String {
    let ascii = deunicode::deunicode(input).to_ascii_lowercase();
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Record id, from `id`.
pub fn record_id(entry: &Value) -> Option<u64> {
    entry.get("id").and_then(Value::as_u64)
}

/// Attributes of a record, flat or nested under `attributes`.
fn attributes_of(entry: &Value) -> &Value {
    match entry.get("attributes") {
        Some(attributes) if attributes.is_object() => attributes,
        _ => entry,
    }
}

fn field_equals(entry: &Value, field: &str, value: &str) -> bool {
    let has = |v: &Value| v.get(field).and_then(Value::as_str) == Some(value);
    has(entry) || entry.get("attributes").is_some_and(has)
}

fn merge(current: &Value, data: &Value) -> Value {
    let mut merged: Map<String, Value> = current.as_object().cloned().unwrap_or_default();
    if let Value::Object(updates) = data {
        for (key, value) in updates {
            merged.insert(key.clone(), value.clone());
        }
    }
    strip_system_fields(&Value::Object(merged))
}

fn read_data(response: Response, url: &str) -> Result<Value, SeedError> {
    let body: Value = response.json().map_err(|e| SeedError::InvalidResponse {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    Ok(body.get("data").cloned().unwrap_or(Value::Null))
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

// --- Manifest ---

fn default_key() -> String {
    "slug".to_string()
}

/// Entries of one collection, upserted by `key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSeed {
    pub collection: String,
    #[serde(default = "default_key")]
    pub key: String,
    #[serde(default)]
    pub localized: bool,
    #[serde(default)]
    pub entries: Vec<Value>,
}

/// A single type written with `set_single`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleSeed {
    pub uid: String,
    #[serde(default)]
    pub localized: bool,
    pub data: Value,
}

/// Content to seed, in order: collections first, then single types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedManifest {
    #[serde(default)]
    pub collections: Vec<CollectionSeed>,
    #[serde(default)]
    pub singles: Vec<SingleSeed>,
}

impl SeedManifest {
    /// Load a manifest from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Manifest` if the file is missing or isn't a valid manifest.
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let content = read_file(path)?;
        serde_json::from_str(&content)
            .map_err(|source| SeedError::Manifest(SchemaError::InvalidJson { source }))
    }
}

/// Outcome of a seeding run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    /// Record ids per collection, in manifest order.
    pub upserted: BTreeMap<String, Vec<u64>>,
    pub singles: Vec<String>,
    pub failures: Vec<String>,
}

impl SeedReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Seed every entry of `manifest`.
///
/// A failing entry is logged and recorded; the run carries on with the rest.
pub fn run(client: &SeedClient, manifest: &SeedManifest) -> SeedReport {
    let mut report = SeedReport::default();
    log::info!(
        "[seed] start seeding to {} (locale={})",
        client.config().base_url,
        client.config().locale
    );

    for seed in &manifest.collections {
        let locale = seed.localized.then_some(client.config().locale.as_str());
        let ids = report.upserted.entry(seed.collection.clone()).or_default();

        for entry in &seed.entries {
            let (key_value, data) = match keyed_entry(entry, &seed.key) {
                Some(keyed) => keyed,
                None => {
                    let failure = format!("{}: entry without {}", seed.collection, seed.key);
                    log::warn!("[seed] {}", failure);
                    report.failures.push(failure);
                    continue;
                }
            };

            match client.upsert_by_field(&seed.collection, &seed.key, &key_value, &data, locale) {
                Ok(Some(id)) => ids.push(id),
                Ok(None) => {
                    let failure = format!("{}/{}: could not upsert", seed.collection, key_value);
                    log::warn!("[seed] skipped {}", failure);
                    report.failures.push(failure);
                }
                Err(e) => {
                    let failure = format!("{}/{}: {}", seed.collection, key_value, e);
                    log::warn!("[seed] upsert failed for {}", failure);
                    report.failures.push(failure);
                }
            }
        }

        log::info!(
            "[seed] {} upserted: {}",
            seed.collection,
            ids.iter().map(u64::to_string).collect::<Vec<_>>().join(", ")
        );
    }

    for single in &manifest.singles {
        let locale = single.localized.then_some(client.config().locale.as_str());
        match client.set_single(&single.uid, &single.data, locale) {
            Ok(_) => {
                log::info!("[seed] {} set", single.uid);
                report.singles.push(single.uid.clone());
            }
            Err(e) => {
                let failure = format!("{}: {}", single.uid, e);
                log::warn!("[seed] set failed for {}", failure);
                report.failures.push(failure);
            }
        }
    }

    log::info!("[seed] completed with {} failure(s)", report.failures.len());
    report
}

/// Key value of `entry`, plus the payload to send.
///
/// A missing `slug` is derived from `title` or `name`.
fn keyed_entry(entry: &Value, key: &str) -> Option<(String, Value)> {
    if let Some(value) = entry.get(key).and_then(Value::as_str) {
        return Some((value.to_string(), entry.clone()));
    }
    if key != "slug" {
        return None;
    }

    let source = ["title", "name"]
        .iter()
        .find_map(|field| entry.get(*field).and_then(Value::as_str))?;
    let slug = slugify(source);
    if slug.is_empty() {
        return None;
    }

    let mut data = entry.as_object().cloned()?;
    data.insert("slug".to_string(), Value::String(slug.clone()));
    Some((slug, Value::Object(data)))
}
