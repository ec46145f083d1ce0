//! Schema loading from various sources.
//!
//! Handles schema exports (a single JSON document) and project directories
//! laid out the way the CMS stores its schemas on disk.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::types::{Attribute, ContentType, PluginOptions, Schema};

/// Load a schema registry from an export file.
///
/// # Errors
///
/// Returns `SchemaError::FileNotFound` if the file doesn't exist,
/// or `SchemaError::InvalidJson` if the file isn't a valid export.
pub fn load_schema(path: &Path) -> Result<Schema, SchemaError> {
    let content = read_file(path)?;
    load_schema_str(&content)
}

/// Load a schema registry from a JSON string.
///
/// Accepts either a flat `{ "<uid>": { "attributes": ... } }` map or the
/// split `{ "contentTypes": {...}, "components": {...} }` form.
///
/// # Errors
///
/// Returns `SchemaError::InvalidJson` if the string isn't a valid export.
pub fn load_schema_str(content: &str) -> Result<Schema, SchemaError> {
    let value: Value =
        serde_json::from_str(content).map_err(|source| SchemaError::InvalidJson { source })?;

    let entries: Map<String, Value> = match split_export(&value) {
        Some(sections) => sections
            .into_iter()
            .flat_map(|section| section.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect(),
        None => Map::deserialize(&value).map_err(|source| SchemaError::InvalidJson { source })?,
    };

    let mut schema = Schema::new();
    for (uid, value) in entries {
        let content_type = content_type_from_value(&uid, value)
            .map_err(|source| SchemaError::InvalidJson { source })?;
        schema.insert(uid, content_type);
    }
    Ok(schema)
}

/// Load every content type and component from a project directory.
///
/// Maps `src/api/<api>/content-types/<name>/schema.json` to `api::<api>.<name>`
/// and `src/components/<category>/<name>.json` to `<category>.<name>`.
///
/// # Errors
///
/// Returns `SchemaError::NotAProject` if neither source directory exists,
/// or the first read/parse error encountered.
pub fn load_project(root: &Path) -> Result<Schema, SchemaError> {
    let api_dir = root.join("src").join("api");
    let components_dir = root.join("src").join("components");

    if !api_dir.is_dir() && !components_dir.is_dir() {
        return Err(SchemaError::NotAProject {
            path: root.to_path_buf(),
        });
    }

    let mut schema = Schema::new();

    for api in sorted_dirs(&api_dir)? {
        let api_name = file_name(&api);
        for ct in sorted_dirs(&api.join("content-types"))? {
            let file = ct.join("schema.json");
            if !file.is_file() {
                continue;
            }
            let uid = format!("api::{}.{}", api_name, file_name(&ct));
            log::debug!("loading {} from {}", uid, file.display());
            let content_type = load_content_type(&uid, &file)?;
            schema.insert(uid, content_type);
        }
    }

    for category in sorted_dirs(&components_dir)? {
        let category_name = file_name(&category);
        for file in sorted_json_files(&category)? {
            let stem = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let uid = format!("{}.{}", category_name, stem);
            log::debug!("loading {} from {}", uid, file.display());
            let content_type = load_content_type(&uid, &file)?;
            schema.insert(uid, content_type);
        }
    }

    Ok(schema)
}

/// Load from a project directory or an export file, whichever `path` is.
pub fn load_schema_auto(path: &Path) -> Result<Schema, SchemaError> {
    if path.is_dir() {
        load_project(path)
    } else {
        load_schema(path)
    }
}

// --- Internal implementation ---

fn split_export(value: &Value) -> Option<Vec<&Map<String, Value>>> {
    let map = value.as_object()?;
    let sections: Vec<&Map<String, Value>> = ["contentTypes", "components"]
        .iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_object))
        .collect();
    if sections.is_empty() {
        None
    } else {
        Some(sections)
    }
}

pub(crate) fn read_file(path: &Path) -> Result<String, SchemaError> {
    if !path.exists() {
        return Err(SchemaError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    std::fs::read_to_string(path).map_err(|source| SchemaError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

fn load_content_type(uid: &str, path: &Path) -> Result<ContentType, SchemaError> {
    let content = read_file(path)?;
    serde_json::from_str(&content)
        .and_then(|value: Value| content_type_from_value(uid, value))
        .map_err(|source| SchemaError::InvalidSchemaFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Content-type document with attributes left undecoded.
#[derive(Deserialize)]
struct RawContentType {
    #[serde(default)]
    attributes: IndexMap<String, Value>,
    #[serde(default, rename = "pluginOptions")]
    plugin_options: PluginOptions,
}

/// Decode one content type. A malformed attribute is kept as a scalar so
/// the rest of the schema still loads.
fn content_type_from_value(uid: &str, value: Value) -> Result<ContentType, serde_json::Error> {
    let raw: RawContentType = serde_json::from_value(value)?;

    let attributes = raw
        .attributes
        .into_iter()
        .map(|(name, value)| {
            let attribute = serde_json::from_value(value).unwrap_or_else(|e| {
                log::warn!(
                    "[deep-populate] malformed attribute {}.{} treated as scalar: {}",
                    uid,
                    name,
                    e
                );
                Attribute::Other
            });
            (name, attribute)
        })
        .collect();

    Ok(ContentType {
        attributes,
        plugin_options: raw.plugin_options,
    })
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, SchemaError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|source| SchemaError::ReadError {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
    paths.sort();
    Ok(paths)
}

fn sorted_dirs(dir: &Path) -> Result<Vec<PathBuf>, SchemaError> {
    Ok(read_dir_sorted(dir)?
        .into_iter()
        .filter(|p| p.is_dir())
        .collect())
}

fn sorted_json_files(dir: &Path) -> Result<Vec<PathBuf>, SchemaError> {
    Ok(read_dir_sorted(dir)?
        .into_iter()
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
