//! Population-spec builder - derives `populate` directives from a content-type schema.
//!
//! Walks the attributes of a content type and, for every relation, media,
//! component, and dynamic zone, emits a directive telling the content API how
//! deep to fetch related data. Components and dynamic-zone members are
//! expanded recursively according to their own schemas.
//!
//! The walk tracks the UIDs on the active recursion path. A component that
//! embeds itself (directly or through other components) is truncated to a
//! shallow wildcard instead of recursing without bound.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::types::{Attribute, Schema, CREATOR_FIELDS};

/// Attribute that only needs the author avatar of each entry.
pub const TESTIMONIALS_ATTRIBUTE: &str = "testimonials";

/// Populate path used for [`TESTIMONIALS_ATTRIBUTE`].
pub const TESTIMONIALS_PATH: &str = "user.image";

/// How a single attribute should be populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `{ "populate": "*" }`
    All,
    /// `{ "populate": "<path>" }`
    Path(String),
    /// `{ "populate": { ... } }`
    Nested(PopulateSpec),
    /// `{ "on": { "<component uid>": <directive>, ... } }`
    On(IndexMap<String, Directive>),
}

impl Directive {
    pub fn to_value(&self) -> Value {
        match self {
            Directive::All => json!({ "populate": "*" }),
            Directive::Path(path) => json!({ "populate": path }),
            Directive::Nested(spec) => json!({ "populate": spec.to_value() }),
            Directive::On(fragments) => {
                let on: Map<String, Value> = fragments
                    .iter()
                    .map(|(uid, directive)| (uid.clone(), directive.to_value()))
                    .collect();
                json!({ "on": on })
            }
        }
    }
}

impl Serialize for Directive {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Attribute name to [`Directive`] mapping for one content type, in
/// attribute declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateSpec {
    entries: IndexMap<String, Directive>,
}

impl PopulateSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, attribute: impl Into<String>, directive: Directive) {
        self.entries.insert(attribute.into(), directive);
    }

    pub fn get(&self, attribute: &str) -> Option<&Directive> {
        self.entries.get(attribute)
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.entries.contains_key(attribute)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Directive)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as the JSON object the content API expects in `populate`.
    pub fn to_value(&self) -> Value {
        Value::Object(self.to_map())
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .map(|(name, directive)| (name.clone(), directive.to_value()))
            .collect()
    }
}

impl Serialize for PopulateSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl FromIterator<(String, Directive)> for PopulateSpec {
    fn from_iter<T: IntoIterator<Item = (String, Directive)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Options for building a population spec.
#[derive(Debug, Clone)]
pub struct PopulateOptions {
    /// Relation attributes populated even when the schema hides them.
    pub always_visible: Vec<String>,
    /// Relation attributes populated through a fixed path instead of `*`.
    pub narrowed: BTreeMap<String, String>,
}

impl Default for PopulateOptions {
    fn default() -> Self {
        Self {
            always_visible: CREATOR_FIELDS.iter().map(|s| s.to_string()).collect(),
            narrowed: BTreeMap::from([(
                TESTIMONIALS_ATTRIBUTE.to_string(),
                TESTIMONIALS_PATH.to_string(),
            )]),
        }
    }
}

impl PopulateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always populate the named relation, even if hidden.
    pub fn always_visible(mut self, attribute: impl Into<String>) -> Self {
        self.always_visible.push(attribute.into());
        self
    }

    /// Populate the named relation through `path` only.
    pub fn narrow(mut self, attribute: impl Into<String>, path: impl Into<String>) -> Self {
        self.narrowed.insert(attribute.into(), path.into());
        self
    }

    fn is_whitelisted(&self, attribute: &str) -> bool {
        self.always_visible.iter().any(|a| a == attribute)
    }
}

/// Build the population spec for `uid` with default options.
///
/// Unknown UIDs yield an empty spec and a warning.
pub fn build(schema: &Schema, uid: &str) -> PopulateSpec {
    build_with(schema, uid, &PopulateOptions::default())
}

/// Build the population spec for `uid`.
pub fn build_with(schema: &Schema, uid: &str, options: &PopulateOptions) -> PopulateSpec {
    Builder {
        schema,
        options,
        active: BTreeSet::new(),
    }
    .expand(uid)
}

// --- Internal implementation ---

struct Builder<'a> {
    schema: &'a Schema,
    options: &'a PopulateOptions,
    /// UIDs currently being expanded on the recursion path.
    active: BTreeSet<String>,
}

impl Builder<'_> {
    fn expand(&mut self, uid: &str) -> PopulateSpec {
        let Some(content_type) = self.schema.get(uid) else {
            log::warn!("[deep-populate] model {} not found", uid);
            return PopulateSpec::new();
        };

        self.active.insert(uid.to_string());

        let mut spec = PopulateSpec::new();
        for (name, attribute) in &content_type.attributes {
            if let Some(directive) = self.directive(name, attribute) {
                spec.insert(name.clone(), directive);
            }
        }

        self.active.remove(uid);
        spec
    }

    fn directive(&mut self, name: &str, attribute: &Attribute) -> Option<Directive> {
        match attribute {
            Attribute::Relation { .. } => {
                if attribute.is_morph_relation() {
                    return None;
                }
                if !attribute.is_visible() && !self.options.is_whitelisted(name) {
                    return None;
                }
                match self.options.narrowed.get(name) {
                    Some(path) => Some(Directive::Path(path.clone())),
                    None => Some(Directive::All),
                }
            }
            Attribute::Media { .. } => Some(Directive::All),
            Attribute::Component { component, .. } => Some(self.nested(name, component)),
            Attribute::Dynamiczone { components } => {
                let fragments = components
                    .iter()
                    .map(|uid| (uid.clone(), self.nested(name, uid)))
                    .collect();
                Some(Directive::On(fragments))
            }
            Attribute::Other => None,
        }
    }

    fn nested(&mut self, name: &str, uid: &str) -> Directive {
        if self.active.contains(uid) {
            log::warn!(
                "[deep-populate] cycle through {} at attribute {}; populating shallowly",
                uid,
                name
            );
            return Directive::All;
        }
        Directive::Nested(self.expand(uid))
    }
}
