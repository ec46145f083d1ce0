//! Core types for the content-type schema registry.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Audit attribute holding the creating admin user.
pub const CREATED_BY_ATTRIBUTE: &str = "createdBy";

/// Audit attribute holding the last updating admin user.
pub const UPDATED_BY_ATTRIBUTE: &str = "updatedBy";

/// Creator fields. Hidden by the CMS but still resolvable through populate.
pub const CREATOR_FIELDS: &[&str] = &[CREATED_BY_ATTRIBUTE, UPDATED_BY_ATTRIBUTE];

/// A single attribute descriptor, tagged by its `type` field.
///
/// Only the kinds that need population are modelled; every scalar kind
/// (`string`, `richtext`, `enumeration`, ...) collapses into [`Attribute::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Attribute {
    Relation {
        /// Relation kind, e.g. `oneToMany` or `morphToMany`.
        #[serde(default)]
        relation: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        visible: Option<bool>,
    },
    Media {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        visible: Option<bool>,
    },
    Component {
        component: String,
        #[serde(default)]
        repeatable: bool,
    },
    Dynamiczone {
        #[serde(default)]
        components: Vec<String>,
    },
    #[serde(other)]
    Other,
}

impl Attribute {
    /// Shorthand for a visible relation of the given kind.
    pub fn relation(kind: impl Into<String>) -> Self {
        Attribute::Relation {
            relation: kind.into(),
            target: None,
            visible: None,
        }
    }

    /// Shorthand for a visible media attribute.
    pub fn media() -> Self {
        Attribute::Media { visible: None }
    }

    /// Shorthand for a single (non-repeatable) component attribute.
    pub fn component(uid: impl Into<String>) -> Self {
        Attribute::Component {
            component: uid.into(),
            repeatable: false,
        }
    }

    /// Shorthand for a dynamic zone over the given component UIDs.
    pub fn dynamic_zone<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Attribute::Dynamiczone {
            components: components.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if this is a polymorphic relation (`morphOne`, `morphToMany`, ...).
    pub fn is_morph_relation(&self) -> bool {
        match self {
            Attribute::Relation { relation, .. } => {
                relation.to_ascii_lowercase().starts_with("morph")
            }
            _ => false,
        }
    }

    /// Returns false only for attributes explicitly marked `visible: false`.
    pub fn is_visible(&self) -> bool {
        match self {
            Attribute::Relation { visible, .. } | Attribute::Media { visible } => {
                visible.unwrap_or(true)
            }
            _ => true,
        }
    }

    /// Returns the `type` tag this attribute was declared with.
    pub fn kind(&self) -> &'static str {
        match self {
            Attribute::Relation { .. } => "relation",
            Attribute::Media { .. } => "media",
            Attribute::Component { .. } => "component",
            Attribute::Dynamiczone { .. } => "dynamiczone",
            Attribute::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct I18nOptions {
    #[serde(default)]
    pub localized: bool,
}

/// Plugin options attached to a content type. Only `i18n` is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i18n: Option<I18nOptions>,
}

/// A content type or component schema. Attributes keep their declaration order.
///
/// Deserializing this type directly is strict; the loaders in this crate
/// read malformed attributes as [`Attribute::Other`] instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentType {
    #[serde(default)]
    pub attributes: IndexMap<String, Attribute>,
    #[serde(default, rename = "pluginOptions")]
    pub plugin_options: PluginOptions,
}

impl ContentType {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute (builder style).
    pub fn with(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    /// Enable or disable i18n localization (builder style).
    pub fn localized(mut self, localized: bool) -> Self {
        self.plugin_options.i18n = Some(I18nOptions { localized });
        self
    }

    /// Returns true if the i18n plugin localizes this content type.
    pub fn is_localized(&self) -> bool {
        self.plugin_options
            .i18n
            .as_ref()
            .map(|i18n| i18n.localized)
            .unwrap_or(false)
    }
}

/// Read-only registry mapping a content-type UID to its schema.
///
/// Holds both collection/single types (`api::project.project`) and
/// components (`dynamic-zone.hero`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    content_types: BTreeMap<String, ContentType>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a content type (builder style).
    pub fn with(mut self, uid: impl Into<String>, content_type: ContentType) -> Self {
        self.insert(uid, content_type);
        self
    }

    pub fn insert(&mut self, uid: impl Into<String>, content_type: ContentType) {
        self.content_types.insert(uid.into(), content_type);
    }

    pub fn get(&self, uid: &str) -> Option<&ContentType> {
        self.content_types.get(uid)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.content_types.contains_key(uid)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ContentType)> {
        self.content_types.iter()
    }

    pub fn len(&self) -> usize {
        self.content_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content_types.is_empty()
    }
}

impl FromIterator<(String, ContentType)> for Schema {
    fn from_iter<T: IntoIterator<Item = (String, ContentType)>>(iter: T) -> Self {
        Self {
            content_types: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attribute_kinds_deserialize() {
        let ct: ContentType = serde_json::from_value(json!({
            "attributes": {
                "title": { "type": "string", "required": true },
                "cover": { "type": "media", "multiple": false, "allowedTypes": ["images"] },
                "seo": { "type": "component", "component": "shared.seo" },
                "blocks": { "type": "dynamiczone", "components": ["dynamic-zone.hero"] },
                "author": { "type": "relation", "relation": "manyToOne", "target": "api::author.author" }
            },
            "pluginOptions": { "i18n": { "localized": true } }
        }))
        .unwrap();

        assert_eq!(ct.attributes["title"], Attribute::Other);
        assert_eq!(ct.attributes["cover"], Attribute::media());
        assert_eq!(ct.attributes["seo"], Attribute::component("shared.seo"));
        assert_eq!(
            ct.attributes["blocks"],
            Attribute::dynamic_zone(["dynamic-zone.hero"])
        );
        assert_eq!(ct.attributes["author"].kind(), "relation");
        assert!(ct.is_localized());
    }

    #[test]
    fn morph_detection_is_case_insensitive() {
        assert!(Attribute::relation("morphToMany").is_morph_relation());
        assert!(Attribute::relation("MorphOne").is_morph_relation());
        assert!(!Attribute::relation("oneToMany").is_morph_relation());
        assert!(!Attribute::media().is_morph_relation());
    }

    #[test]
    fn visibility_defaults_to_true() {
        assert!(Attribute::relation("oneToOne").is_visible());
        let hidden = Attribute::Relation {
            relation: "oneToOne".into(),
            target: None,
            visible: Some(false),
        };
        assert!(!hidden.is_visible());
    }

    #[test]
    fn localization_defaults_to_false() {
        assert!(!ContentType::new().is_localized());
        assert!(!ContentType::new().localized(false).is_localized());
        assert!(ContentType::new().localized(true).is_localized());
    }
}
