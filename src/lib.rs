//! Deep Populate
//!
//! Schema-driven `populate` directives for Strapi-style content APIs.
//!
//! The content API returns relations, media, components, and dynamic zones as
//! bare references unless a request says how deep to fetch them. This library
//! derives that directive from the content-type schema, applies it as a default
//! to read requests, lints schemas for references it cannot follow, and seeds
//! content through idempotent upserts.
//!
//! # Example
//!
//! ```
//! use deep_populate::{build, Attribute, ContentType, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::new()
//!     .with(
//!         "api::page.page",
//!         ContentType::new()
//!             .with("cover", Attribute::media())
//!             .with("blocks", Attribute::dynamic_zone(["dynamic-zone.faq"])),
//!     )
//!     .with(
//!         "dynamic-zone.faq",
//!         ContentType::new().with("faqs", Attribute::relation("oneToMany")),
//!     );
//!
//! let spec = build(&schema, "api::page.page");
//! assert_eq!(
//!     spec.to_value(),
//!     json!({
//!         "blocks": { "on": { "dynamic-zone.faq": { "populate": { "faqs": { "populate": "*" } } } } },
//!         "cover": { "populate": "*" }
//!     })
//! );
//! ```
//!
//! # Directive Rules
//!
//! | Attribute | Directive |
//! |-----------|-----------|
//! | `relation` | `{ "populate": "*" }`; skipped when polymorphic or hidden |
//! | `relation` named `testimonials` | `{ "populate": "user.image" }` |
//! | `media` | `{ "populate": "*" }` |
//! | `component` | `{ "populate": <component spec> }` |
//! | `dynamiczone` | `{ "on": { "<uid>": { "populate": <uid spec> } } }` |
//! | anything else | none |

mod error;
mod filter;
mod inflect;
mod linter;
mod loader;
mod populate;
mod types;

#[cfg(feature = "remote")]
pub mod seed;

pub use error::SchemaError;
pub use filter::{
    resolve_uid, ContentRequest, FilterConfig, FilterOutcome, PopulateFilter, SkipReason,
    LOCALIZATIONS_KEY, POPULATE_KEY,
};
pub use inflect::singularize;
pub use linter::{lint, Diagnostic, LintResult, Severity};
pub use loader::{load_project, load_schema, load_schema_auto, load_schema_str};
pub use populate::{
    build, build_with, Directive, PopulateOptions, PopulateSpec, TESTIMONIALS_ATTRIBUTE,
    TESTIMONIALS_PATH,
};
pub use types::{
    Attribute, ContentType, I18nOptions, PluginOptions, Schema, CREATED_BY_ATTRIBUTE,
    CREATOR_FIELDS, UPDATED_BY_ATTRIBUTE,
};

#[cfg(feature = "remote")]
pub use error::SeedError;
