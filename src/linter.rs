//! Schema linting - static analysis of a loaded schema registry.
//!
//! Reports problems the populate builder tolerates silently:
//! - Dangling component, dynamic-zone, and relation references
//! - Component cycles (populate truncates them)
//! - Morph relations (never populated)
//! - Empty dynamic zones

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::types::{Attribute, Schema};

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    /// Content type or component declaring the attribute.
    pub uid: String,
    pub attribute: String,
    pub message: String,
}

/// Result of linting a schema registry.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub content_types_checked: usize,
    pub errors: usize,
    pub warnings: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl LintResult {
    /// Returns true if no errors were found.
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }

    /// Returns true if any diagnostic carries `code`.
    pub fn has_code(&self, code: &str) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }
}

/// Lint every content type and component in `schema`.
pub fn lint(schema: &Schema) -> LintResult {
    let mut diagnostics = Vec::new();

    for (uid, content_type) in schema.iter() {
        for (name, attribute) in &content_type.attributes {
            check_attribute(schema, uid, name, attribute, &mut diagnostics);
        }
    }

    check_cycles(schema, &mut diagnostics);

    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warnings = diagnostics.len() - errors;

    LintResult {
        content_types_checked: schema.len(),
        errors,
        warnings,
        diagnostics,
    }
}

fn diagnostic(
    severity: Severity,
    code: &str,
    uid: &str,
    attribute: &str,
    message: String,
) -> Diagnostic {
    Diagnostic {
        severity,
        code: code.to_string(),
        uid: uid.to_string(),
        attribute: attribute.to_string(),
        message,
    }
}

fn check_attribute(
    schema: &Schema,
    uid: &str,
    name: &str,
    attribute: &Attribute,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attribute {
        Attribute::Component { component, .. } => {
            if !schema.contains(component) {
                diagnostics.push(diagnostic(
                    Severity::Error,
                    "E001",
                    uid,
                    name,
                    format!("unknown component: {}", component),
                ));
            }
        }
        Attribute::Dynamiczone { components } => {
            if components.is_empty() {
                diagnostics.push(diagnostic(
                    Severity::Warning,
                    "W003",
                    uid,
                    name,
                    "dynamic zone allows no components".to_string(),
                ));
            }
            for component in components.iter().filter(|c| !schema.contains(c)) {
                diagnostics.push(diagnostic(
                    Severity::Error,
                    "E002",
                    uid,
                    name,
                    format!("dynamic zone lists unknown component: {}", component),
                ));
            }
        }
        Attribute::Relation {
            relation, target, ..
        } => {
            if attribute.is_morph_relation() {
                diagnostics.push(diagnostic(
                    Severity::Warning,
                    "W002",
                    uid,
                    name,
                    format!("{} relation is never populated", relation),
                ));
                return;
            }
            // Plugin targets (admin::user, plugin::upload.file) live outside the export.
            if let Some(target) = target {
                if target.starts_with("api::") && !schema.contains(target) {
                    diagnostics.push(diagnostic(
                        Severity::Error,
                        "E003",
                        uid,
                        name,
                        format!("relation targets unknown content type: {}", target),
                    ));
                }
            }
        }
        Attribute::Media { .. } | Attribute::Other => {}
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Active,
    Done,
}

/// Depth-first search over component edges; every edge closing a cycle is reported.
fn check_cycles(schema: &Schema, diagnostics: &mut Vec<Diagnostic>) {
    let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
    let mut reported: BTreeSet<(String, String)> = BTreeSet::new();

    for (uid, _) in schema.iter() {
        visit(schema, uid, &mut marks, &mut reported, diagnostics);
    }
}

fn visit<'a>(
    schema: &'a Schema,
    uid: &'a str,
    marks: &mut BTreeMap<&'a str, Mark>,
    reported: &mut BTreeSet<(String, String)>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if marks.contains_key(uid) {
        return;
    }
    let Some(content_type) = schema.get(uid) else {
        return;
    };
    marks.insert(uid, Mark::Active);

    for (name, attribute) in &content_type.attributes {
        for target in component_edges(attribute) {
            match marks.get(target.as_str()) {
                Some(Mark::Active) => {
                    if reported.insert((uid.to_string(), name.clone())) {
                        diagnostics.push(diagnostic(
                            Severity::Warning,
                            "W001",
                            uid,
                            name,
                            format!(
                                "component cycle through {}; populate truncates this cycle",
                                target
                            ),
                        ));
                    }
                }
                Some(Mark::Done) => {}
                None => visit(schema, target, marks, reported, diagnostics),
            }
        }
    }

    marks.insert(uid, Mark::Done);
}

fn component_edges(attribute: &Attribute) -> Vec<&String> {
    match attribute {
        Attribute::Component { component, .. } => vec![component],
        Attribute::Dynamiczone { components } => components.iter().collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentType;

    #[test]
    fn lint_clean_schema() {
        let schema = Schema::new()
            .with(
                "api::page.page",
                ContentType::new()
                    .with("blocks", Attribute::dynamic_zone(["dynamic-zone.hero"]))
                    .with("seo", Attribute::component("shared.seo")),
            )
            .with("dynamic-zone.hero", ContentType::new())
            .with("shared.seo", ContentType::new());

        let result = lint(&schema);
        assert!(result.is_ok());
        assert_eq!(result.warnings, 0);
        assert_eq!(result.content_types_checked, 3);
    }

    #[test]
    fn lint_unknown_component() {
        let schema = Schema::new().with(
            "api::page.page",
            ContentType::new().with("seo", Attribute::component("shared.seo")),
        );

        let result = lint(&schema);
        assert!(!result.is_ok());
        assert!(result.has_code("E001"));
    }

    #[test]
    fn lint_unknown_zone_member() {
        let schema = Schema::new().with(
            "api::page.page",
            ContentType::new().with("blocks", Attribute::dynamic_zone(["dynamic-zone.faq"])),
        );

        let result = lint(&schema);
        assert!(result.has_code("E002"));
    }

    #[test]
    fn lint_unknown_relation_target() {
        let schema = Schema::new().with(
            "api::project.project",
            ContentType::new()
                .with(
                    "techs",
                    Attribute::Relation {
                        relation: "manyToMany".into(),
                        target: Some("api::tech.tech".into()),
                        visible: None,
                    },
                )
                .with(
                    "createdBy",
                    Attribute::Relation {
                        relation: "oneToOne".into(),
                        target: Some("admin::user".into()),
                        visible: Some(false),
                    },
                ),
        );

        let result = lint(&schema);
        assert_eq!(result.errors, 1);
        assert_eq!(result.diagnostics[0].attribute, "techs");
        assert!(result.has_code("E003"));
    }

    #[test]
    fn lint_morph_and_empty_zone_warnings() {
        let schema = Schema::new().with(
            "api::page.page",
            ContentType::new()
                .with("related", Attribute::relation("morphToMany"))
                .with("blocks", Attribute::dynamic_zone(Vec::<String>::new())),
        );

        let result = lint(&schema);
        assert!(result.is_ok());
        assert_eq!(result.warnings, 2);
        assert!(result.has_code("W002"));
        assert!(result.has_code("W003"));
    }

    #[test]
    fn lint_component_cycle() {
        let schema = Schema::new()
            .with(
                "shared.a",
                ContentType::new().with("b", Attribute::component("shared.b")),
            )
            .with(
                "shared.b",
                ContentType::new().with("a", Attribute::component("shared.a")),
            );

        let result = lint(&schema);
        assert!(result.is_ok());
        let cycles: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.code == "W001")
            .collect();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].uid, "shared.b");
        assert_eq!(cycles[0].attribute, "a");
        assert_eq!(
            cycles[0].message,
            "component cycle through shared.a; populate truncates this cycle"
        );
    }
}
