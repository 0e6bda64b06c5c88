//! Template renderer: resolves a layout by name and merges a record into it.
//!
//! Layouts are Handlebars files named `<id>.html` under the configured
//! directory. The set is fixed at deploy time; `list()` enumerates it.
//!
//! HTML escaping is disabled. Records are sanitized before they get here, and
//! their strings are already HTML-safe, so escaping again would double-encode `&`.

use std::fmt;
use std::path::PathBuf;

use handlebars::Handlebars;
use serde::Serialize;
use thiserror::Error;

use crate::models::resume::ResumeRecord;
use crate::render::helpers::register_helpers;

const MAX_TEMPLATE_ID_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Invalid template name: {0}")]
    InvalidName(String),

    #[error("Template file not found: {0}.html")]
    NotFound(String),

    #[error("Failed to read template {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render template {name}: {reason}")]
    Render { name: String, reason: String },
}

/// A validated layout name: `[A-Za-z0-9_-]{1,64}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let name = raw.trim();
        let valid = !name.is_empty()
            && name.len() <= MAX_TEMPLATE_ID_LEN
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if valid {
            Ok(Self(name.to_string()))
        } else {
            Err(TemplateError::InvalidName(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A layout body read from disk, ready to merge.
#[derive(Debug, Clone)]
pub struct Layout {
    pub id: TemplateId,
    pub body: String,
}

pub struct TemplateStore {
    dir: PathBuf,
    registry: Handlebars<'static>,
}

impl TemplateStore {
    /// `strict`: unknown placeholders fail the render instead of rendering empty.
    pub fn new(dir: impl Into<PathBuf>, strict: bool) -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(strict);
        registry.register_escape_fn(handlebars::no_escape);
        register_helpers(&mut registry);

        Self {
            dir: dir.into(),
            registry,
        }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Reads the layout body for `id`. This is the only disk access per render.
    pub async fn resolve(&self, id: &TemplateId) -> Result<Layout, TemplateError> {
        let path = self.dir.join(format!("{}.html", id.as_str()));

        match tokio::fs::read_to_string(&path).await {
            Ok(body) => Ok(Layout {
                id: id.clone(),
                body,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TemplateError::NotFound(id.to_string()))
            }
            Err(source) => Err(TemplateError::Io {
                name: id.to_string(),
                source,
            }),
        }
    }

    /// Merges `record` into `layout`.
    pub fn render(&self, layout: &Layout, record: &ResumeRecord) -> Result<String, TemplateError> {
        self.registry
            .render_template(&layout.body, record)
            .map_err(|e| TemplateError::Render {
                name: layout.id.to_string(),
                reason: e.to_string(),
            })
    }

    /// Names of all layouts in the template directory, sorted.
    pub async fn list(&self) -> Result<Vec<String>, TemplateError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|source| TemplateError::Io {
                name: self.dir.display().to_string(),
                source,
            })?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| TemplateError::Io {
                name: self.dir.display().to_string(),
                source,
            })?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if TemplateId::parse(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bundled_store() -> TemplateStore {
        TemplateStore::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates"), false)
    }

    fn record(value: serde_json::Value) -> ResumeRecord {
        ResumeRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_template_id_accepts_simple_names() {
        assert_eq!(TemplateId::parse("modern").unwrap().as_str(), "modern");
        assert_eq!(TemplateId::parse(" two-column_v2 ").unwrap().as_str(), "two-column_v2");
    }

    #[test]
    fn test_template_id_rejects_traversal_and_blanks() {
        let too_long = "a".repeat(65);
        for bad in ["", "   ", "../secrets", "a/b", "modern.html", "x y", too_long.as_str()] {
            assert!(
                matches!(TemplateId::parse(bad), Err(TemplateError::InvalidName(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_resolve_missing_template_is_not_found() {
        let store = bundled_store();
        let id = TemplateId::parse("does-not-exist").unwrap();
        let err = store.resolve(&id).await.unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(ref name) if name == "does-not-exist"));
        assert_eq!(err.to_string(), "Template file not found: does-not-exist.html");
    }

    #[tokio::test]
    async fn test_list_enumerates_bundled_layouts() {
        let names = bundled_store().list().await.unwrap();
        assert_eq!(names, vec!["classic", "minimal", "modern"]);
    }

    #[tokio::test]
    async fn test_modern_omits_empty_summary_section() {
        let store = bundled_store();
        let layout = store
            .resolve(&TemplateId::parse("modern").unwrap())
            .await
            .unwrap();

        let html = store
            .render(
                &layout,
                &record(json!({"fullname": "Jane Doe", "profileSummary": ""})),
            )
            .unwrap();

        assert!(html.contains("Jane Doe"));
        assert!(!html.contains(r#"id="summary""#));

        let html = store
            .render(
                &layout,
                &record(json!({"fullname": "Jane Doe", "profileSummary": "Backend engineer."})),
            )
            .unwrap();
        assert!(html.contains(r#"id="summary""#));
        assert!(html.contains("Backend engineer."));
    }

    #[tokio::test]
    async fn test_bundled_layouts_render_lists() {
        let store = bundled_store();
        let data = record(json!({
            "fullname": "Jane Doe",
            "email": "jane@example.com",
            "workExperience": [{
                "company": "Acme",
                "position": "Engineer",
                "startDate": "2021-05",
                "endDate": "",
                "description": "Built billing APIs"
            }],
            "projects": [{ "title": "Ledger", "description": "Double-entry store", "technologies": ["Rust", "Postgres"] }],
            "technicalSkills": [{ "id": "1", "name": "Rust" }, { "id": "2", "name": "" }],
            "languages": ["English", ""],
            "interests": ["", ""]
        }));

        for name in store.list().await.unwrap() {
            let layout = store.resolve(&TemplateId::parse(&name).unwrap()).await.unwrap();
            let html = store.render(&layout, &data).unwrap();
            assert!(html.contains("Acme"), "{name}: experience missing");
            assert!(html.contains("May 2021"), "{name}: date not formatted");
            assert!(html.contains("Rust"), "{name}: skills missing");
            assert!(html.contains("Ledger"), "{name}: projects missing");
            assert!(!html.contains(r#"id="interests""#), "{name}: blank interests rendered");
        }
    }

    #[test]
    fn test_unknown_placeholders_render_empty_in_lenient_mode() {
        let store = TemplateStore::new("unused", false);
        let layout = Layout {
            id: TemplateId::parse("inline").unwrap(),
            body: "<p>{{fullname}}|{{nickname}}</p>".to_string(),
        };
        let html = store.render(&layout, &record(json!({"fullname": "Jane"}))).unwrap();
        assert_eq!(html, "<p>Jane|</p>");
    }

    #[test]
    fn test_unknown_placeholders_fail_in_strict_mode() {
        let store = TemplateStore::new("unused", true);
        let layout = Layout {
            id: TemplateId::parse("inline").unwrap(),
            body: "<p>{{nickname}}</p>".to_string(),
        };
        let err = store.render(&layout, &record(json!({}))).unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
    }

    #[test]
    fn test_sanitized_entities_are_not_double_escaped() {
        let store = TemplateStore::new("unused", false);
        let layout = Layout {
            id: TemplateId::parse("inline").unwrap(),
            body: "{{company}}".to_string(),
        };
        let html = store
            .render(&layout, &record(json!({"company": "R&amp;D Labs"})))
            .unwrap();
        assert_eq!(html, "R&amp;D Labs");
    }
}
