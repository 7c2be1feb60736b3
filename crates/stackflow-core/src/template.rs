//! Template expansion
//!
//! Expands `{{ name }}` references inside the string values of a parsed stack
//! file with Tera. Values come only from `variables { ... }` blocks in the
//! file itself; the process environment is never consulted, so a
//! declaration stays a pure function of its literals.
//!
//! Expansion runs per string value after the KDL parse. Text outside a
//! `{{ ... }}` span never reaches Tera, and a span that does not start with
//! an identifier (`{{.Id}}`, `{{ $x }}`) is kept verbatim, so inline shell
//! and Go-template snippets survive untouched.

use crate::error::{Result, StackError};
use kdl::{KdlDocument, KdlNode, KdlValue};
use std::collections::HashMap;
use tera::{Context, Tera};
use tracing::debug;

/// Variable context
pub type Variables = HashMap<String, serde_json::Value>;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Template processor
pub struct TemplateProcessor {
    tera: Tera,
    context: Context,
}

impl TemplateProcessor {
    pub fn new() -> Self {
        Self {
            tera: Tera::default(),
            context: Context::new(),
        }
    }

    pub fn add_variable(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.context.insert(key.into(), &value);
    }

    pub fn add_variables(&mut self, variables: Variables) {
        for (key, value) in variables {
            self.context.insert(key, &value);
        }
    }

    /// Render a string as a template
    pub fn render_str(&mut self, template: &str) -> Result<String> {
        self.tera
            .render_str(template, &self.context)
            .map_err(|e| StackError::TemplateRenderError(extract_tera_error_detail(&e)))
    }

    /// Expand references in every string value of the document
    ///
    /// `variables` blocks are left as written.
    pub fn expand_document(&mut self, doc: &mut KdlDocument) -> Result<()> {
        for node in doc.nodes_mut() {
            if node.name().value() == "variables" {
                continue;
            }
            self.expand_node(node)?;
        }
        Ok(())
    }

    fn expand_node(&mut self, node: &mut KdlNode) -> Result<()> {
        for entry in node.entries_mut() {
            let Some(value) = entry.value().as_string().map(str::to_string) else {
                continue;
            };
            if !has_template_syntax(&value) {
                continue;
            }
            let expanded = self.expand_str(&value)?;
            entry.set_value(KdlValue::String(expanded));
        }

        if let Some(children) = node.children_mut() {
            for child in children.nodes_mut() {
                self.expand_node(child)?;
            }
        }
        Ok(())
    }

    /// Expand the `{{ ... }}` spans of one value
    pub fn expand_str(&mut self, value: &str) -> Result<String> {
        let mut out = String::with_capacity(value.len());
        let mut rest = value;

        while let Some(start) = rest.find(OPEN) {
            let Some(len) = rest[start + OPEN.len()..].find(CLOSE) else {
                break;
            };
            let end = start + OPEN.len() + len + CLOSE.len();
            let span = &rest[start..end];

            out.push_str(&rest[..start]);
            if is_reference(&span[OPEN.len()..span.len() - CLOSE.len()]) {
                out.push_str(&self.render_str(span)?);
            } else {
                out.push_str(span);
            }
            rest = &rest[end..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

impl Default for TemplateProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect every top-level `variables { ... }` block
///
/// Later blocks override earlier ones.
pub fn extract_variables(doc: &KdlDocument) -> Variables {
    let mut vars = HashMap::new();

    for node in doc.nodes() {
        if node.name().value() != "variables" {
            continue;
        }
        let Some(children) = node.children() else {
            continue;
        };
        for var in children.nodes() {
            if let Some(entry) = var.entries().first() {
                let key = var.name().value().to_string();
                debug!(key = %key, "Found variable");
                vars.insert(key, kdl_value_to_json(entry.value()));
            }
        }
    }

    vars
}

/// Whether a value contains a `{{` span at all
pub fn has_template_syntax(content: &str) -> bool {
    content.contains(OPEN)
}

/// `{{ name }}`, `{{ name | upper }}`; not `{{.Id}}` or `{{ $x }}`
fn is_reference(inner: &str) -> bool {
    inner
        .trim_start()
        .starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
}

fn kdl_value_to_json(value: &KdlValue) -> serde_json::Value {
    match value {
        KdlValue::String(s) => serde_json::Value::String(s.clone()),
        // Integers beyond i64 keep their digits as a string
        KdlValue::Integer(i) => match i64::try_from(*i) {
            Ok(n) => serde_json::Value::Number(n.into()),
            Err(_) => serde_json::Value::String(i.to_string()),
        },
        KdlValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        KdlValue::Bool(b) => serde_json::Value::Bool(*b),
        KdlValue::Null => serde_json::Value::Null,
    }
}

/// Pull the useful part out of a Tera error chain
fn extract_tera_error_detail(e: &tera::Error) -> String {
    use std::error::Error;

    let mut details = vec![e.to_string()];
    let mut source = e.source();
    while let Some(err) = source {
        details.push(err.to_string());
        source = err.source();
    }

    let full_error = details.join(" | ");

    // "Variable `xxx` not found in context ..."
    if full_error.contains("not found in context")
        && let Some(start) = full_error.find("Variable `")
        && let Some(end) = full_error[start..].find("` not found")
    {
        let var_name = &full_error[start + 10..start + end];
        return format!(
            "undefined variable: `{}`\nhint: define it in a variables block",
            var_name
        );
    }

    full_error
}
