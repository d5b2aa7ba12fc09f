// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message template rendering.
//!
//! Placeholders use `{field}` syntax and substitute from prospect fields. An
//! unresolved placeholder fails the render -- a literal `{first_name}` token
//! is never shipped to a real contact.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use cadence_core::types::{Prospect, RenderedMessage, SequenceStep};
use cadence_core::CadenceError;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder regex"));

/// Substitution variables derived from a prospect.
///
/// `first_name` is the first whitespace-separated token of the display name.
pub fn prospect_vars(prospect: &Prospect) -> HashMap<&'static str, String> {
    let mut vars = HashMap::new();
    if let Some(name) = prospect.display_name.as_deref() {
        let name = name.trim();
        if !name.is_empty() {
            vars.insert("full_name", name.to_string());
            if let Some(first) = name.split_whitespace().next() {
                vars.insert("first_name", first.to_string());
            }
        }
    }
    if let Some(email) = prospect.email.as_deref() {
        vars.insert("email", email.to_string());
    }
    if let Some(title) = prospect.title.as_deref() {
        vars.insert("title", title.to_string());
    }
    if let Some(company) = prospect.company.as_deref() {
        vars.insert("company", company.to_string());
    }
    vars
}

/// Render one template against a variable map.
///
/// Returns [`CadenceError::TemplateRender`] naming the first placeholder with
/// no value.
pub fn render(template: &str, vars: &HashMap<&'static str, String>) -> Result<String, CadenceError> {
    let mut unresolved: Option<String> = None;
    let rendered = PLACEHOLDER.replace_all(template, |caps: &regex::Captures<'_>| {
        let key = &caps[1];
        match vars.get(key) {
            Some(value) => value.clone(),
            None => {
                if unresolved.is_none() {
                    unresolved = Some(key.to_string());
                }
                String::new()
            }
        }
    });
    if let Some(placeholder) = unresolved {
        return Err(CadenceError::TemplateRender { placeholder });
    }
    Ok(rendered.into_owned())
}

/// Render a full step for a prospect, honoring the assigned variant.
///
/// A step that declares variants renders the assigned variant's template;
/// an assignment pointing at a variant the step does not carry falls back to
/// the step's base template. The subject template (email) renders with the
/// same variables.
pub fn render_step(
    step: &SequenceStep,
    variant_id: Option<&str>,
    prospect: &Prospect,
) -> Result<RenderedMessage, CadenceError> {
    let vars = prospect_vars(prospect);

    let body_template = variant_id
        .and_then(|id| step.variants.iter().find(|v| v.id == id))
        .map(|v| v.template.as_str())
        .unwrap_or(step.message_template.as_str());

    let body = render(body_template, &vars)?;
    let subject = step
        .subject_template
        .as_deref()
        .map(|t| render(t, &vars))
        .transpose()?;

    Ok(RenderedMessage {
        subject,
        body,
        step_type: step.step_type,
    })
}
