//! Prompt templates: named formats with `{slot}` placeholders and a fixed premise.
//!
//! A [`PromptTemplate`] is parsed once and is immutable afterwards. Every declared input
//! variable must occur exactly once in the template text and every placeholder must be
//! declared; `{{` and `}}` render as literal braces. Rendering fails with
//! [`TemplateError::MissingValue`] when a declared slot has no value.
//!
//! Default templates live in `coach/prompts/*.yaml` and are embedded at compile time;
//! see [`load`], [`load_or_default`] and [`PromptCatalog`].

mod load;

pub use load::{default_from_embedded, load, load_or_default, LoadError};

use std::collections::HashMap;

use thiserror::Error;

/// Slot holding the fixed instructional preamble.
pub const PREMISE: &str = "premise";
/// Slot holding system-curated context (retrieved documents, prior plan).
pub const INTERNAL_DATA: &str = "internal_data";
/// Slot holding user-originated text.
pub const EXTERNAL_DATA: &str = "external_data";

/// Template construction or rendering error. Fatal for the request; never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template slot `{0}` has no value")]
    MissingValue(String),
    #[error("placeholder `{0}` is not a declared input variable")]
    UndeclaredSlot(String),
    #[error("input variable `{name}` must appear exactly once in the template, found {count}")]
    SlotCount { name: String, count: usize },
    #[error("malformed template: {0}")]
    Parse(String),
    #[error("unknown template `{0}`")]
    UnknownTemplate(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(String),
}

/// Immutable named format with an ordered list of input variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: String,
    input_variables: Vec<String>,
    template: String,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parses `template` and checks it against `input_variables`.
    pub fn new(
        name: impl Into<String>,
        input_variables: Vec<String>,
        template: impl Into<String>,
    ) -> Result<Self, TemplateError> {
        let template = template.into();
        let segments = parse_segments(&template)?;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for seg in &segments {
            if let Segment::Slot(slot) = seg {
                if !input_variables.iter().any(|v| v == slot) {
                    return Err(TemplateError::UndeclaredSlot(slot.clone()));
                }
                *counts.entry(slot.as_str()).or_default() += 1;
            }
        }
        for var in &input_variables {
            let count = counts.get(var.as_str()).copied().unwrap_or(0);
            if count != 1 {
                return Err(TemplateError::SlotCount {
                    name: var.clone(),
                    count,
                });
            }
        }

        Ok(Self {
            name: name.into(),
            input_variables,
            template,
            segments,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    /// The literal template text, placeholders included.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Renders with arbitrary named slot values. Values for undeclared names are ignored.
    pub fn render_with(&self, values: &[(&str, &str)]) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.template.len());
        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Slot(slot) => {
                    let value = values
                        .iter()
                        .find(|(k, _)| k == slot)
                        .map(|(_, v)| *v)
                        .ok_or_else(|| TemplateError::MissingValue(slot.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    /// Renders the premise plus up to two data blocks.
    ///
    /// Templates that declare only one data block accept `None` for the other one;
    /// a declared block given `None` is a [`TemplateError::MissingValue`].
    pub fn render(
        &self,
        premise: &str,
        internal_data: Option<&str>,
        external_data: Option<&str>,
    ) -> Result<String, TemplateError> {
        let mut values = vec![(PREMISE, premise)];
        if let Some(v) = internal_data {
            values.push((INTERNAL_DATA, v));
        }
        if let Some(v) = external_data {
            values.push((EXTERNAL_DATA, v));
        }
        self.render_with(&values)
    }
}

/// Splits template text into literals and `{slot}` placeholders.
fn parse_segments(template: &str) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                literal.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                literal.push('}');
            }
            '}' => {
                return Err(TemplateError::Parse(format!("unmatched `}}` at byte {}", i)));
            }
            '{' => {
                let rest = &template[i + 1..];
                let end = rest
                    .find('}')
                    .ok_or_else(|| TemplateError::Parse(format!("unclosed `{{` at byte {}", i)))?;
                let slot = &rest[..end];
                if slot.is_empty() || !slot.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    return Err(TemplateError::Parse(format!(
                        "invalid placeholder `{{{}}}` at byte {}",
                        slot, i
                    )));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Slot(slot.to_string()));
                // Skip the slot name and the closing brace.
                for _ in 0..slot.chars().count() + 1 {
                    chars.next();
                }
            }
            _ => literal.push(c),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// A template together with the premise it is rendered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPrompt {
    pub premise: String,
    pub template: PromptTemplate,
}

impl TaskPrompt {
    /// Renders [`PromptTemplate::render`] with this prompt's premise.
    pub fn render(
        &self,
        internal_data: Option<&str>,
        external_data: Option<&str>,
    ) -> Result<String, TemplateError> {
        self.template
            .render(&self.premise, internal_data, external_data)
    }
}

/// Named task prompts (`email`, `plan`, `chat`, `summary`, ...).
#[derive(Debug, Clone, Default)]
pub struct PromptCatalog {
    prompts: HashMap<String, TaskPrompt>,
}

impl PromptCatalog {
    pub fn insert(&mut self, prompt: TaskPrompt) {
        self.prompts
            .insert(prompt.template.name().to_string(), prompt);
    }

    pub fn get(&self, name: &str) -> Result<&TaskPrompt, TemplateError> {
        self.prompts
            .get(name)
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))
    }

    /// Template names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.prompts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
