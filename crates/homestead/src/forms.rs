//! Field-level validation errors shared by every HTML form.

use std::collections::BTreeMap;

/// Errors collected while validating a submitted form.
///
/// Field errors are keyed by the input's `name` attribute so the page can
/// render them next to the offending control; form errors apply to the
/// submission as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
    form: Vec<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add_field(name, message);
        errors
    }

    pub fn form(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add_form(message);
        errors
    }

    pub fn add_field(&mut self, name: &str, message: impl Into<String>) {
        self.fields
            .entry(name.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_form(&mut self, message: impl Into<String>) {
        self.form.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.form.is_empty()
    }

    pub fn for_field(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn form_errors(&self) -> &[String] {
        &self.form
    }

    /// `Ok(value)` when nothing was recorded, otherwise the collected errors.
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut messages = self.form.iter().cloned().collect::<Vec<_>>();
        for (field, errors) in &self.fields {
            for error in errors {
                messages.push(format!("{field}: {error}"));
            }
        }
        write!(f, "{}", messages.join("; "))
    }
}

/// Trim a required text input and enforce its length bounds.
pub(crate) fn required_text(
    errors: &mut FormErrors,
    field: &str,
    label: &str,
    value: &str,
    max_len: usize,
) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add_field(field, format!("{label} is required"));
    } else if trimmed.chars().count() > max_len {
        errors.add_field(
            field,
            format!("{label} must be at most {max_len} characters"),
        );
    }
    trimmed.to_string()
}
