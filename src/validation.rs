//! Structural checks run before any store is touched.

use crate::models::ImageUpload;
use serde::Serialize;
use std::fmt;

pub const MIN_TITLE_CHARS: usize = 3;
pub const MIN_DESCRIPTION_CHARS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every violation found in one submission, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationErrors {
    pub fields: Vec<FieldError>,
}

impl ValidationErrors {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.fields.iter().map(|e| e.message.as_str()).collect();
        f.write_str(&messages.join("; "))
    }
}

pub fn validate_submission(
    title: &str,
    description: &str,
    image: Option<&ImageUpload>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    if title.chars().count() < MIN_TITLE_CHARS {
        errors.push(
            "title",
            format!("Title must be at least {MIN_TITLE_CHARS} characters"),
        );
    }
    if description.chars().count() < MIN_DESCRIPTION_CHARS {
        errors.push(
            "description",
            format!("Description must be at least {MIN_DESCRIPTION_CHARS} characters"),
        );
    }
    if let Some(image) = image {
        if image.data.is_empty() {
            errors.push("image", "Image data cannot be empty");
        }
        if let Some(ct) = image.resolved_content_type() {
            if !ct.starts_with("image/") {
                errors.push("image", format!("Unsupported image type: {ct}"));
            }
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
