use rust_decimal::Decimal;
use validator::{ValidationError, ValidationErrors};

/// Largest accepted expense amount
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(99_999_999, 0, 0, false, 2);

pub const MAX_TAGS: usize = 10;
pub const MAX_TAG_LENGTH: usize = 50;

fn error(code: &'static str, message: impl Into<String>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into().into());
    error
}

/// Validates that an amount is positive, at most 999,999.99 and has no more than 2 decimal places
pub fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        return Err(error("invalid_amount", "Amount must be greater than 0"));
    }
    if *amount > MAX_AMOUNT {
        return Err(error("invalid_amount", "Amount cannot exceed 999999.99"));
    }
    if amount.normalize().scale() > 2 {
        return Err(error(
            "invalid_amount",
            "Amount cannot have more than 2 decimal places",
        ));
    }
    Ok(())
}

/// Validates a `#RRGGBB` color string
pub fn validate_color(color: &str) -> Result<(), ValidationError> {
    let valid = color
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()));

    if valid {
        Ok(())
    } else {
        Err(error(
            "invalid_color",
            format!("'{}' is not a valid hex color (expected #RRGGBB)", color),
        ))
    }
}

/// Validates that a string contains something other than whitespace
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("blank", "Value cannot be empty"));
    }
    Ok(())
}

/// Validates the tag list: at most 10 tags, each at most 50 characters
pub fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(error(
            "too_many_tags",
            format!("At most {} tags are allowed", MAX_TAGS),
        ));
    }
    if let Some(tag) = tags
        .iter()
        .find(|tag| tag.trim().chars().count() > MAX_TAG_LENGTH)
    {
        return Err(error(
            "tag_too_long",
            format!("Tag '{}' exceeds {} characters", tag, MAX_TAG_LENGTH),
        ));
    }
    Ok(())
}

/// Trim an optional text field; empty values become `None`
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trim each tag and drop empty ones
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// A single invalid field and the reason it was rejected
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Flatten validation errors into one entry per failed rule, ordered by field name
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| FieldError {
                field: field.to_string(),
                message: e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })
        })
        .collect();

    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

/// `receipt_filename` -> `receiptFilename`, matching JSON body field names
pub fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
