//! Validation rules for scheduling requests

use crate::model::{NewPost, Platform, PostEdit, Recurrence, ScheduledPost};
use crate::ports::ValidationError;
use crate::timezone::parse_timezone;

/// Validate a new scheduling request and normalise its platform list
pub fn validate_new_post(request: &mut NewPost) -> Result<(), ValidationError> {
    validate_text(&request.caption, &request.content)?;

    request.platforms = validate_platforms(&request.platforms)?;
    validate_timezone(&request.timezone)?;
    validate_recurrence(request.recurrence, request.max_recurrences)?;

    if let Some(max_retries) = request.max_retries {
        if max_retries == 0 {
            return Err(ValidationError::InvalidValue {
                field: "max_retries",
                message: "must be at least 1".to_string(),
            });
        }
    }

    Ok(())
}

/// Validate the fields an edit touches and normalise its platform list
pub fn validate_edit(edit: &mut PostEdit) -> Result<(), ValidationError> {
    if let Some(platforms) = edit.platforms.as_ref() {
        edit.platforms = Some(validate_platforms(platforms)?);
    }
    if let Some(timezone) = edit.timezone.as_deref() {
        validate_timezone(timezone)?;
    }
    if let Some(recurrence) = edit.recurrence {
        validate_recurrence(recurrence, edit.max_recurrences)?;
    } else if edit.max_recurrences == Some(0) {
        return Err(zero_max_recurrences());
    }
    Ok(())
}

/// Validate a stored post after an edit has been merged into it
pub fn validate_edited(post: &ScheduledPost) -> Result<(), ValidationError> {
    validate_text(&post.caption, &post.content)?;
    validate_recurrence(post.recurrence, post.max_recurrences)?;

    if let Some(max) = post.max_recurrences {
        if max < post.recurrence_count {
            return Err(ValidationError::InvalidValue {
                field: "max_recurrences",
                message: format!(
                    "{} occurrences already published, cap cannot be lower",
                    post.recurrence_count
                ),
            });
        }
    }
    Ok(())
}

fn validate_text(caption: &str, content: &str) -> Result<(), ValidationError> {
    if caption.trim().is_empty() && content.trim().is_empty() {
        return Err(ValidationError::MissingField("caption"));
    }
    Ok(())
}

/// Non-empty, duplicates removed, first occurrence wins
fn validate_platforms(platforms: &[Platform]) -> Result<Vec<Platform>, ValidationError> {
    if platforms.is_empty() {
        return Err(ValidationError::MissingField("platforms"));
    }

    let mut unique = Vec::with_capacity(platforms.len());
    for platform in platforms {
        if !unique.contains(platform) {
            unique.push(*platform);
        }
    }
    Ok(unique)
}

fn validate_timezone(timezone: &str) -> Result<(), ValidationError> {
    parse_timezone(timezone)
        .map(|_| ())
        .map_err(|e| ValidationError::InvalidValue {
            field: "timezone",
            message: e.to_string(),
        })
}

fn validate_recurrence(
    recurrence: Recurrence,
    max_recurrences: Option<u32>,
) -> Result<(), ValidationError> {
    match recurrence {
        Recurrence::Custom {
            interval_days: None,
        }
        | Recurrence::Custom {
            interval_days: Some(0),
        } => {
            return Err(ValidationError::InvalidValue {
                field: "recurrence_interval",
                message: "custom recurrence needs an interval of at least 1 day".to_string(),
            });
        }
        _ => {}
    }

    if max_recurrences == Some(0) {
        return Err(zero_max_recurrences());
    }

    Ok(())
}

fn zero_max_recurrences() -> ValidationError {
    ValidationError::InvalidValue {
        field: "max_recurrences",
        message: "must be at least 1".to_string(),
    }
}
