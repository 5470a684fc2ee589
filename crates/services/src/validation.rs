//! Input checks run before any side effect.

use domains::{AppError, NewFeedback, ReceiverMethod, Result, SendMessage};

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_CONTENT_CHARS: usize = 5000;

pub fn validate_send(request: &SendMessage) -> Result<()> {
    let identifier = require("receiverIdentifier", &request.receiver_identifier)?;
    require("title", &request.title)?;
    require("content", &request.content)?;
    max_chars("title", &request.title, MAX_TITLE_CHARS)?;
    max_chars("content", &request.content, MAX_CONTENT_CHARS)?;
    check_recipient(request.receiver_method, identifier)
}

pub fn validate_feedback(feedback: &NewFeedback) -> Result<()> {
    let email = require("email", &feedback.email)?;
    if !looks_like_email(email) {
        return Err(AppError::Validation("email is not a valid address".into()));
    }
    require("content", &feedback.content)?;
    max_chars("content", &feedback.content, MAX_CONTENT_CHARS)
}

fn require<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

fn max_chars(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(AppError::Validation(format!("{field} must be at most {max} characters")));
    }
    Ok(())
}

fn check_recipient(method: ReceiverMethod, identifier: &str) -> Result<()> {
    let ok = match method {
        ReceiverMethod::Email => looks_like_email(identifier),
        ReceiverMethod::Phone => looks_like_phone(identifier),
        ReceiverMethod::Username => !identifier.chars().any(char::is_whitespace),
        ReceiverMethod::ProfileLink => true,
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::Validation(format!("receiverIdentifier is not a valid {method}")))
    }
}

fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn looks_like_phone(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit())
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'))
}
