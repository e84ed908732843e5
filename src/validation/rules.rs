use std::borrow::Cow;

use validator::ValidationError;

use crate::database::models::ProjectStatus;

fn rejected(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Character count after trimming, inclusive bounds.
fn trimmed_length(
    value: &str,
    min: usize,
    max: usize,
    message: &'static str,
) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if (min..=max).contains(&len) {
        Ok(())
    } else {
        Err(rejected("length", message))
    }
}

pub fn username_length(value: &str) -> Result<(), ValidationError> {
    trimmed_length(value, 3, 30, "Username must be between 3 and 30 characters")
}

pub fn login_handle(value: &str) -> Result<(), ValidationError> {
    trimmed_length(value, 1, usize::MAX, "Username and password are required")
}

pub fn title_length(value: &str) -> Result<(), ValidationError> {
    trimmed_length(value, 3, 100, "Title must be between 3 and 100 characters")
}

pub fn description_length(value: &str) -> Result<(), ValidationError> {
    trimmed_length(value, 10, 1000, "Description must be between 10 and 1000 characters")
}

pub fn accepted_status(value: &str) -> Result<(), ValidationError> {
    if ProjectStatus::ACCEPTED.contains(&value) {
        Ok(())
    } else {
        Err(rejected(
            "status",
            "Status must be one of draft, published, archived, Completed, In Progress",
        ))
    }
}

/// Blank strings pass; anything else must be an absolute http(s) URL.
pub fn is_empty_or_absolute_url(value: &str) -> bool {
    let value = value.trim();
    value.is_empty()
        || url::Url::parse(value)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
            .unwrap_or(false)
}

fn link(value: &str, message: &'static str) -> Result<(), ValidationError> {
    if is_empty_or_absolute_url(value) {
        Ok(())
    } else {
        Err(rejected("url", message))
    }
}

pub fn github_url(value: &str) -> Result<(), ValidationError> {
    link(value, "GitHub URL must be a valid URL")
}

pub fn live_url(value: &str) -> Result<(), ValidationError> {
    link(value, "Live URL must be a valid URL")
}

pub fn image_url(value: &str) -> Result<(), ValidationError> {
    link(value, "Image must be a valid URL")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_accept_blank_or_absolute_http_urls() {
        assert!(is_empty_or_absolute_url(""));
        assert!(is_empty_or_absolute_url("   "));
        assert!(is_empty_or_absolute_url("https://github.com/folio/site"));
        assert!(is_empty_or_absolute_url("http://localhost:3000/demo"));
        assert!(!is_empty_or_absolute_url("github.com/folio"));
        assert!(!is_empty_or_absolute_url("ftp://files.example.com"));
    }

    #[test]
    fn link_errors_carry_the_field_message() {
        let err = live_url("nope").unwrap_err();
        assert_eq!(err.message.as_deref(), Some("Live URL must be a valid URL"));
        assert!(github_url("").is_ok());
    }

    #[test]
    fn lengths_are_counted_after_trimming() {
        assert!(title_length("  abc  ").is_ok());
        assert!(title_length("ééé").is_ok());
        assert!(title_length(" ab ").is_err());
        assert!(username_length(&"x".repeat(31)).is_err());
        assert!(login_handle("   ").is_err());
    }

    #[test]
    fn status_must_be_an_accepted_label() {
        assert!(accepted_status("In Progress").is_ok());
        assert!(accepted_status("Completed").is_ok());
        assert!(accepted_status("shipped").is_err());
    }
}
