use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use tourline_core::{CoreError, CoreResult};

use crate::models::ReviewSubmission;

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 100;
const PHONE_MIN_DIGITS: usize = 8;
const PHONE_MAX_DIGITS: usize = 15;
const REVIEW_TEXT_MAX: usize = 1000;

/// Letters, digits, whitespace, hyphen, apostrophe and period.
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\s\-'.]+$").expect("name pattern compiles"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?)*\.[a-zA-Z]{2,}$",
    )
    .expect("email pattern compiles")
});

/// Trims, checks the allowed alphabet and title-cases a customer name.
pub fn customer_name(raw: &str) -> CoreResult<String> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(NAME_MIN..=NAME_MAX).contains(&len) {
        return Err(CoreError::validation(format!(
            "Customer name must be between {} and {} characters",
            NAME_MIN, NAME_MAX
        )));
    }
    if !NAME_RE.is_match(name) {
        return Err(CoreError::validation("Customer name contains invalid characters"));
    }
    Ok(title_case(name))
}

/// Upper-cases the first letter of every alphabetic run and lower-cases the rest.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut previous_alpha = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if previous_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_alpha = true;
        } else {
            out.push(c);
            previous_alpha = false;
        }
    }
    out
}

pub fn email(raw: &str) -> CoreResult<String> {
    let email = raw.trim();
    if !EMAIL_RE.is_match(email) {
        return Err(CoreError::validation(format!("Invalid email address: {}", email)));
    }
    Ok(email.to_string())
}

/// Phone numbers may carry spaces, dashes, parentheses and a leading plus.
pub fn phone(raw: Option<&str>) -> CoreResult<Option<String>> {
    let Some(phone) = raw.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    let digits: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '+'))
        .collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(CoreError::validation(
            "Phone number must contain only digits and common separators",
        ));
    }
    if !(PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits.len()) {
        return Err(CoreError::validation(format!(
            "Phone number must be between {} and {} digits",
            PHONE_MIN_DIGITS, PHONE_MAX_DIGITS
        )));
    }
    Ok(Some(phone.to_string()))
}

pub fn participants(count: u32, max_per_booking: u32) -> CoreResult<u32> {
    if count < 1 || count > max_per_booking {
        return Err(CoreError::validation(format!(
            "Number of participants must be between 1 and {}",
            max_per_booking
        )));
    }
    Ok(count)
}

pub fn start_in_future(start: NaiveDate, today: NaiveDate) -> CoreResult<()> {
    if start <= today {
        return Err(CoreError::validation("Start date must be in the future"));
    }
    Ok(())
}

pub fn date_range(start: NaiveDate, end: NaiveDate) -> CoreResult<()> {
    if end < start {
        return Err(CoreError::validation("End date must be after start date"));
    }
    Ok(())
}

/// Returns the submission with a trimmed name and text.
pub fn review_submission(submission: &ReviewSubmission) -> CoreResult<ReviewSubmission> {
    if !(1..=5).contains(&submission.rating) {
        return Err(CoreError::validation("Rating must be between 1 and 5"));
    }
    let name = submission.customer_name.trim();
    let name_len = name.chars().count();
    if name_len == 0 || name_len > NAME_MAX {
        return Err(CoreError::validation(format!(
            "Customer name must be between 1 and {} characters",
            NAME_MAX
        )));
    }
    let text = submission
        .review_text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if text.is_some_and(|t| t.chars().count() > REVIEW_TEXT_MAX) {
        return Err(CoreError::validation(format!(
            "Review text must be at most {} characters",
            REVIEW_TEXT_MAX
        )));
    }
    Ok(ReviewSubmission {
        rating: submission.rating,
        review_text: text.map(str::to_string),
        customer_name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_name_title_cased() {
        assert_eq!(customer_name("  mary-jane o'neil ").unwrap(), "Mary-Jane O'Neil");
        assert_eq!(customer_name("DR. ALI").unwrap(), "Dr. Ali");
        assert!(customer_name("a").is_err());
        assert!(customer_name("Robert; DROP").is_err());
        assert!(customer_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_email() {
        assert_eq!(email(" guest@example.com ").unwrap(), "guest@example.com");
        assert!(email("guest@example").is_err());
        assert!(email("@example.com").is_err());
        assert!(email("a b@example.com").is_err());
        assert!(email("a@b@example.com").is_err());
        assert!(email("guest@-example.com").is_err());
        assert_eq!(email("first.last+tours@mail.example.co").unwrap(), "first.last+tours@mail.example.co");
    }

    #[test]
    fn test_phone() {
        assert_eq!(phone(None).unwrap(), None);
        assert_eq!(phone(Some("  ")).unwrap(), None);
        assert_eq!(phone(Some("+212 (600) 12-34-56")).unwrap().as_deref(), Some("+212 (600) 12-34-56"));
        assert!(phone(Some("1234567")).is_err());
        assert!(phone(Some("12345678ab")).is_err());
        assert!(phone(Some("1234567890123456")).is_err());
    }

    #[test]
    fn test_participants_and_dates() {
        assert!(participants(0, 50).is_err());
        assert!(participants(51, 50).is_err());
        assert_eq!(participants(50, 50).unwrap(), 50);

        let today = NaiveDate::from_ymd_opt(2030, 1, 10).unwrap();
        assert!(start_in_future(today, today).is_err());
        assert!(start_in_future(today.succ_opt().unwrap(), today).is_ok());
        assert!(date_range(today, today).is_ok());
        assert!(date_range(today, today.pred_opt().unwrap()).is_err());
    }

    #[test]
    fn test_review_submission() {
        let ok = ReviewSubmission {
            rating: 5,
            review_text: Some("  Wonderful guide  ".to_string()),
            customer_name: " Lea ".to_string(),
        };
        let cleaned = review_submission(&ok).unwrap();
        assert_eq!(cleaned.customer_name, "Lea");
        assert_eq!(cleaned.review_text.as_deref(), Some("Wonderful guide"));

        assert!(review_submission(&ReviewSubmission { rating: 0, ..ok.clone() }).is_err());
        assert!(review_submission(&ReviewSubmission { rating: 6, ..ok.clone() }).is_err());
        assert!(review_submission(&ReviewSubmission { customer_name: " ".to_string(), ..ok.clone() }).is_err());
        assert!(review_submission(&ReviewSubmission { review_text: Some("x".repeat(1001)), ..ok }).is_err());
    }
}
