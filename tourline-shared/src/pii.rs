use serde::{Deserialize, Serialize};
use std::fmt;

/// Customer contact data (email, phone) that must not show up verbatim in logs.
///
/// `Debug` and `Display` print a masked form; serialization passes the real value
/// through because API responses and outbound emails need it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T: AsRef<str>> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&mask_contact(self.0.as_ref()))
    }
}

impl<T: AsRef<str>> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&mask_contact(self.0.as_ref()))
    }
}

impl<T> Masked<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<'a> Masked<&'a str> {
    pub fn of(value: &'a str) -> Self {
        Masked(value)
    }
}

/// `jane@example.com` -> `j***@example.com`; anything else keeps its last two characters.
pub fn mask_contact(value: &str) -> String {
    match value.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{}***@{}", first, domain)
        }
        None => {
            let chars: Vec<char> = value.chars().collect();
            let keep = chars.len().saturating_sub(2);
            let tail: String = chars[keep..].iter().collect();
            format!("***{}", tail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_emails_and_phones() {
        assert_eq!(mask_contact("jane@example.com"), "j***@example.com");
        assert_eq!(mask_contact("+212 600 000 042"), "***42");
        assert_eq!(mask_contact(""), "***");
    }

    #[test]
    fn test_debug_never_leaks_but_serde_does() {
        let email = Masked("jane@example.com".to_string());
        assert_eq!(format!("{:?}", email), "j***@example.com");
        assert_eq!(format!("{}", Masked::of("jane@example.com")), "j***@example.com");
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"jane@example.com\"");
    }
}
