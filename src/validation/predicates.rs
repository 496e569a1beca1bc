//! Named field predicates.
//!
//! Every rule in a [`Schema`](super::Schema) and every live hint resolves to
//! one of these functions through [`Predicate::test`]. Nothing else in the
//! crate checks lengths or character classes on form values.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9_%+\-']+(?:\.[A-Za-z0-9_%+\-']+)*@(?:[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$",
    )
    .expect("email regex is valid")
});

static DIGIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]").expect("digit regex is valid"));

static UPPERCASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z]").expect("uppercase regex is valid"));

static LOWERCASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z]").expect("lowercase regex is valid"));

/// Value is present and not blank.
pub fn is_present(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Value looks like an email address.
pub fn is_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Value is at least `min` characters long (counted in chars, not bytes).
pub fn has_min_length(value: &str, min: usize) -> bool {
    value.chars().count() >= min
}

/// Value is at most `max` characters long.
pub fn has_max_length(value: &str, max: usize) -> bool {
    value.chars().count() <= max
}

pub fn contains_digit(value: &str) -> bool {
    DIGIT_RE.is_match(value)
}

pub fn contains_uppercase(value: &str) -> bool {
    UPPERCASE_RE.is_match(value)
}

pub fn contains_lowercase(value: &str) -> bool {
    LOWERCASE_RE.is_match(value)
}

pub fn matches_pattern(value: &str, pattern: &Regex) -> bool {
    pattern.is_match(value)
}

/// Two field values are identical.
pub fn values_equal(value: &str, other: &str) -> bool {
    value == other
}

/// A single-field check, compiled and ready to run.
#[derive(Debug, Clone)]
pub enum Predicate {
    Required,
    Email,
    MinLength(usize),
    MaxLength(usize),
    ContainsDigit,
    ContainsUppercase,
    ContainsLowercase,
    Pattern(Regex),
}

impl Predicate {
    /// Run the predicate against a value. Missing values are passed in as `""`.
    pub fn test(&self, value: &str) -> bool {
        match self {
            Self::Required => is_present(value),
            Self::Email => is_email(value),
            Self::MinLength(min) => has_min_length(value, *min),
            Self::MaxLength(max) => has_max_length(value, *max),
            Self::ContainsDigit => contains_digit(value),
            Self::ContainsUppercase => contains_uppercase(value),
            Self::ContainsLowercase => contains_lowercase(value),
            Self::Pattern(re) => matches_pattern(value, re),
        }
    }

    /// Message used when a rule doesn't carry its own.
    pub fn default_message(&self) -> String {
        match self {
            Self::Required => "Required".to_string(),
            Self::Email => "Invalid email".to_string(),
            Self::MinLength(min) => format!("Must contain at least {min} character(s)"),
            Self::MaxLength(max) => format!("Must contain at most {max} character(s)"),
            Self::ContainsDigit => "Must contain a number".to_string(),
            Self::ContainsUppercase => "Must contain an uppercase letter".to_string(),
            Self::ContainsLowercase => "Must contain a lowercase letter".to_string(),
            Self::Pattern(re) => format!("Must match {}", re.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_email("a@b.com"));
        assert!(is_email("john.doe+evia@mail.example.org"));
        assert!(!is_email(""));
        assert!(!is_email("johndoe"));
        assert!(!is_email("john@"));
        assert!(!is_email("john@localhost"));
        assert!(!is_email("john..doe@mail.com"));
        assert!(!is_email("john doe@mail.com"));
        assert!(!is_email("a@b.c"));
        assert!(!is_email("a@b.c0m"));
        assert!(!is_email(".a@b.com"));
        assert!(!is_email("a.@b.com"));
        assert!(is_email("o'brien@mail.ie"));
    }

    #[test]
    fn length_counts_chars() {
        assert!(has_min_length("Abcdefg1", 8));
        assert!(!has_min_length("Abcdef1", 8));
        // 4 chars, 8 bytes
        assert!(!has_min_length("ääää", 5));
        assert!(has_max_length("ääää", 4));
        assert!(has_min_length("", 0));
    }

    #[test]
    fn character_classes() {
        assert!(contains_digit("abc1"));
        assert!(!contains_digit("abcd"));
        assert!(contains_uppercase("abcD"));
        assert!(!contains_uppercase("abcd1"));
        assert!(contains_lowercase("ABCd"));
        assert!(!contains_lowercase("ABC1"));
    }

    #[test]
    fn empty_value_fails_every_content_check() {
        for p in [
            Predicate::Required,
            Predicate::Email,
            Predicate::MinLength(1),
            Predicate::ContainsDigit,
            Predicate::ContainsUppercase,
            Predicate::ContainsLowercase,
        ] {
            assert!(!p.test(""), "{p:?} should fail on empty input");
        }
    }

    #[test]
    fn required_rejects_whitespace() {
        assert!(!Predicate::Required.test("   \n"));
        assert!(Predicate::Required.test(" x "));
    }

    #[test]
    fn pattern_predicate() {
        let p = Predicate::Pattern(Regex::new(r"^\d{4}$").unwrap());
        assert!(p.test("2024"));
        assert!(!p.test("20x4"));
        assert_eq!(p.default_message(), r"Must match ^\d{4}$");
    }
}
