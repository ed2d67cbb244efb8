// Input validation presets
//
// Each entity wizard picks its presets explicitly. The email/phone/ID policies differ between
// entities on purpose (they are per-entity business rules) and must not be unified here.

use regex::Regex;
use std::sync::OnceLock;

pub const STRUCTURED_ID_LEN: usize = 11;

fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("validation pattern is a valid regex"))
}

fn basic_email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"^\S+@\S+\.\S+$")
}

fn strict_email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
}

fn lenient_phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"^[+]?[0-9\s()\-]{8,}$")
}

fn international_phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"^\+?[0-9\s\-]{10,15}$")
}

fn ten_digit_phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"^[0-9]{10}$")
}

fn structured_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"^[0-9]{2}-[0-9]{6}[A-Z][0-9]{2}$")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailPolicy {
    /// Anything shaped like `a@b.c` (driver onboarding).
    Basic,
    /// Conventional mailbox syntax with a 2+ letter TLD (incidents, users).
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhonePolicy {
    /// 8+ of digits, spaces, dashes, parentheses; optional leading `+` (drivers, mills).
    Lenient,
    /// 10-15 of digits, spaces, dashes; optional leading `+` (incidents, users).
    International,
    /// Exactly 10 digits (miners, team members).
    TenDigits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPolicy {
    MinLength(usize),
    /// `DD-DDDDDDLDD`, produced by [`format_structured_id`].
    Structured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Email(EmailPolicy),
    Phone(PhonePolicy),
    NationalId(IdPolicy),
}

impl Rule {
    /// Returns the error message for a non-empty value that fails the rule.
    /// Emptiness is the required-field check's job, so blank values always pass here.
    pub fn check(&self, label: &str, value: &str) -> Option<String> {
        let v = value.trim();
        if v.is_empty() {
            return None;
        }
        match self {
            Rule::Email(policy) => {
                let re = match policy {
                    EmailPolicy::Basic => basic_email_re(),
                    EmailPolicy::Strict => strict_email_re(),
                };
                if re.is_match(v) {
                    None
                } else {
                    Some("Please enter a valid email address".to_string())
                }
            }
            Rule::Phone(PhonePolicy::TenDigits) => {
                if ten_digit_phone_re().is_match(v) {
                    None
                } else {
                    Some("Phone number must be exactly 10 digits".to_string())
                }
            }
            Rule::Phone(policy) => {
                let re = match policy {
                    PhonePolicy::International => international_phone_re(),
                    _ => lenient_phone_re(),
                };
                if re.is_match(v) {
                    None
                } else {
                    Some("Please enter a valid phone number".to_string())
                }
            }
            Rule::NationalId(IdPolicy::MinLength(n)) => {
                if v.chars().count() < *n {
                    Some(format!("{} must be at least {} characters", label, n))
                } else {
                    None
                }
            }
            Rule::NationalId(IdPolicy::Structured) => validate_structured_id(v).err(),
        }
    }
}

/// Per-keystroke input transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    StructuredId,
}

impl Transform {
    pub fn apply(&self, raw: &str) -> String {
        match self {
            Transform::StructuredId => format_structured_id(raw),
        }
    }
}

/// Normalize a national ID as it is typed: keep letters/digits only, uppercase, cap at 11,
/// and insert the dash after the two-digit district code.
///
/// `"67657432d45"` becomes `"67-657432D45"`.
pub fn format_structured_id(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .take(STRUCTURED_ID_LEN)
        .collect();

    if cleaned.len() <= 2 {
        return cleaned;
    }
    format!("{}-{}", &cleaned[..2], &cleaned[2..])
}

pub fn validate_structured_id(value: &str) -> Result<(), String> {
    let significant = value.chars().filter(|c| c.is_ascii_alphanumeric()).count();
    if significant != STRUCTURED_ID_LEN {
        return Err("ID number must be exactly 11 characters".to_string());
    }
    if !structured_id_re().is_match(value.trim()) {
        return Err("ID number must be in the format 00-000000A00".to_string());
    }
    Ok(())
}
