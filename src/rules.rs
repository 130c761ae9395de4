use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::value::{FieldValue, Values};

pub const PASSWORD_FIELD: &str = "password";
pub const CONFIRM_PASSWORD_FIELD: &str = "confirmPassword";

pub const MANDATORY_ERROR: &str = "This field is mandatory.";
pub const DEFAULT_RULE_ERROR: &str = "Invalid value.";

const PHONE_ERROR: &str = "Please use international format (\"+XX\" or \"00XX\" without spaces).";
const EMAIL_ERROR: &str = "This does not look like a valid email address.";
const PASSWORD_ERROR: &str =
    "Passwords must contain at least 8 characters, 1 uppercase, 1 lowercase & 1 number.";
const CONFIRM_PASSWORD_ERROR: &str = "Passwords do not match.";

// Leading "00" or "+", a known country-code prefix, then up to 14 digits
// (ITU E.164 length bound).
const PHONE_PATTERN: &str = r"^(?:00|\+)(9[976]\d|8[987530]\d|6[987]\d|5[90]\d|42\d|3[875]\d|2[98654321]\d|9[8543210]|8[6421]|6[6543210]|5[87654321]|4[987654310]|3[9643210]|2[70]|7|1)\d{1,14}$";

// RFC-like local-part@domain grammar: quoted or unquoted local part, dotted
// labels or a bracketed IPv4 domain. Matched unanchored against the
// lowercased input.
const EMAIL_PATTERN: &str = r##"(?:[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*|"(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21\x23-\x5b\x5d-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])*")@(?:(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?|\[(?:(?:(2(5[0-5]|[0-4][0-9])|1[0-9][0-9]|[1-9]?[0-9]))\.){3}(?:(2(5[0-5]|[0-4][0-9])|1[0-9][0-9]|[1-9]?[0-9])|[a-z0-9-]*[a-z0-9]:(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21-\x5a\x53-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])+)\])"##;

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(PHONE_PATTERN).expect("phone pattern must compile"))
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern must compile"))
}

/// Rule predicates see the candidate value (`None` when the field is missing
/// from the form) plus the current values snapshot, so cross-field rules
/// always compare against the latest state.
pub type RulePredicate = Arc<dyn Fn(Option<&FieldValue>, &Values) -> bool + Send + Sync>;

pub type Rules = BTreeMap<String, ValidationRule>;

#[derive(Clone)]
pub struct ValidationRule {
    test: RulePredicate,
    error: String,
}

impl ValidationRule {
    pub fn new(
        error: impl Into<String>,
        test: impl Fn(Option<&FieldValue>, &Values) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            test: Arc::new(test),
            error: error.into(),
        }
    }

    pub fn test(&self, value: Option<&FieldValue>, values: &Values) -> bool {
        (self.test)(value, values)
    }

    pub fn error(&self) -> &str {
        &self.error
    }
}

impl std::fmt::Debug for ValidationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationRule")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// Caller-supplied rules, either a static map or a function of the current
/// values. Custom rules win over built-ins on key collision.
#[derive(Clone)]
pub enum CustomRules {
    Static(Rules),
    Dynamic(Arc<dyn Fn(&Values) -> Rules + Send + Sync>),
}

impl CustomRules {
    pub(crate) fn resolve(&self, values: &Values) -> Rules {
        match self {
            CustomRules::Static(rules) => rules.clone(),
            CustomRules::Dynamic(build) => build(values),
        }
    }
}

/// The four built-in rules, keyed by field name.
pub fn standard_rules() -> Rules {
    let mut rules = Rules::new();
    rules.insert(
        "phone".to_owned(),
        ValidationRule::new(PHONE_ERROR, |value, _| {
            value
                .and_then(FieldValue::as_text)
                .is_some_and(|text| phone_regex().is_match(text))
        }),
    );
    rules.insert(
        "email".to_owned(),
        ValidationRule::new(EMAIL_ERROR, |value, _| {
            value
                .and_then(FieldValue::as_text)
                .is_some_and(|text| email_regex().is_match(&text.to_lowercase()))
        }),
    );
    rules.insert(
        PASSWORD_FIELD.to_owned(),
        ValidationRule::new(PASSWORD_ERROR, |value, _| {
            value
                .and_then(FieldValue::as_text)
                .is_some_and(password_is_strong)
        }),
    );
    rules.insert(
        CONFIRM_PASSWORD_FIELD.to_owned(),
        ValidationRule::new(CONFIRM_PASSWORD_ERROR, |value, values| {
            values.get(PASSWORD_FIELD) == value
        }),
    );
    rules
}

/// Built-ins shallow-merged with the caller's custom rules, custom winning.
pub fn resolve_rules(custom: Option<&CustomRules>, values: &Values) -> Rules {
    let mut rules = standard_rules();
    if let Some(custom) = custom {
        rules.extend(custom.resolve(values));
    }
    rules
}

fn password_is_strong(text: &str) -> bool {
    !text.chars().any(char::is_whitespace)
        && text.chars().count() >= 8
        && text.chars().any(|c| c.is_ascii_uppercase())
        && text.chars().any(|c| c.is_ascii_lowercase())
        && text.chars().any(|c| c.is_ascii_digit())
}
