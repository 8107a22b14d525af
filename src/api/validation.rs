//! Form validation chains.
//!
//! Each submitted field runs through its own ordered list of sanitizers and
//! rules. A field stops at its first failing rule, but every field is checked,
//! so one submission can report several errors at once.

use std::collections::HashMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;

use crate::db::Store;

/// A decoded `application/x-www-form-urlencoded` body. Missing fields read as "".
pub type RawForm = HashMap<String, String>;

pub mod messages {
    pub const FIRSTNAME_REQUIRED: &str = "Must provide a first name.";
    pub const LASTNAME_REQUIRED: &str = "Must provide a last name.";
    pub const EMAIL_REQUIRED: &str = "Must provide an email address.";
    pub const EMAIL_INVALID: &str = "Please enter a valid email (eg. example@gmail.com).";
    pub const EMAIL_TAKEN: &str = "A user already exists with this email address.";
    pub const PASSWORD_TOO_SHORT: &str = "Password must at least be 8 characters long.";
    pub const PASSWORD_WEAK: &str = "Password must be at least 8 characters long and include at least one lowercase letter, one uppercase letter, one digit, and one special character (e.g., !, @, #, $, %, etc.).";
    pub const CONFIRMATION_REQUIRED: &str = "Must confirm the password.";
    pub const PASSWORDS_DIFFER: &str = "Passwords do not match.";
    pub const LOGIN_PASSWORD_REQUIRED: &str = "Must provide a password";
    pub const PASSCODE_REQUIRED: &str = "Must provide the password.";
    pub const PASSCODE_INCORRECT: &str = "Incorrect password.";
    pub const TITLE_REQUIRED: &str = "Must provide a title.";
    pub const TEXT_REQUIRED: &str = "Must provide a message.";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Lookup used by the asynchronous email uniqueness rule.
#[async_trait]
pub trait EmailRegistry: Send + Sync {
    async fn is_registered(&self, email: &str) -> anyhow::Result<bool>;
}

#[async_trait]
impl EmailRegistry for Store {
    async fn is_registered(&self, email: &str) -> anyhow::Result<bool> {
        self.email_exists(email).await
    }
}

#[derive(Debug, Clone)]
pub enum Rule {
    Trim,
    /// Neutralizes markup: `& < > " ' /` become entities.
    Escape,
    Lowercase,
    NotEmpty(&'static str),
    MinLength(usize, &'static str),
    Email(&'static str),
    StrongPassword(&'static str),
    /// Must equal the already-sanitized value of another field.
    SameAs(&'static str, &'static str),
    /// Must equal a configured shared secret.
    Secret(String, &'static str),
    /// Fails if a user with this email exists.
    EmailAvailable(&'static str),
}

#[derive(Debug, Clone)]
pub struct FieldChain {
    field: &'static str,
    rules: Vec<Rule>,
}

impl FieldChain {
    #[must_use]
    pub const fn new(field: &'static str) -> Self {
        Self {
            field,
            rules: Vec::new(),
        }
    }

    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    #[must_use]
    pub fn trim(self) -> Self {
        self.rule(Rule::Trim)
    }

    #[must_use]
    pub fn escape(self) -> Self {
        self.rule(Rule::Escape)
    }

    #[must_use]
    pub fn lowercase(self) -> Self {
        self.rule(Rule::Lowercase)
    }

    #[must_use]
    pub fn not_empty(self, message: &'static str) -> Self {
        self.rule(Rule::NotEmpty(message))
    }

    #[must_use]
    pub fn min_length(self, min: usize, message: &'static str) -> Self {
        self.rule(Rule::MinLength(min, message))
    }

    #[must_use]
    pub fn email(self, message: &'static str) -> Self {
        self.rule(Rule::Email(message))
    }

    #[must_use]
    pub fn strong_password(self, message: &'static str) -> Self {
        self.rule(Rule::StrongPassword(message))
    }

    #[must_use]
    pub fn same_as(self, other: &'static str, message: &'static str) -> Self {
        self.rule(Rule::SameAs(other, message))
    }

    #[must_use]
    pub fn secret(self, expected: impl Into<String>, message: &'static str) -> Self {
        self.rule(Rule::Secret(expected.into(), message))
    }

    #[must_use]
    pub fn email_available(self, message: &'static str) -> Self {
        self.rule(Rule::EmailAvailable(message))
    }
}

/// Sanitized values plus every error collected while producing them.
#[derive(Debug, Clone, Default)]
pub struct Validated {
    values: HashMap<&'static str, String>,
    errors: Vec<FieldError>,
}

impl Validated {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Sanitized value of `field`, or "" if the field was never part of the form.
    #[must_use]
    pub fn value(&self, field: &str) -> &str {
        self.values.get(field).map_or("", String::as_str)
    }

    /// Adds an error found after the chains ran (for example a failed login).
    pub fn push_error(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    #[must_use]
    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormValidator {
    chains: Vec<FieldChain>,
}

impl FormValidator {
    #[must_use]
    pub const fn new() -> Self {
        Self { chains: Vec::new() }
    }

    #[must_use]
    pub fn field(mut self, chain: FieldChain) -> Self {
        self.chains.push(chain);
        self
    }

    /// Runs every chain in declaration order.
    ///
    /// # Errors
    ///
    /// Only infrastructure failures (the uniqueness lookup) are errors.
    /// Rule failures are collected in [`Validated::errors`].
    pub async fn validate(
        &self,
        raw: &RawForm,
        registry: &dyn EmailRegistry,
    ) -> anyhow::Result<Validated> {
        let mut outcome = Validated::default();

        for chain in &self.chains {
            let input = raw.get(chain.field).map_or("", String::as_str);
            let (value, error) = run_chain(chain, input, raw, &outcome.values, registry).await?;
            outcome.values.insert(chain.field, value);
            if let Some(message) = error {
                outcome.push_error(chain.field, message);
            }
        }

        Ok(outcome)
    }
}

async fn run_chain(
    chain: &FieldChain,
    input: &str,
    raw: &RawForm,
    sanitized: &HashMap<&'static str, String>,
    registry: &dyn EmailRegistry,
) -> anyhow::Result<(String, Option<&'static str>)> {
    let mut value = input.to_string();

    for rule in &chain.rules {
        let failed = match rule {
            Rule::Trim => {
                value = value.trim().to_string();
                None
            }
            Rule::Escape => {
                value = escape(&value);
                None
            }
            Rule::Lowercase => {
                value = value.to_lowercase();
                None
            }
            Rule::NotEmpty(message) => value.is_empty().then_some(*message),
            Rule::MinLength(min, message) => (value.chars().count() < *min).then_some(*message),
            Rule::Email(message) => (!is_valid_email(&value)).then_some(*message),
            Rule::StrongPassword(message) => (!is_strong_password(&value)).then_some(*message),
            Rule::SameAs(other, message) => {
                let other_value = sanitized
                    .get(other)
                    .or_else(|| raw.get(*other))
                    .map_or("", String::as_str);
                (value != other_value).then_some(*message)
            }
            Rule::Secret(expected, message) => (value != *expected).then_some(*message),
            Rule::EmailAvailable(message) => {
                registry.is_registered(&value).await?.then_some(*message)
            }
        };

        if failed.is_some() {
            return Ok((value, failed));
        }
    }

    Ok((value, None))
}

#[must_use]
pub fn escape(value: &str) -> String {
    html_escape::encode_safe(value).into_owned()
}

#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        )
        .expect("Invalid regex pattern defined in code")
    });
    re.is_match(value)
}

/// Anything outside `[A-Za-z0-9]` counts as special, underscore included.
#[must_use]
pub fn is_special_character(c: char) -> bool {
    !c.is_ascii_alphanumeric()
}

/// At least 8 characters with a lowercase letter, an uppercase letter, a digit
/// and a special character.
#[must_use]
pub fn is_strong_password(value: &str) -> bool {
    value.chars().count() >= 8
        && value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_digit())
        && value.chars().any(is_special_character)
}

// ============================================================================
// Form definitions
// ============================================================================

#[must_use]
pub fn registration_form() -> FormValidator {
    use self::messages::*;

    FormValidator::new()
        .field(
            FieldChain::new("firstname")
                .trim()
                .not_empty(FIRSTNAME_REQUIRED)
                .escape(),
        )
        .field(
            FieldChain::new("lastname")
                .trim()
                .not_empty(LASTNAME_REQUIRED)
                .escape(),
        )
        .field(
            FieldChain::new("email")
                .trim()
                .not_empty(EMAIL_REQUIRED)
                .lowercase()
                .email(EMAIL_INVALID)
                .escape()
                .email_available(EMAIL_TAKEN),
        )
        .field(
            FieldChain::new("password")
                .trim()
                .min_length(8, PASSWORD_TOO_SHORT)
                .strong_password(PASSWORD_WEAK)
                .escape(),
        )
        .field(
            FieldChain::new("password_confirmation")
                .trim()
                .not_empty(CONFIRMATION_REQUIRED)
                .escape()
                .same_as("password", PASSWORDS_DIFFER),
        )
}

#[must_use]
pub fn login_form() -> FormValidator {
    use self::messages::*;

    FormValidator::new()
        .field(
            FieldChain::new("email")
                .trim()
                .not_empty(EMAIL_REQUIRED)
                .lowercase()
                .escape(),
        )
        .field(
            FieldChain::new("password")
                .trim()
                .min_length(8, LOGIN_PASSWORD_REQUIRED)
                .escape(),
        )
}

/// Shared-secret form used by both the membership and the admin upgrade.
#[must_use]
pub fn passcode_form(secret: &str) -> FormValidator {
    use self::messages::*;

    FormValidator::new().field(
        FieldChain::new("passcode")
            .trim()
            .not_empty(PASSCODE_REQUIRED)
            .secret(secret, PASSCODE_INCORRECT),
    )
}

#[must_use]
pub fn message_form() -> FormValidator {
    use self::messages::*;

    FormValidator::new()
        .field(
            FieldChain::new("title")
                .trim()
                .not_empty(TITLE_REQUIRED)
                .escape(),
        )
        .field(
            FieldChain::new("text")
                .trim()
                .not_empty(TEXT_REQUIRED)
                .escape(),
        )
}
