// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldName {
    Title,
    Description,
    Name,
    FirstName,
    LastName,
    Username,
    Email,
    Password,
    UpdateContent,
}

impl FieldName {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Name => "name",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Username => "username",
            Self::Email => "email",
            Self::Password => "password",
            Self::UpdateContent => "update_content",
        }
    }
}

pub fn is_present(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Accepts `local@domain.tld`: no whitespace, exactly one `@`, and a dot in
/// the domain with text on both sides of it.
pub fn is_email(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(index, ch)| ch == '.' && index > 0 && index + 1 < domain.len())
}

/// Minimum password length as served by the settings endpoint. Until the
/// setting resolves every password is treated as invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordPolicy {
    #[default]
    Pending,
    MinLength(usize),
}

impl PasswordPolicy {
    pub fn accepts(self, password: &str) -> bool {
        match self {
            Self::Pending => false,
            Self::MinLength(min) => password.trim().chars().count() >= min,
        }
    }
}

pub fn field_is_valid(field: FieldName, value: &str, policy: PasswordPolicy) -> bool {
    match field {
        FieldName::Email => is_email(value),
        FieldName::Password => policy.accepts(value),
        FieldName::Title
        | FieldName::Description
        | FieldName::Name
        | FieldName::FirstName
        | FieldName::LastName
        | FieldName::Username
        | FieldName::UpdateContent => is_present(value),
    }
}

/// Per-field validity for one open form. No aggregate "form is valid" answer
/// is computed; submit-time checks live on the form inputs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormValidator {
    values: BTreeMap<FieldName, String>,
    validity: BTreeMap<FieldName, bool>,
}

impl FormValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field_changed(&mut self, field: FieldName, value: &str, policy: PasswordPolicy) -> bool {
        let valid = field_is_valid(field, value, policy);
        self.values.insert(field, value.to_owned());
        self.validity.insert(field, valid);
        valid
    }

    /// Re-evaluates the password field after the policy changed. Returns the
    /// new validity when a password has been entered.
    pub fn revalidate_password(&mut self, policy: PasswordPolicy) -> Option<bool> {
        let value = self.values.get(&FieldName::Password)?.clone();
        Some(self.field_changed(FieldName::Password, &value, policy))
    }

    pub fn validity(&self, field: FieldName) -> Option<bool> {
        self.validity.get(&field).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldName, FormValidator, PasswordPolicy, field_is_valid, is_email, is_present};

    #[test]
    fn text_fields_require_non_blank_input() {
        assert!(!is_present(""));
        assert!(!is_present("   \t"));
        assert!(is_present(" Printer "));
    }

    #[test]
    fn email_shape_is_checked() {
        assert!(!is_email("not-an-email"));
        assert!(is_email("a@b.co"));
        assert!(is_email("  first.last@corp.example.com "));
        assert!(!is_email("a@b"));
        assert!(!is_email("a@.co"));
        assert!(!is_email("a@b."));
        assert!(!is_email("@b.co"));
        assert!(!is_email("a@b@c.co"));
        assert!(!is_email("a b@c.co"));
        assert!(!is_email(""));
    }

    #[test]
    fn pending_password_policy_rejects_everything() {
        let policy = PasswordPolicy::Pending;
        assert!(!policy.accepts("a-very-long-password-indeed"));
        assert!(!field_is_valid(
            FieldName::Password,
            "a-very-long-password-indeed",
            policy
        ));
    }

    #[test]
    fn resolved_password_policy_compares_trimmed_length() {
        let policy = PasswordPolicy::MinLength(8);
        assert!(!policy.accepts("  short  "));
        assert!(policy.accepts("longenough"));
        assert!(policy.accepts("12345678"));
    }

    #[test]
    fn revalidation_tracks_policy_resolution() {
        let mut validator = FormValidator::new();
        assert!(!validator.field_changed(FieldName::Password, "hunter22", PasswordPolicy::Pending));
        assert_eq!(validator.validity(FieldName::Password), Some(false));

        assert_eq!(
            validator.revalidate_password(PasswordPolicy::MinLength(6)),
            Some(true)
        );
        assert_eq!(validator.validity(FieldName::Password), Some(true));
    }

    #[test]
    fn revalidation_without_password_is_noop() {
        let mut validator = FormValidator::new();
        validator.field_changed(FieldName::Name, "Ops", PasswordPolicy::Pending);
        assert_eq!(validator.revalidate_password(PasswordPolicy::MinLength(4)), None);
        assert_eq!(validator.validity(FieldName::Name), Some(true));
        assert_eq!(validator.validity(FieldName::Password), None);
    }
}
