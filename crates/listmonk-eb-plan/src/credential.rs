//! Database credential provisioning
//!
//! The password is generated by the secret store when the secret is created.
//! The plan only ever carries the generation policy and dynamic references to
//! the stored fields, never the value itself.

use crate::error::Result;
use crate::plan::Fragment;
use listmonk_eb_types::{Component, LogicalId, Properties, ResolvedParameters, Resource, ResourceKind, Value};
use rand::rngs::OsRng;
use rand::Rng;
use std::fmt;
use tracing::{info, instrument};

/// Fixed database login
pub const DATABASE_USERNAME: &str = "listmonk";

/// Field of the stored secret that holds the generated password
pub const PASSWORD_KEY: &str = "password";

/// Field of the stored secret that holds the username
pub const USERNAME_KEY: &str = "username";

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const PUNCTUATION: &[u8] = b"!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// How the secret store generates the password
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub length: usize,
    pub exclude_punctuation: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            length: 24,
            exclude_punctuation: true,
        }
    }
}

impl PasswordPolicy {
    /// Generate a password with this policy from the OS random source.
    ///
    /// Matches what the secret store does at creation; used to check the
    /// policy and by operators rotating the secret by hand.
    pub fn generate(&self) -> GeneratedPassword {
        let mut charset = ALPHANUMERIC.to_vec();
        if !self.exclude_punctuation {
            charset.extend_from_slice(PUNCTUATION);
        }
        let password = (0..self.length)
            .map(|_| char::from(charset[OsRng.gen_range(0..charset.len())]))
            .collect();
        GeneratedPassword(password)
    }

    /// Whether a candidate password satisfies this policy
    pub fn accepts(&self, candidate: &str) -> bool {
        candidate.chars().count() == self.length
            && candidate.chars().all(|c| {
                c.is_ascii_alphanumeric() || (!self.exclude_punctuation && c.is_ascii_punctuation())
            })
    }

    fn to_properties(self, username: &str) -> Properties {
        Properties::new()
            .with(
                "SecretStringTemplate",
                serde_json::json!({ "username": username }).to_string(),
            )
            .with("GenerateStringKey", PASSWORD_KEY)
            .with("ExcludePunctuation", self.exclude_punctuation)
            .with("PasswordLength", self.length as i64)
    }
}

/// A generated password. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedPassword(String);

impl GeneratedPassword {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for GeneratedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GeneratedPassword(<redacted>)")
    }
}

impl fmt::Display for GeneratedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// The stored database credential
#[derive(Debug, Clone)]
pub struct Credential {
    pub secret: LogicalId,
    pub name: String,
    pub username: String,
    pub policy: PasswordPolicy,
}

impl Credential {
    /// ARN of the secret. Safe to surface; it is a pointer, not the value.
    pub fn secret_arn(&self) -> Value {
        Value::reference(&self.secret)
    }

    pub fn username_value(&self) -> Value {
        Value::secret_field(&self.secret, USERNAME_KEY)
    }

    pub fn password_value(&self) -> Value {
        Value::secret_field(&self.secret, PASSWORD_KEY)
    }
}

#[instrument(skip_all, fields(prefix = %params.prefix))]
pub fn build(params: &ResolvedParameters) -> Result<Fragment<Credential>> {
    let name = format!("{}-db-secret", params.prefix);
    let secret = LogicalId::from_path(&[&format!("{}-DbSecret", params.prefix), "Resource"]);
    let policy = PasswordPolicy::default();

    let resource = Resource::new(secret.clone(), ResourceKind::Secret, Component::Credential)
        .set("Name", name.as_str())
        .set("GenerateSecretString", policy.to_properties(DATABASE_USERNAME));

    info!(secret = %name, length = policy.length, "Database credential declared");

    Ok(Fragment::new(
        Credential {
            secret,
            name,
            username: DATABASE_USERNAME.to_string(),
            policy,
        },
        vec![resource],
    ))
}
