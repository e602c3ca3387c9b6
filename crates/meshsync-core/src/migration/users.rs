//! User identities derived from the contact fields of legacy nodes.
//!
//! The legacy system had no user table: every node carried its owner's
//! email and a free-form name. One user is created per distinct email.

use crate::config::MigrationDefaults;
use crate::error::Result;
use crate::legacy::LegacyNode;
use rand::distr::Alphanumeric;
use rand::Rng;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Characters dropped from usernames.
static NON_SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9\s_-]").unwrap());

/// Runs of whitespace and hyphens.
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

/// A user to be created, before its username is made unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateIdentity {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Slug of the display name; may collide with existing usernames.
    pub base_username: String,
}

/// A freshly generated credential. Only the hash is persisted.
#[derive(Debug, Clone)]
pub struct GeneratedCredential {
    pub clear: String,
    pub hash: String,
}

pub struct UserResolver;

impl UserResolver {
    /// One candidate per distinct email, in order of first appearance.
    ///
    /// Emails are compared case-insensitively. The display name is the
    /// first non-blank owner given for that email, or the email's local
    /// part with dots turned into spaces.
    pub fn extract(nodes: &[LegacyNode]) -> Vec<CandidateIdentity> {
        let mut order: Vec<String> = Vec::new();
        let mut owners: HashMap<String, (String, Option<String>)> = HashMap::new();

        for node in nodes {
            let email = node.email.trim();
            let key = Self::email_key(email);
            let owner = Some(node.owner.trim().to_string()).filter(|o| !o.is_empty());

            match owners.get_mut(&key) {
                Some((_, known @ None)) => *known = owner,
                Some(_) => {}
                None => {
                    order.push(key.clone());
                    owners.insert(key, (email.to_string(), owner));
                }
            }
        }

        order
            .into_iter()
            .filter_map(|key| owners.remove(&key))
            .map(|(email, owner)| {
                let display = owner.unwrap_or_else(|| {
                    email
                        .split('@')
                        .next()
                        .unwrap_or_default()
                        .replace('.', " ")
                });
                let (first, last) = match display.trim().split_once(' ') {
                    Some((first, last)) => (first.to_string(), last.trim().to_string()),
                    None => (display.trim().to_string(), String::new()),
                };

                let mut base_username = slugify(&display);
                if base_username.is_empty() {
                    base_username = slugify(email.split('@').next().unwrap_or_default());
                }
                if base_username.is_empty() {
                    base_username = "user".to_string();
                }

                CandidateIdentity {
                    email,
                    first_name: capitalize(&first),
                    last_name: capitalize(&last),
                    base_username,
                }
            })
            .collect()
    }

    /// Key under which an email is deduplicated.
    pub fn email_key(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// `base`, or `base` followed by the smallest suffix from 2 up that
    /// `exists` reports as free.
    pub fn unique_username(
        base: &str,
        mut exists: impl FnMut(&str) -> Result<bool>,
    ) -> Result<String> {
        let limit = MigrationDefaults::USERNAME_MAX_CHARS;
        let base: String = base.chars().take(limit).collect();
        if !exists(&base)? {
            return Ok(base);
        }

        let mut suffix = 2u32;
        loop {
            let suffix_text = suffix.to_string();
            let stem: String = base
                .chars()
                .take(limit.saturating_sub(suffix_text.len()))
                .collect();
            let candidate = format!("{}{}", stem, suffix_text);
            if !exists(&candidate)? {
                return Ok(candidate);
            }
            suffix += 1;
        }
    }

    /// A random alphanumeric credential and its salted SHA-256.
    pub fn generate_credential() -> GeneratedCredential {
        let mut rng = rand::rng();
        let clear = random_string(&mut rng, MigrationDefaults::CREDENTIAL_LENGTH);
        let salt = random_string(&mut rng, 12);
        let hash = hash_credential(&salt, &clear);
        GeneratedCredential { clear, hash }
    }

    /// Whether `clear` matches a stored hash.
    pub fn verify_credential(stored: &str, clear: &str) -> bool {
        match stored.split('$').collect::<Vec<_>>().as_slice() {
            ["sha256", salt, _] => hash_credential(salt, clear) == stored,
            _ => false,
        }
    }
}

fn random_string(rng: &mut impl Rng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn hash_credential(salt: &str, clear: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(clear.as_bytes());
    format!("sha256${}${}", salt, hex::encode(hasher.finalize()))
}

/// Lowercase ASCII slug: letters, digits, underscores and single hyphens.
pub fn slugify(value: &str) -> String {
    let lowered = value.to_lowercase();
    let cleaned = NON_SLUG.replace_all(&lowered, "");
    SEPARATORS
        .replace_all(cleaned.trim(), "-")
        .trim_matches('-')
        .to_string()
}

/// First character uppercased, the rest lowercased.
fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
