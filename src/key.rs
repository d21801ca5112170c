//! Key derivation
//!
//! Computes the storage key of a row from its store's key policy.
//!
//! ## Policy Language
//! ```text
//! _UUID4KEY        fresh random 128-bit id, hex
//! _EXACT:<key>     the literal <key>
//! a+b+c            SHA-1 hex of str(a) + str(b) + str(c)
//! !a+b+c           str(a) + str(b) + str(c), unhashed
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha1::{Digest, Sha1};

use crate::error::{Result, StoreError};

const GENERATED_TOKEN: &str = "_UUID4KEY";
const EXACT_PREFIX: &str = "_EXACT:";
const NO_HASH_PREFIX: char = '!';
const ATTRIBUTE_SEPARATOR: char = '+';

/// Rule producing a row's storage key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KeyPolicy {
    /// Every row is stored under this literal key
    Exact(String),

    /// A random UUIDv4 per insert; never checked against existing keys
    Generated,

    /// Concatenation of attribute values in declaration order
    Attributes { attributes: Vec<String>, hashed: bool },
}

impl KeyPolicy {
    pub fn exact(key: impl Into<String>) -> Self {
        KeyPolicy::Exact(key.into())
    }

    /// SHA-1 of the concatenated attributes
    pub fn hashed<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeyPolicy::Attributes {
            attributes: attributes.into_iter().map(Into::into).collect(),
            hashed: true,
        }
    }

    /// Concatenated attributes used verbatim
    pub fn raw<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeyPolicy::Attributes {
            attributes: attributes.into_iter().map(Into::into).collect(),
            hashed: false,
        }
    }

    /// Parse a policy string
    pub fn parse(policy: &str) -> Result<Self> {
        if policy == GENERATED_TOKEN {
            return Ok(KeyPolicy::Generated);
        }

        if let Some(key) = policy.strip_prefix(EXACT_PREFIX) {
            if key.is_empty() {
                return Err(StoreError::InvalidKeyPolicy(
                    "exact key policy with empty key".to_string(),
                ));
            }
            return Ok(KeyPolicy::Exact(key.to_string()));
        }

        let (body, hashed) = match policy.strip_prefix(NO_HASH_PREFIX) {
            Some(rest) => (rest, false),
            None => (policy, true),
        };

        let attributes: Vec<String> = body
            .split(ATTRIBUTE_SEPARATOR)
            .map(|a| a.trim().to_string())
            .collect();

        if attributes.iter().any(String::is_empty) {
            return Err(StoreError::InvalidKeyPolicy(format!(
                "empty attribute name in {:?}",
                policy
            )));
        }

        Ok(KeyPolicy::Attributes { attributes, hashed })
    }

    /// Compute the key for a row
    pub fn derive(&self, row: &Map<String, Value>) -> Result<String> {
        match self {
            KeyPolicy::Exact(key) => Ok(key.clone()),
            KeyPolicy::Generated => Ok(uuid::Uuid::new_v4().simple().to_string()),
            KeyPolicy::Attributes { attributes, hashed } => {
                let mut seed = String::new();
                for attribute in attributes {
                    let value = row
                        .get(attribute)
                        .ok_or_else(|| StoreError::MissingKeyAttribute(attribute.clone()))?;
                    seed.push_str(&render(value));
                }

                if *hashed {
                    Ok(sha1_hex(&seed))
                } else {
                    Ok(seed)
                }
            }
        }
    }

    /// Same entity, same key
    pub fn is_deterministic(&self) -> bool {
        !matches!(self, KeyPolicy::Generated)
    }

    /// Attribute names the key is built from (empty for other policies)
    pub fn attributes(&self) -> &[String] {
        match self {
            KeyPolicy::Attributes { attributes, .. } => attributes,
            _ => &[],
        }
    }
}

/// Text form of an attribute value
///
/// Booleans render as `True` / `False`, the form existing documents were
/// keyed with.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn sha1_hex(seed: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(seed.as_bytes());
    hex::encode(hasher.finalize())
}

impl FromStr for KeyPolicy {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        KeyPolicy::parse(s)
    }
}

impl TryFrom<String> for KeyPolicy {
    type Error = StoreError;

    fn try_from(s: String) -> Result<Self> {
        KeyPolicy::parse(&s)
    }
}

impl From<KeyPolicy> for String {
    fn from(policy: KeyPolicy) -> Self {
        policy.to_string()
    }
}

impl fmt::Display for KeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPolicy::Exact(key) => write!(f, "{}{}", EXACT_PREFIX, key),
            KeyPolicy::Generated => f.write_str(GENERATED_TOKEN),
            KeyPolicy::Attributes { attributes, hashed } => {
                if !hashed {
                    write!(f, "{}", NO_HASH_PREFIX)?;
                }
                f.write_str(&attributes.join("+"))
            }
        }
    }
}
