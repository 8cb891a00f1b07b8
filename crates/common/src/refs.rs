//! Secret reference grammar
//!
//! ```text
//! jingui://<vault>/<item>/<field>
//! jingui://<vault>/<item>/<section>/<field>
//! op://<vault>/<item>/<field>
//! op://<vault>/<item>/<section>/<field>
//! ```
//!
//! All segments must be non-empty; three segments denote the default (empty)
//! section. The `op://` scheme is accepted for compatibility with an
//! adjacent credentials ecosystem and parses identically.

const JINGUI_SCHEME: &str = "jingui://";
const OP_SCHEME: &str = "op://";

/// A parsed secret reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRef {
    pub vault: String,
    pub item: String,
    /// Empty for a 3-segment reference.
    pub section: String,
    pub field: String,
    /// The input string, verbatim.
    pub raw: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RefError {
    #[error("not a secret reference: {0:?}")]
    NotARef(String),
    #[error("invalid secret reference {0:?}: expected 3 or 4 non-empty path segments")]
    Malformed(String),
}

/// Returns true if the value carries a known reference scheme prefix.
pub fn is_ref(value: &str) -> bool {
    value.starts_with(JINGUI_SCHEME) || value.starts_with(OP_SCHEME)
}

impl SecretRef {
    /// Parse a `jingui://` or `op://` reference.
    pub fn parse(raw: &str) -> Result<Self, RefError> {
        let body = raw
            .strip_prefix(JINGUI_SCHEME)
            .or_else(|| raw.strip_prefix(OP_SCHEME))
            .ok_or_else(|| RefError::NotARef(raw.to_string()))?;

        let parts: Vec<&str> = body.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(RefError::Malformed(raw.to_string()));
        }

        match parts.as_slice() {
            [vault, item, field] => Ok(SecretRef {
                vault: vault.to_string(),
                item: item.to_string(),
                section: String::new(),
                field: field.to_string(),
                raw: raw.to_string(),
            }),
            [vault, item, section, field] => Ok(SecretRef {
                vault: vault.to_string(),
                item: item.to_string(),
                section: section.to_string(),
                field: field.to_string(),
                raw: raw.to_string(),
            }),
            _ => Err(RefError::Malformed(raw.to_string())),
        }
    }
}
