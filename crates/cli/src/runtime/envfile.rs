//! `.env` file parsing
//!
//! Supports `KEY=VALUE`, `KEY="VALUE"`, `KEY='VALUE'`, `#` comments, and
//! blank lines.

use std::path::Path;

/// A single KEY=VALUE pair, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EnvFileError {
    #[error("open env file: {0}")]
    Io(std::io::Error),
    #[error("line {line}: missing '='")]
    MissingEquals { line: usize },
}

pub fn parse_env_file(path: &Path) -> Result<Vec<EnvEntry>, EnvFileError> {
    let content = std::fs::read_to_string(path).map_err(EnvFileError::Io)?;
    parse_env(&content)
}

fn parse_env(content: &str) -> Result<Vec<EnvEntry>, EnvFileError> {
    let mut entries = Vec::new();

    for (index, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some(eq) = line.find('=') else {
            return Err(EnvFileError::MissingEquals { line: index + 1 });
        };

        let key = line[..eq].trim().to_string();
        let mut value = line[eq + 1..].trim();

        if value.len() >= 2 {
            let bytes = value.as_bytes();
            let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
            if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
                value = &value[1..value.len() - 1];
            }
        }

        entries.push(EnvEntry {
            key,
            value: value.to_string(),
        });
    }

    Ok(entries)
}
