//! Merge `.env` entries with the process environment and split the result
//! into plain variables and `jingui://` references to resolve.

use jingui_common::refs;

use super::envfile::EnvEntry;

/// Result of scanning the merged environment.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Variables ready to pass to the child, in first-seen order.
    pub plain_env: Vec<(String, String)>,
    /// (variable name, reference string) pairs still to resolve.
    pub refs: Vec<(String, String)>,
}

/// Merge `.env` entries over the current process environment; file entries
/// win on conflicts.
pub fn merge_with_process_env(entries: &[EnvEntry]) -> ScanResult {
    merge(std::env::vars().collect(), entries)
}

fn merge(base: Vec<(String, String)>, entries: &[EnvEntry]) -> ScanResult {
    let mut keys: Vec<String> = Vec::new();
    let mut values: std::collections::HashMap<String, String> = std::collections::HashMap::new();

    for (key, value) in base {
        if !values.contains_key(&key) {
            keys.push(key.clone());
        }
        values.insert(key, value);
    }
    for entry in entries {
        if !values.contains_key(&entry.key) {
            keys.push(entry.key.clone());
        }
        values.insert(entry.key.clone(), entry.value.clone());
    }

    let mut result = ScanResult::default();
    for key in keys {
        let value = values.remove(&key).unwrap_or_default();
        if refs::is_ref(&value) {
            result.refs.push((key, value));
        } else {
            result.plain_env.push((key, value));
        }
    }
    result
}

#[cfg(test)]
mod test {
    use super::*;

    fn entry(key: &str, value: &str) -> EnvEntry {
        EnvEntry {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn test_file_overrides_process_env() {
        let base = vec![("PATH".to_string(), "/bin".to_string())];
        let result = merge(base, &[entry("PATH", "/override")]);
        assert_eq!(result.plain_env, vec![("PATH".to_string(), "/override".to_string())]);
        assert!(result.refs.is_empty());
    }

    #[test]
    fn test_refs_are_split_out() {
        let base = vec![("HOME".to_string(), "/root".to_string())];
        let result = merge(
            base,
            &[
                entry("DB_PASSWORD", "jingui://vault/item/password"),
                entry("API_KEY", "op://vault/item/key"),
                entry("PLAIN", "value"),
            ],
        );
        assert_eq!(result.plain_env.len(), 2);
        assert_eq!(
            result.refs,
            vec![
                ("DB_PASSWORD".to_string(), "jingui://vault/item/password".to_string()),
                ("API_KEY".to_string(), "op://vault/item/key".to_string()),
            ]
        );
    }

    #[test]
    fn test_order_is_first_seen() {
        let base = vec![
            ("A".to_string(), "1".to_string()),
            ("B".to_string(), "2".to_string()),
        ];
        let result = merge(base, &[entry("C", "3"), entry("A", "override")]);
        let keys: Vec<&str> = result.plain_env.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["A", "B", "C"]);
        assert_eq!(result.plain_env[0].1, "override");
    }
}
