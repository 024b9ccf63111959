//! Command DTOs for the line-oriented driver
//!
//! Each stdin line is one JSON object tagged by `op`.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{BatchEntry, ExportOptions, GetOptions, SetOptions};

/// A single driver command.
///
/// # Examples
/// ```text
/// {"op":"set","key":"user:1","value":{"name":"Ada"},"options":{"ttl":60000}}
/// {"op":"get","key":"user:1"}
/// {"op":"clear","tags":["users"]}
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Set {
        key: String,
        value: Value,
        #[serde(default)]
        options: SetOptions,
    },
    Get {
        key: String,
        #[serde(default)]
        options: GetOptions,
    },
    Delete {
        key: String,
    },
    Mget {
        keys: Vec<String>,
    },
    Mset {
        entries: Vec<BatchEntry>,
        #[serde(default)]
        options: SetOptions,
    },
    /// Clears everything unless a pattern or tags are given
    Clear {
        #[serde(default)]
        pattern: Option<String>,
        #[serde(default)]
        tags: Option<Vec<String>>,
    },
    Stats,
    Export {
        #[serde(flatten)]
        options: ExportOptions,
    },
    Import {
        /// Raw document, version-checked by [`crate::cache::Snapshot::from_value`]
        snapshot: Value,
    },
    Analyze,
}

impl Command {
    /// Validates the command before it reaches the cache.
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        match self {
            Command::Clear {
                pattern: Some(_),
                tags: Some(_),
            } => Some("Clear accepts either a pattern or tags, not both".to_string()),
            Command::Mget { keys } if keys.is_empty() => {
                Some("Mget requires at least one key".to_string())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_set_command_deserialize() {
        let json = r#"{"op": "set", "key": "test", "value": "hello"}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        match cmd {
            Command::Set { key, value, options } => {
                assert_eq!(key, "test");
                assert_eq!(value, "hello");
                assert_eq!(options, SetOptions::default());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_set_command_with_options() {
        let json = r#"{"op": "set", "key": "k", "value": 1, "options": {"ttl": 60000, "tags": ["a"]}}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        let Command::Set { options, .. } = cmd else {
            panic!("expected set");
        };
        assert_eq!(options.ttl, Some(Duration::from_secs(60)));
        assert_eq!(options.tags, Some(vec!["a".to_string()]));
    }

    #[test]
    fn test_get_defaults_to_prefetch() {
        let cmd: Command = serde_json::from_str(r#"{"op": "get", "key": "k"}"#).unwrap();
        let Command::Get { options, .. } = cmd else {
            panic!("expected get");
        };
        assert!(options.prefetch);
    }

    #[test]
    fn test_export_flattened_options() {
        let cmd: Command =
            serde_json::from_str(r#"{"op": "export", "include_data": true}"#).unwrap();
        let Command::Export { options } = cmd else {
            panic!("expected export");
        };
        assert!(options.include_data);
        assert!(!options.compress);
    }

    #[test]
    fn test_validate_clear_conflict() {
        let cmd = Command::Clear {
            pattern: Some("^a".to_string()),
            tags: Some(vec!["t".to_string()]),
        };
        assert!(cmd.validate().is_some());
        assert!(Command::Stats.validate().is_none());
        assert!(Command::Mget { keys: vec![] }.validate().is_some());
    }
}
