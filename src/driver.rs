//! Command Driver
//!
//! Maps driver commands onto cache operations. One command in, one reply out.

use tracing::debug;

use crate::cache::{AdaptiveCache, Snapshot};
use crate::models::{Command, Reply};

/// Parses and executes one JSON command line.
pub fn handle_line(cache: &AdaptiveCache, line: &str) -> Reply {
    match serde_json::from_str::<Command>(line) {
        Ok(command) => handle_command(cache, command),
        Err(e) => Reply::error(format!("Invalid command: {}", e)),
    }
}

/// Executes a parsed command against the cache.
pub fn handle_command(cache: &AdaptiveCache, command: Command) -> Reply {
    if let Some(error_msg) = command.validate() {
        return Reply::error(error_msg);
    }
    debug!(?command, "handling command");

    match command {
        Command::Set {
            key,
            value,
            options,
        } => match cache.set(&key, value, &options) {
            Ok(metadata) => Reply::Stored { metadata },
            Err(e) => e.into(),
        },
        Command::Get { key, options } => match cache.get_with(&key, options) {
            Ok(Some(hit)) => Reply::Hit {
                key,
                ttl_remaining_ms: hit.metadata.ttl_remaining_ms(cache.now()),
                value: hit.value,
                metadata: hit.metadata,
            },
            Ok(None) => Reply::Miss { key },
            Err(e) => e.into(),
        },
        Command::Delete { key } => {
            let deleted = cache.delete(&key);
            Reply::Deleted { key, deleted }
        }
        Command::Mget { keys } => match cache.mget(&keys) {
            Ok(outcome) => Reply::Batch(outcome),
            Err(e) => e.into(),
        },
        Command::Mset { entries, options } => match cache.mset(entries, &options) {
            Ok(metadata) => Reply::StoredMany { metadata },
            Err(e) => e.into(),
        },
        Command::Clear { pattern, tags } => match (pattern, tags) {
            (Some(pattern), _) => match cache.clear_by_pattern(&pattern) {
                Ok(outcome) => Reply::Cleared(outcome),
                Err(e) => e.into(),
            },
            (None, Some(tags)) => Reply::Cleared(cache.clear_by_tags(&tags)),
            (None, None) => Reply::ClearedAll {
                cleared: cache.clear_all(),
            },
        },
        Command::Stats => Reply::Stats(cache.statistics()),
        Command::Export { options } => Reply::Snapshot(cache.export_snapshot(options)),
        Command::Import { snapshot } => match Snapshot::from_value(snapshot)
            .and_then(|snapshot| cache.import_snapshot(snapshot))
        {
            Ok(outcome) => Reply::Imported(outcome),
            Err(e) => e.into(),
        },
        Command::Analyze => Reply::Analysis(cache.analyze_patterns()),
    }
}
