//! Reading export files into [`ConversationRecord`]s.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use simd_json::OwnedValue;
use simd_json::prelude::*;

use crate::types::ConversationRecord;

/// Parse a `conversations.json` payload.
///
/// The top level must be an array. Elements that are not objects are skipped.
/// `bytes` is used as scratch space by the parser and left in an unspecified state.
pub fn parse_archive(bytes: &mut [u8]) -> Result<Vec<ConversationRecord>> {
    let value: OwnedValue =
        simd_json::from_slice(bytes).context("Archive is not valid JSON")?;
    let Some(items) = value.as_array() else {
        bail!("Archive must be a JSON array of conversations");
    };

    let mut skipped = 0usize;
    let records: Vec<ConversationRecord> = items
        .iter()
        .filter_map(|item| {
            let record = ConversationRecord::from_value(item);
            if record.is_none() {
                skipped += 1;
            }
            record
        })
        .collect();

    if skipped > 0 {
        tracing::debug!(skipped, "Skipped archive entries that are not objects");
    }
    tracing::debug!(conversations = records.len(), "Parsed archive");
    Ok(records)
}

pub fn parse_archive_str(json: &str) -> Result<Vec<ConversationRecord>> {
    parse_archive(&mut json.as_bytes().to_vec())
}

pub fn load_archive(path: &Path) -> Result<Vec<ConversationRecord>> {
    let mut bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read archive {}", path.display()))?;
    parse_archive(&mut bytes).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load several archives in parallel, concatenated in argument order.
pub fn load_archives(paths: &[PathBuf]) -> Result<Vec<ConversationRecord>> {
    let loaded: Vec<Vec<ConversationRecord>> = paths
        .par_iter()
        .map(|path| load_archive(path))
        .collect::<Result<_>>()?;

    Ok(loaded.into_iter().flatten().collect())
}
