//! Result Size Guard
//!
//! Decides whether a serialized tool result fits the model's context
//! budget. Results over the token ceiling are replaced with actionable
//! guidance — data is never silently truncated, because a silently
//! truncated result produces misleading answers downstream. A coarser
//! byte-level guard chunks payloads that are too large to forward at
//! all; how chunks are handled is an explicit caller-supplied policy,
//! never interactive input.
//!
//! Every decision here is a pure function of the input length.

use serde::{Deserialize, Serialize};

/// Characters per estimated token. Observed estimates range 4-5; 4 is
/// the conservative choice.
pub const TOKEN_ESTIMATE_DIVISOR: usize = 4;

/// Ceiling on estimated tokens for a single tool result.
pub const TOKEN_CEILING: usize = 120_000;

/// Byte ceiling above which a payload is chunked rather than forwarded.
pub const RAW_BYTE_CEILING: usize = 1_048_576;

/// Chunk size in bytes. 448 KiB keeps a single chunk under the token
/// ceiling (458_752 / 4 = 114_688 estimated tokens).
pub const CHUNK_SIZE: usize = 448 * 1024;

/// Separator between chunks when a caller asks for all of them.
pub const CHUNK_SEPARATOR: &str = "\n---\n";

/// Notice returned when a caller's policy discards an oversized payload.
pub const DISCARDED_NOTICE: &str =
    "Response discarded: the result exceeded the transport size ceiling.";

/// How to resolve a payload that exceeds the raw byte ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkPolicy {
    /// Return only the first chunk
    FirstChunk,
    /// Return every chunk, joined with a separator
    AllChunks,
    /// Drop the payload and return a notice
    Discard,
}

impl std::str::FromStr for ChunkPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first_chunk" => Ok(ChunkPolicy::FirstChunk),
            "all_chunks" => Ok(ChunkPolicy::AllChunks),
            "discard" => Ok(ChunkPolicy::Discard),
            other => Err(format!(
                "Unknown chunk policy '{}'. Valid policies: first_chunk, all_chunks, discard.",
                other
            )),
        }
    }
}

/// Estimated token count for a result of the given byte length.
pub fn estimated_tokens(len: usize) -> usize {
    len / TOKEN_ESTIMATE_DIVISOR
}

/// Whether a result of the given byte length exceeds the token ceiling.
pub fn exceeds_token_budget(len: usize) -> bool {
    estimated_tokens(len) > TOKEN_CEILING
}

/// Clamp a serialized tool result against the token ceiling.
///
/// Under the ceiling the input passes through unchanged. Over it, the
/// caller gets guidance on narrowing the query instead of the data.
pub fn clamp(raw: String) -> String {
    if exceeds_token_budget(raw.len()) {
        oversized_guidance(raw.len())
    } else {
        raw
    }
}

/// Clamp with the transport-level byte guard applied first.
///
/// Payloads above `RAW_BYTE_CEILING` are split into chunks and resolved
/// via `policy`; the survivor is then token-guarded as usual.
pub fn clamp_with_policy(raw: String, policy: ChunkPolicy) -> String {
    if raw.len() <= RAW_BYTE_CEILING {
        return clamp(raw);
    }

    let resolved = match policy {
        ChunkPolicy::FirstChunk => split_chunks(&raw)
            .first()
            .map(|c| c.to_string())
            .unwrap_or_default(),
        ChunkPolicy::AllChunks => split_chunks(&raw).join(CHUNK_SEPARATOR),
        ChunkPolicy::Discard => return DISCARDED_NOTICE.to_string(),
    };

    clamp(resolved)
}

/// Split a payload into `CHUNK_SIZE` pieces on char boundaries.
pub fn split_chunks(raw: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < raw.len() {
        let mut end = (start + CHUNK_SIZE).min(raw.len());
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        chunks.push(&raw[start..end]);
        start = end;
    }
    chunks
}

/// Guidance returned in place of an oversized result.
fn oversized_guidance(len: usize) -> String {
    format!(
        "The result was too large to return (estimated {} tokens, ceiling {}). \
         The data was NOT truncated. Narrow the query and try again:\n\
         - select only the columns you need with a projection ('| project ...')\n\
         - probe the result size first with a count-only query (query_row_count)\n\
         - add a row-limiting clause ('| take ...') or reduce the number of rows taken",
        estimated_tokens(len),
        TOKEN_CEILING
    )
}
