//! Paged Result Collection
//!
//! Fetches a large result set page by page, accumulating until the
//! output would no longer fit the token budget. What happens to the
//! remainder is decided by a caller-supplied `ChunkPolicy` up front —
//! the collector never blocks on interactive input.

use tokio_util::sync::CancellationToken;

use shipmate_core::CoreResult;

use crate::backends::{QueryExecutor, QueryOptions};
use crate::size_guard::{self, ChunkPolicy};

/// Collect a query's pages into one result string.
///
/// Pages are fetched until one comes back empty. When the accumulated
/// output crosses the token budget, `policy` decides the outcome:
/// - `FirstChunk`: stop fetching and return what was collected so far.
/// - `AllChunks`: keep fetching to exhaustion and return everything.
/// - `Discard`: return the discard notice.
pub async fn collect_paged(
    executor: &dyn QueryExecutor,
    cluster_key: &str,
    query: &str,
    page_size: usize,
    policy: ChunkPolicy,
    cancel: CancellationToken,
) -> CoreResult<String> {
    let mut output = String::new();
    let mut page_index = 0;

    loop {
        let page = executor
            .execute_query(
                cluster_key,
                query,
                QueryOptions::page(page_size, page_index),
                cancel.clone(),
            )
            .await?;

        if page.is_empty() {
            break;
        }

        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str(&page);
        page_index += 1;

        if size_guard::exceeds_token_budget(output.len()) {
            match policy {
                ChunkPolicy::FirstChunk => break,
                ChunkPolicy::AllChunks => continue,
                ChunkPolicy::Discard => {
                    return Ok(size_guard::DISCARDED_NOTICE.to_string())
                }
            }
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Executor that serves a fixed number of same-sized pages.
    struct PagedFake {
        pages: usize,
        page_bytes: usize,
        calls: AtomicUsize,
    }

    impl PagedFake {
        fn new(pages: usize, page_bytes: usize) -> Self {
            Self {
                pages,
                page_bytes,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl QueryExecutor for PagedFake {
        async fn execute_query(
            &self,
            _cluster_key: &str,
            _query: &str,
            options: QueryOptions,
            _cancel: CancellationToken,
        ) -> CoreResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(options.paginated);
            if options.page_index < self.pages {
                Ok("r".repeat(self.page_bytes))
            } else {
                Ok(String::new())
            }
        }

        async fn execute_admin_command(
            &self,
            _cluster_key: &str,
            _command: &str,
            _cancel: CancellationToken,
        ) -> CoreResult<String> {
            unreachable!("not used by the collector")
        }
    }

    #[tokio::test]
    async fn test_collects_until_empty_page() {
        let executor = PagedFake::new(3, 10);
        let out = collect_paged(
            &executor,
            "devops",
            "Build | take 1500",
            500,
            ChunkPolicy::AllChunks,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        // 3 pages of 10 bytes joined by newlines
        assert_eq!(out.len(), 3 * 10 + 2);
        // 3 data pages + the empty terminator
        assert_eq!(executor.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_first_chunk_stops_at_budget() {
        // Each page is 300_000 bytes; the budget trips after two pages.
        let executor = PagedFake::new(10, 300_000);
        let out = collect_paged(
            &executor,
            "devops",
            "Build",
            500,
            ChunkPolicy::FirstChunk,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(out.len(), 2 * 300_000 + 1);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_all_chunks_fetches_everything() {
        let executor = PagedFake::new(4, 300_000);
        let out = collect_paged(
            &executor,
            "devops",
            "Build",
            500,
            ChunkPolicy::AllChunks,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(out.len(), 4 * 300_000 + 3);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_discard_returns_notice() {
        let executor = PagedFake::new(10, 300_000);
        let out = collect_paged(
            &executor,
            "devops",
            "Build",
            500,
            ChunkPolicy::Discard,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(out, size_guard::DISCARDED_NOTICE);
    }
}
