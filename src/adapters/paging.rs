//! Full-table reads over a bounded-page query interface.
//!
//! Every computation in this engine needs full-table visibility, but a single
//! query is capped at one page. `collect_pages` issues successive offset-bound
//! requests until a request comes back short. Failures propagate to the
//! caller; retrying is not this layer's job.

use crate::error::Result;
use std::future::Future;

/// Fetch the complete result set behind a paged query.
///
/// `fetch(offset, limit)` must return at most `limit` rows starting at
/// `offset`. Iteration stops at the first short page, so a table whose size is
/// an exact multiple of `page_size` costs one extra (empty) request.
pub async fn collect_pages<T, F, Fut>(page_size: i64, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(i64, i64) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let mut out = Vec::new();
    let mut offset = 0i64;

    loop {
        let page = fetch(offset, page_size).await?;
        let len = page.len() as i64;
        out.extend(page);
        if len < page_size {
            return Ok(out);
        }
        offset += len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrescendoError;

    async fn page_of(data: &[i64], offset: i64, limit: i64) -> Result<Vec<i64>> {
        let start = (offset as usize).min(data.len());
        let end = (start + limit as usize).min(data.len());
        Ok(data[start..end].to_vec())
    }

    #[tokio::test]
    async fn test_collects_across_pages() {
        let data: Vec<i64> = (0..25).collect();
        let all = collect_pages(10, |offset, limit| page_of(&data, offset, limit))
            .await
            .unwrap();
        assert_eq!(all, data);
    }

    #[tokio::test]
    async fn test_exact_multiple_of_page_size() {
        let data: Vec<i64> = (0..30).collect();
        let all = collect_pages(10, |offset, limit| page_of(&data, offset, limit))
            .await
            .unwrap();
        assert_eq!(all.len(), 30);
    }

    #[tokio::test]
    async fn test_empty_table() {
        let data: Vec<i64> = Vec::new();
        let all = collect_pages(10, |offset, limit| page_of(&data, offset, limit))
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_single_short_page() {
        let data: Vec<i64> = (0..3).collect();
        let all = collect_pages(10, |offset, limit| page_of(&data, offset, limit))
            .await
            .unwrap();
        assert_eq!(all, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_errors_propagate() {
        let result: Result<Vec<i64>> = collect_pages(10, |_, _| async {
            Err(CrescendoError::Internal("boom".into()))
        })
        .await;
        assert!(result.is_err());
    }
}
