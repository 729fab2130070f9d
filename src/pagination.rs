//! Cursor-based pagination over a reverse-chronological message feed
//!
//! The feed returns pages newest-first; each page's oldest message id becomes
//! the `before` cursor for the next request. The feed exposes no total count,
//! so completion is inferred from an empty page. Time-range filtering and the
//! kept-message cap narrow what gets persisted without disturbing how far the
//! cursor walks.

use crate::config::MAX_PAGE_LIMIT;
use crate::types::{Message, MessageId};
use chrono::{DateTime, Utc};

/// Query parameters for one page fetch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageParams {
    /// Messages requested (never above the API ceiling)
    pub limit: u8,
    /// Fetch messages strictly older than this id; None starts at the newest
    pub before: Option<MessageId>,
}

/// Mutable pagination state for one scrape run
///
/// Created at scrape start and mutated only by [`advance`](Self::advance)
/// (and the explicit cap/watermark stops). Terminal once `exhausted` is set.
#[derive(Clone, Debug, Default)]
pub struct PaginationState {
    /// Oldest message id already retrieved; `before` for the next page
    pub cursor: Option<MessageId>,
    /// True once the feed has no older messages (or a stop condition hit)
    pub exhausted: bool,
    /// Raw messages fetched so far, pre-filter
    pub total_fetched: u64,
    /// Last message id observed, equal to the cursor after any advance
    pub last_seen_id: Option<MessageId>,
}

impl PaginationState {
    /// Fresh state: no cursor, nothing fetched, not exhausted
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters for the next page
    ///
    /// `limit` is the configured page size clamped to [`MAX_PAGE_LIMIT`];
    /// `before` is the current cursor (None on the first call, meaning start
    /// from the most recent message).
    #[must_use]
    pub fn next_page_params(&self, page_limit: u8) -> PageParams {
        PageParams {
            limit: page_limit.min(MAX_PAGE_LIMIT),
            before: self.cursor,
        }
    }

    /// Advance past a fetched page
    ///
    /// An empty page sets `exhausted`. Otherwise the cursor moves to the
    /// page's last (oldest) message and `total_fetched` grows by the raw
    /// page size, before any filtering. A page shorter than `requested`
    /// also exhausts the feed — the remote returned everything older than
    /// the cursor, so a follow-up fetch could only come back empty.
    pub fn advance(&mut self, page: &[Message], requested: u8) {
        match page.last() {
            None => {
                self.exhausted = true;
            }
            Some(oldest) => {
                self.cursor = Some(oldest.id);
                self.last_seen_id = Some(oldest.id);
                self.total_fetched += page.len() as u64;
                if page.len() < requested as usize {
                    self.exhausted = true;
                }
            }
        }
    }

    /// Stop the walk early (cap reached, watermark reached, abort)
    pub fn mark_exhausted(&mut self) {
        self.exhausted = true;
    }
}

/// Keep only messages inside the inclusive `[start, end]` range
///
/// Applied after the raw page has advanced the cursor, so out-of-range
/// messages are paged past rather than re-fetched. An unset bound passes
/// everything on that side.
#[must_use]
pub fn filter_by_range(
    page: Vec<Message>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<Message> {
    page.into_iter()
        .filter(|m| start.is_none_or(|s| m.timestamp >= s))
        .filter(|m| end.is_none_or(|e| m.timestamp <= e))
        .collect()
}

/// Truncate a batch so the cumulative kept count never exceeds `max_messages`
///
/// `max_messages` of 0 means unlimited. Returns true when the cap is reached,
/// which ends the run even if the raw feed has more pages.
pub fn apply_cap(batch: &mut Vec<Message>, already_kept: u64, max_messages: u64) -> bool {
    if max_messages == 0 {
        return false;
    }
    let remaining = max_messages.saturating_sub(already_kept);
    if (batch.len() as u64) >= remaining {
        batch.truncate(remaining as usize);
        return true;
    }
    false
}

/// Drop messages at or below a previous run's high-water mark
///
/// Pages arrive newest-first, so everything after the first id `<= watermark`
/// was already persisted by an earlier run. Returns the new messages and
/// whether the watermark was reached (which ends the walk).
#[must_use]
pub fn truncate_at_watermark(page: Vec<Message>, watermark: MessageId) -> (Vec<Message>, bool) {
    let reached = page.iter().any(|m| m.id <= watermark);
    let kept = page.into_iter().filter(|m| m.id > watermark).collect();
    (kept, reached)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Build a newest-first page with the given ids; timestamps track ids
    fn page(ids: &[u64]) -> Vec<Message> {
        ids.iter()
            .map(|id| {
                Message::from_value(json!({
                    "id": id.to_string(),
                    "timestamp": format!("2024-03-01T00:00:{:02}Z", (id % 60)),
                }))
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn first_params_start_at_newest() {
        let state = PaginationState::new();
        let params = state.next_page_params(100);

        assert_eq!(params.limit, 100);
        assert_eq!(params.before, None, "no cursor means start at the newest message");
    }

    #[test]
    fn limit_is_clamped_to_api_ceiling() {
        let state = PaginationState::new();
        assert_eq!(state.next_page_params(200).limit, 100);
        assert_eq!(state.next_page_params(50).limit, 50);
    }

    #[test]
    fn advance_moves_cursor_to_oldest_of_page() {
        let mut state = PaginationState::new();
        state.advance(&page(&[30, 20, 10]), 3);

        assert_eq!(state.cursor, Some(MessageId::new(10)));
        assert_eq!(state.last_seen_id, Some(MessageId::new(10)));
        assert_eq!(state.total_fetched, 3);
        assert!(!state.exhausted, "a full page leaves the walk open");
    }

    #[test]
    fn empty_page_exhausts_without_touching_cursor() {
        let mut state = PaginationState::new();
        state.advance(&page(&[5, 4]), 2);
        state.advance(&page(&[]), 2);

        assert!(state.exhausted);
        assert_eq!(state.cursor, Some(MessageId::new(4)), "cursor keeps its last value");
        assert_eq!(state.total_fetched, 2);
    }

    #[test]
    fn short_page_exhausts_after_advancing() {
        let mut state = PaginationState::new();
        state.advance(&page(&[30, 20, 10]), 100);

        assert!(state.exhausted, "fewer messages than requested means the feed is drained");
        assert_eq!(state.cursor, Some(MessageId::new(10)));
        assert_eq!(state.total_fetched, 3);
    }

    #[test]
    fn cursor_strictly_decreases_across_pages() {
        let mut state = PaginationState::new();
        let mut cursors = Vec::new();

        for ids in [&[50, 40][..], &[30, 20][..], &[10][..]] {
            state.advance(&page(ids), 2);
            cursors.push(state.cursor.unwrap());
        }

        for pair in cursors.windows(2) {
            assert!(
                pair[1] < pair[0],
                "cursor must strictly decrease, saw {} then {}",
                pair[0],
                pair[1]
            );
        }
        assert_eq!(state.total_fetched, 5);
    }

    #[test]
    fn range_filter_is_inclusive_on_both_bounds() {
        let msgs = page(&[3, 2, 1]);
        let t = |id: u64| msgs.iter().find(|m| m.id.get() == id).unwrap().timestamp;

        let kept = filter_by_range(msgs.clone(), Some(t(2)), Some(t(3)));
        let ids: Vec<u64> = kept.iter().map(|m| m.id.get()).collect();
        assert_eq!(ids, vec![3, 2], "bounds are inclusive");
    }

    #[test]
    fn unset_bounds_keep_everything() {
        let msgs = page(&[3, 2, 1]);
        assert_eq!(filter_by_range(msgs.clone(), None, None).len(), 3);

        let t2 = msgs.iter().find(|m| m.id.get() == 2).unwrap().timestamp;
        let lower_only = filter_by_range(msgs.clone(), Some(t2), None);
        assert_eq!(lower_only.len(), 2);
        let upper_only = filter_by_range(msgs, None, Some(t2));
        assert_eq!(upper_only.len(), 2);
    }

    #[test]
    fn cap_truncates_current_batch() {
        let mut batch = page(&[5, 4, 3, 2, 1]);
        let reached = apply_cap(&mut batch, 8, 10);

        assert!(reached);
        assert_eq!(batch.len(), 2, "8 already kept + 2 = cap of 10");
    }

    #[test]
    fn cap_of_zero_is_unlimited() {
        let mut batch = page(&[5, 4, 3]);
        let reached = apply_cap(&mut batch, 1_000_000, 0);

        assert!(!reached);
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn cap_exactly_met_reports_reached() {
        let mut batch = page(&[2, 1]);
        let reached = apply_cap(&mut batch, 3, 5);

        assert!(reached, "already_kept + batch == cap counts as reached");
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn watermark_drops_already_persisted_tail() {
        let (kept, reached) = truncate_at_watermark(page(&[50, 40, 30, 20]), MessageId::new(30));

        let ids: Vec<u64> = kept.iter().map(|m| m.id.get()).collect();
        assert_eq!(ids, vec![50, 40], "ids at or below the mark are already stored");
        assert!(reached);
    }

    #[test]
    fn watermark_below_page_keeps_everything() {
        let (kept, reached) = truncate_at_watermark(page(&[50, 40]), MessageId::new(10));

        assert_eq!(kept.len(), 2);
        assert!(!reached);
    }
}
