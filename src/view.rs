//! Tier content manager view state
//!
//! `TierView` owns everything the screen needs between frames: the query
//! state (tier, page, search), the selection set, both request caches and the
//! toast queue. Operator actions return the `Effect`s the app must execute;
//! responses come back through the `*_loaded` / `inclusion_finished` methods.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::models::{CandidateContent, CandidatePage, IncludedPage, InclusionRequest, PageKey, Tier, PAGE_SIZE};
use crate::notify::{ToastKind, Toasts};
use crate::query::{QueryCache, QueryStatus, RequestId};

/// Background work requested by the view
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchIncluded { tier: Tier, request: RequestId },
    FetchCandidates { key: PageKey, request: RequestId },
    SubmitInclusion { tier: Tier, request: RequestId, body: InclusionRequest },
}

#[derive(Debug)]
pub struct TierView {
    tier: Tier,
    page: u32,
    search: String,
    selection: BTreeSet<String>,
    submitting: Option<RequestId>,
    included: QueryCache<Tier, IncludedPage>,
    candidates: QueryCache<PageKey, CandidatePage>,
    toasts: Toasts,
    next_request: RequestId,
}

impl TierView {
    pub fn new(notification_ttl: Duration) -> Self {
        Self {
            tier: Tier::default(),
            page: 1,
            search: String::new(),
            selection: BTreeSet::new(),
            submitting: None,
            included: QueryCache::new(),
            candidates: QueryCache::new(),
            toasts: Toasts::new(notification_ttl),
            next_request: 0,
        }
    }

    /// Initial fetches for the default tier
    pub fn mount(&mut self) -> Vec<Effect> {
        self.fetch_current()
    }

    /// Refetch both panels for the current keys, e.g. after the endpoint changed
    pub fn reload(&mut self) -> Vec<Effect> {
        self.fetch_current()
    }

    pub fn select_tier(&mut self, tier: Tier) -> Vec<Effect> {
        self.tier = tier;
        self.page = 1;
        self.fetch_current()
    }

    pub fn next_page(&mut self) -> Vec<Effect> {
        if !self.has_next_page() {
            return Vec::new();
        }
        self.page += 1;
        vec![self.fetch_candidates()]
    }

    pub fn previous_page(&mut self) -> Vec<Effect> {
        if !self.has_previous_page() {
            return Vec::new();
        }
        self.page -= 1;
        vec![self.fetch_candidates()]
    }

    /// Local filter only; the page cursor is left alone
    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into();
    }

    pub fn toggle_selection(&mut self, content_code: &str) {
        if !self.selection.remove(content_code) {
            self.selection.insert(content_code.to_string());
        }
    }

    pub fn is_selected(&self, content_code: &str) -> bool {
        self.selection.contains(content_code)
    }

    pub fn submit_inclusion(&mut self) -> Vec<Effect> {
        if !self.can_submit() {
            return Vec::new();
        }
        let request = self.issue_request();
        self.submitting = Some(request);
        vec![Effect::SubmitInclusion {
            tier: self.tier,
            request,
            body: InclusionRequest::include(self.selection.iter().cloned()),
        }]
    }

    pub fn included_loaded(&mut self, tier: Tier, request: RequestId, result: Result<IncludedPage, String>) -> bool {
        self.included.resolve(tier, request, result)
    }

    pub fn candidates_loaded(&mut self, key: PageKey, request: RequestId, result: Result<CandidatePage, String>) -> bool {
        self.candidates.resolve(key, request, result)
    }

    pub fn inclusion_finished(
        &mut self,
        tier: Tier,
        request: RequestId,
        result: Result<usize, String>,
        now: Instant,
    ) -> Vec<Effect> {
        if self.submitting != Some(request) {
            return Vec::new();
        }
        self.submitting = None;

        match result {
            Ok(count) => {
                self.selection.clear();
                self.toasts.push(
                    ToastKind::Success,
                    format!("Included {} content(s) in {}", count, tier.label()),
                    now,
                );
                self.included.invalidate(tier);
                if tier == self.tier {
                    vec![self.fetch_included()]
                } else {
                    Vec::new()
                }
            }
            Err(msg) => {
                self.toasts.push(ToastKind::Error, format!("Failed to include contents: {}", msg), now);
                Vec::new()
            }
        }
    }

    /// Per-frame housekeeping
    pub fn tick(&mut self, now: Instant) {
        self.toasts.prune(now);
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_key(&self) -> PageKey {
        PageKey::new(self.tier, self.page)
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.is_some()
    }

    pub fn can_submit(&self) -> bool {
        !self.selection.is_empty() && self.submitting.is_none()
    }

    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }

    /// End-of-data heuristic: a full page means there may be another one.
    /// Uses the unfiltered response for exactly the current key. An oversized
    /// response (more than 20 items) also enables Next.
    pub fn has_next_page(&self) -> bool {
        self.candidates
            .value(self.page_key())
            .map_or(false, |p| p.list.len() >= PAGE_SIZE as usize)
    }

    /// `totalCount` reported with the current page, if loaded
    pub fn total_count(&self) -> Option<u64> {
        self.candidates.value(self.page_key()).map(|p| p.total_count)
    }

    pub fn included_status(&self) -> QueryStatus<'_, IncludedPage> {
        self.included.status(self.tier)
    }

    /// The included list changed server-side since it was last loaded
    pub fn included_is_stale(&self) -> bool {
        self.included.is_stale(self.tier)
    }

    pub fn candidates_status(&self) -> QueryStatus<'_, CandidatePage> {
        self.candidates.status(self.page_key())
    }

    /// Rows to render: the displayed page filtered by the search text
    pub fn visible_candidates(&self) -> Vec<&CandidateContent> {
        let needle = self.search.to_lowercase();
        match self.candidates_status() {
            QueryStatus::Ready { value, .. } => value.list.iter().filter(|c| c.matches(&needle)).collect(),
            _ => Vec::new(),
        }
    }

    pub fn toasts(&self) -> &Toasts {
        &self.toasts
    }

    pub fn set_notification_ttl(&mut self, ttl: Duration) {
        self.toasts.set_ttl(ttl);
    }

    fn fetch_current(&mut self) -> Vec<Effect> {
        vec![self.fetch_included(), self.fetch_candidates()]
    }

    fn fetch_included(&mut self) -> Effect {
        let request = self.issue_request();
        self.included.begin(self.tier, request);
        Effect::FetchIncluded { tier: self.tier, request }
    }

    fn fetch_candidates(&mut self) -> Effect {
        let request = self.issue_request();
        let key = self.page_key();
        self.candidates.begin(key, request);
        Effect::FetchCandidates { key, request }
    }

    fn issue_request(&mut self) -> RequestId {
        self.next_request += 1;
        self.next_request
    }
}

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;
