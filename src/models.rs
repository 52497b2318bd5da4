//! Data models for the Tier Content Manager

use serde::{Deserialize, Serialize};

/// Fixed page size used by every listing request
pub const PAGE_SIZE: u32 = 20;

/// UI Tab selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tab {
    Contents,
    Drafts,
    Console,
}

/// Content tier. `NonTier` travels as id 4 on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Tier {
    #[default]
    Tier1,
    Tier2,
    Tier3,
    NonTier,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Tier1, Tier::Tier2, Tier::Tier3, Tier::NonTier];

    /// Tiers a local draft may be filed under
    pub const RANKED: [Tier; 3] = [Tier::Tier1, Tier::Tier2, Tier::Tier3];

    pub fn id(&self) -> u8 {
        match self {
            Tier::Tier1 => 1,
            Tier::Tier2 => 2,
            Tier::Tier3 => 3,
            Tier::NonTier => 4,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Tier::Tier1),
            2 => Some(Tier::Tier2),
            3 => Some(Tier::Tier3),
            4 => Some(Tier::NonTier),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Tier1 => "Tier 1",
            Tier::Tier2 => "Tier 2",
            Tier::Tier3 => "Tier 3",
            Tier::NonTier => "Non-Tier",
        }
    }

    pub fn is_ranked(&self) -> bool {
        *self != Tier::NonTier
    }
}

/// Cache key of one candidate listing page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub tier: Tier,
    pub page: u32,
}

impl PageKey {
    pub fn new(tier: Tier, page: u32) -> Self {
        Self { tier, page }
    }
}

/// Common response envelope of the content-tier service
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail_message: Option<String>,
    pub data: T,
}

/// A content already included in a tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierContent {
    pub tier_id: u8,
    #[serde(rename = "tvingContentCode")]
    pub content_code: String,
    pub pip_content_code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncludedPage {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub list: Vec<TierContent>,
}

/// A content eligible for inclusion, as returned by the paged listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateContent {
    pub order: i64,
    #[serde(rename = "tvingContentCode")]
    pub content_code: String,
    pub pip_content_code: String,
    pub name: String,
    pub tier_name: String,
    pub tier_price: f64,
    #[serde(rename = "contentTypeNm")]
    pub content_type: String,
    #[serde(rename = "gradeNm")]
    pub grade: String,
    #[serde(rename = "gradeKindNm")]
    pub grade_kind: String,
    #[serde(rename = "tvingExclusiveType", default)]
    pub exclusive_type: Option<String>,
    /// Epoch milliseconds
    pub broadcast_start_date: i64,
    /// Epoch milliseconds
    #[serde(default)]
    pub broadcast_end_date: Option<i64>,
    pub broadcast_weekdays: String,
    pub release_status: String,
    pub is_included_tier: bool,
}

impl CandidateContent {
    /// Case-insensitive match against name or content code.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.name.to_lowercase().contains(needle)
            || self.content_code.to_lowercase().contains(needle)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePage {
    #[serde(default)]
    pub date: Option<i64>,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub list: Vec<CandidateContent>,
}

/// Body of the bulk inclusion request
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct InclusionRequest {
    pub inclusions: Vec<String>,
    pub exclusions: Vec<String>,
}

impl InclusionRequest {
    pub fn include(codes: impl IntoIterator<Item = String>) -> Self {
        Self {
            inclusions: codes.into_iter().collect(),
            exclusions: Vec::new(),
        }
    }
}

/// Format a price with thousands separators (12000 -> "12,000", 1234.5 -> "1,234.5").
/// Up to three fraction digits are kept, trailing zeros dropped.
pub fn format_price(price: f64) -> String {
    let fixed = format!("{:.3}", price.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut out = String::with_capacity(fixed.len() + whole.len() / 3 + 1);
    if price < 0.0 && (whole != "0" || !fraction.is_empty()) {
        out.push('-');
    }
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// Format an epoch-millisecond timestamp as local YYYY-MM-DD
pub fn format_date(epoch_millis: i64) -> String {
    use chrono::{DateTime, Local, Utc};

    DateTime::<Utc>::from_timestamp_millis(epoch_millis)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_optional_date(epoch_millis: Option<i64>) -> String {
    epoch_millis.map(format_date).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ids_round_trip() {
        for tier in Tier::ALL {
            assert_eq!(Tier::from_id(tier.id()), Some(tier));
        }
        assert_eq!(Tier::NonTier.id(), 4);
        assert_eq!(Tier::from_id(0), None);
        assert_eq!(Tier::from_id(5), None);
        assert!(!Tier::NonTier.is_ranked());
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0.0), "0");
        assert_eq!(format_price(999.0), "999");
        assert_eq!(format_price(12000.0), "12,000");
        assert_eq!(format_price(1234567.0), "1,234,567");
        assert_eq!(format_price(-4500.0), "-4,500");
        assert_eq!(format_price(1234.5), "1,234.5");
        assert_eq!(format_price(9999.125), "9,999.125");
        assert_eq!(format_price(0.1 + 0.2), "0.3");
    }

    #[test]
    fn test_format_optional_date_missing() {
        assert_eq!(format_optional_date(None), "-");
        assert_eq!(format_date(1_700_000_000_000).len(), 10);
    }

    #[test]
    fn test_candidate_deserialize() {
        let json = r#"{
            "order": 3,
            "tvingContentCode": "P001",
            "pipContentCode": "PIP001",
            "name": "Evening Drama",
            "tierName": "Tier 1",
            "tierPrice": 15000,
            "contentTypeNm": "Drama",
            "gradeNm": "15",
            "gradeKindNm": "Age",
            "tvingExclusiveType": null,
            "broadcastStartDate": 1700000000000,
            "broadcastEndDate": null,
            "broadcastWeekdays": "MON,TUE",
            "releaseStatus": "ON_AIR",
            "isIncludedTier": true
        }"#;
        let content: CandidateContent = serde_json::from_str(json).unwrap();
        assert_eq!(content.content_code, "P001");
        assert_eq!(content.tier_price, 15000.0);
        assert_eq!(content.exclusive_type, None);
        assert_eq!(content.broadcast_end_date, None);
        assert!(content.is_included_tier);
    }

    #[test]
    fn test_inclusion_request_serialize() {
        let body = InclusionRequest::include(vec!["A".to_string(), "B".to_string()]);
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"inclusions":["A","B"],"exclusions":[]}"#);
    }
}
