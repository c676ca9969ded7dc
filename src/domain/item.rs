//! Source items discovered from a playlist.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Titles the upstream uses as placeholders for unavailable videos
pub const UNAVAILABLE_TITLES: &[&str] = &["[Private video]", "[Deleted video]"];

/// Catalog file columns, in persisted order
pub const CATALOG_COLUMNS: [&str; 5] = ["date", "title", "url", "id", "uploader"];

/// An entry as returned by the enumeration collaborator.
///
/// Every field is optional; `SourceItem::from_raw` decides what is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    /// Upload date in whatever text form the upstream produced
    pub upload_date: Option<String>,
    pub uploader: Option<String>,
    pub url: Option<String>,
}

/// A discovered video. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceItem {
    pub id: String,
    pub url: String,
    pub title: String,
    pub date: Option<NaiveDate>,
    pub uploader: String,
}

impl SourceItem {
    /// Normalize a raw entry, or `None` if it is missing an id or a usable title
    pub fn from_raw(raw: RawEntry) -> Option<Self> {
        let id = raw.id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())?;

        let title = raw.title.filter(|t| {
            let t = t.trim();
            !t.is_empty() && !UNAVAILABLE_TITLES.contains(&t)
        })?;

        let url = raw
            .url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| watch_url(&id));

        Some(Self {
            date: raw.upload_date.as_deref().and_then(parse_upload_date),
            uploader: raw.uploader.unwrap_or_default(),
            id,
            url,
            title,
        })
    }

    /// Row in `CATALOG_COLUMNS` order
    pub fn to_row(&self) -> Vec<String> {
        vec![
            format_date(self.date),
            self.title.clone(),
            self.url.clone(),
            self.id.clone(),
            self.uploader.clone(),
        ]
    }
}

/// Canonical watch URL for a video id
pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

/// Parse `YYYYMMDD` (upstream form) or `YYYY-MM-DD` (catalog form)
pub fn parse_upload_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

/// Render an optional date as `YYYY-MM-DD`, empty when unknown
pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, title: &str) -> RawEntry {
        RawEntry {
            id: Some(id.to_string()),
            title: Some(title.to_string()),
            upload_date: Some("20240131".to_string()),
            uploader: Some("Channel".to_string()),
            url: None,
        }
    }

    #[test]
    fn test_from_raw_fills_url_and_date() {
        let item = SourceItem::from_raw(raw("abc123", "Quiz night")).unwrap();

        assert_eq!(item.url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(item.date, NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(item.to_row()[0], "2024-01-31");
    }

    #[test]
    fn test_placeholders_are_filtered() {
        assert!(SourceItem::from_raw(raw("a", "[Private video]")).is_none());
        assert!(SourceItem::from_raw(raw("a", "[Deleted video]")).is_none());
        assert!(SourceItem::from_raw(raw("a", "  ")).is_none());
        assert!(SourceItem::from_raw(RawEntry {
            title: Some("No id".into()),
            ..Default::default()
        })
        .is_none());
    }

    #[test]
    fn test_unparseable_date_is_unknown() {
        let mut entry = raw("abc", "Title");
        entry.upload_date = Some("last tuesday".into());

        let item = SourceItem::from_raw(entry).unwrap();
        assert_eq!(item.date, None);
        assert_eq!(format_date(item.date), "");
    }
}
