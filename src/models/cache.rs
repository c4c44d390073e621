use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, Display};

/// Named snapshot slots in the durable store, one per resource category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
pub enum CacheKey {
    #[strum(serialize = "WEATHER_CACHE")]
    Weather,
    #[strum(serialize = "CLOTHES_CACHE")]
    Inventory,
    #[strum(serialize = "HISTORY_CACHE")]
    History,
}

/// Opaque value computed from the dimensions that make a snapshot stale.
///
/// A cached read is a hit only when the caller's freshly computed tag
/// equals the stored one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidityTag(String);

impl ValidityTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Tag for snapshots with no time or region component; they only go
    /// stale through invalidation events.
    pub fn unconditional() -> Self {
        Self(String::new())
    }

    /// Weather tag: the region paired with the forecast day bucket.
    pub fn weather(region: &str, bucket: DayBucket) -> Self {
        Self(format!("{region}|{bucket}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which day a forecast targets, by local time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DayBucket {
    Today,
    Tomorrow,
}

impl DayBucket {
    /// `Today` before `cutoff_hour`, `Tomorrow` from it onwards.
    pub fn at_hour(hour: u32, cutoff_hour: u32) -> Self {
        if hour < cutoff_hour {
            DayBucket::Today
        } else {
            DayBucket::Tomorrow
        }
    }

    /// Label shown above the weather card.
    pub fn label(self) -> &'static str {
        match self {
            DayBucket::Today => "今日の天気",
            DayBucket::Tomorrow => "明日の天気",
        }
    }
}

/// A named, durable snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry<T> {
    pub key: String,
    pub payload: T,
    pub validity_tag: ValidityTag,
    pub saved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_flips_at_cutoff() {
        assert_eq!(DayBucket::at_hour(0, 19), DayBucket::Today);
        assert_eq!(DayBucket::at_hour(18, 19), DayBucket::Today);
        assert_eq!(DayBucket::at_hour(19, 19), DayBucket::Tomorrow);
        assert_eq!(DayBucket::at_hour(23, 19), DayBucket::Tomorrow);
    }

    #[test]
    fn test_weather_tag_depends_on_region_and_bucket() {
        let a = ValidityTag::weather("福岡市", DayBucket::Today);
        assert_eq!(a, ValidityTag::weather("福岡市", DayBucket::Today));
        assert_ne!(a, ValidityTag::weather("福岡市", DayBucket::Tomorrow));
        assert_ne!(a, ValidityTag::weather("東京都", DayBucket::Today));
        assert_eq!(a.as_str(), "福岡市|today");
    }

    #[test]
    fn test_cache_key_storage_names() {
        assert_eq!(CacheKey::Weather.as_ref(), "WEATHER_CACHE");
        assert_eq!(CacheKey::Inventory.to_string(), "CLOTHES_CACHE");
    }
}
