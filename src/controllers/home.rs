use std::sync::Arc;

use crate::models::cache::{CacheKey, DayBucket, ValidityTag};
use crate::models::job::OwnerKey;
use crate::models::wardrobe::{Outfit, WeatherSnapshot};
use crate::services::api::RemoteClient;
use crate::services::cache::{CacheError, CacheStore};
use crate::services::clock::Clock;

/// Weather and outfit-history reads for the home screen.
pub struct HomeFeed {
    remote: Arc<dyn RemoteClient>,
    cache: CacheStore,
    clock: Arc<dyn Clock>,
    owner: OwnerKey,
    evening_cutoff_hour: u32,
}

impl HomeFeed {
    pub fn new(
        remote: Arc<dyn RemoteClient>,
        cache: CacheStore,
        clock: Arc<dyn Clock>,
        owner: OwnerKey,
        evening_cutoff_hour: u32,
    ) -> Self {
        Self { remote, cache, clock, owner, evening_cutoff_hour }
    }

    pub fn day_bucket(&self) -> DayBucket {
        DayBucket::at_hour(self.clock.local_hour(), self.evening_cutoff_hour)
    }

    /// Heading shown above the forecast, e.g. "明日の天気" in the evening.
    pub fn day_label(&self) -> &'static str {
        self.day_bucket().label()
    }

    /// Forecast for `region`, cached per (region, day bucket).
    pub async fn weather(&self, region: &str, force_refresh: bool) -> Result<WeatherSnapshot, CacheError> {
        let tag = ValidityTag::weather(region, self.day_bucket());
        let (remote, owner) = (&self.remote, &self.owner);
        self.cache
            .fetch_with_cache(CacheKey::Weather, &tag, force_refresh, || async move {
                remote.get_weather(owner, region).await
            })
            .await
    }

    /// Outfit history; valid until a `home-refresh` event forces a refresh.
    pub async fn history(&self, force_refresh: bool) -> Result<Vec<Outfit>, CacheError> {
        let (remote, owner) = (&self.remote, &self.owner);
        self.cache
            .fetch_with_cache(CacheKey::History, &ValidityTag::unconditional(), force_refresh, || async move {
                remote.list_history(owner).await
            })
            .await
    }

    /// Region stored in the user's profile, or `fallback` when there is none
    /// or the profile cannot be loaded.
    pub async fn resolve_region(&self, fallback: &str) -> String {
        match self.remote.get_user(&self.owner).await {
            Ok(profile) => profile
                .address
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| fallback.to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "Profile lookup failed, using fallback region");
                fallback.to_string()
            }
        }
    }
}
