use std::sync::Arc;

use crate::controllers::FlowError;
use crate::models::job::OwnerKey;
use crate::models::wardrobe::UserProfile;
use crate::services::api::RemoteClient;
use crate::services::cache::CacheStore;
use crate::services::events::{AppEvent, EventSink};

pub struct Profile {
    remote: Arc<dyn RemoteClient>,
    cache: CacheStore,
    events: Arc<dyn EventSink>,
    owner: OwnerKey,
}

impl Profile {
    pub fn new(remote: Arc<dyn RemoteClient>, cache: CacheStore, events: Arc<dyn EventSink>, owner: OwnerKey) -> Self {
        Self { remote, cache, events, owner }
    }

    pub async fn load(&self) -> Result<UserProfile, FlowError> {
        Ok(self.remote.get_user(&self.owner).await?)
    }

    /// Upload a face photo for try-on rendering and return its image URL.
    ///
    /// The link takes effect once saved as the profile's `image_link`.
    pub async fn upload_face_photo(&self, bytes: Vec<u8>) -> Result<String, FlowError> {
        let target = self.remote.request_upload_url("jpg").await?;
        self.remote.upload_image(&target, bytes).await?;
        tracing::info!(owner = %self.owner, image_url = %target.image_url, "Face photo uploaded");
        Ok(target.image_url)
    }

    /// Save the profile under this installation's owner key and announce
    /// the (possibly unchanged) region.
    pub async fn save(&self, mut profile: UserProfile) -> Result<UserProfile, FlowError> {
        let region = profile
            .address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .ok_or_else(|| FlowError::Invalid("address is required".into()))?;

        profile.user_id = self.owner.0.clone();
        profile.address = Some(region.clone());
        self.remote.save_profile(&profile).await?;

        tracing::info!(owner = %self.owner, region = %region, "Profile saved");
        self.events.publish(AppEvent::RegionChanged(region));

        Ok(profile)
    }

    /// Wipe every snapshot, guide flag and the owner identifier.
    ///
    /// Handles built before the wipe still carry the old owner key; callers
    /// go through [`AppState::reset_all`](crate::app_state::AppState::reset_all),
    /// which consumes the state so it has to be rebuilt.
    pub(crate) fn reset_all(&self) -> Result<(), FlowError> {
        self.cache.clear_all()?;
        tracing::warn!(owner = %self.owner, "Local state reset");
        Ok(())
    }
}
