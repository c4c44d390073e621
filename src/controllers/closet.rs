use garde::Validate;
use std::sync::Arc;

use crate::controllers::FlowError;
use crate::models::cache::{CacheKey, ValidityTag};
use crate::models::job::OwnerKey;
use crate::models::wardrobe::{Garment, GarmentCategory, GarmentDraft, Inventory};
use crate::services::api::RemoteClient;
use crate::services::cache::{CacheError, CacheStore};
use crate::services::events::{AppEvent, EventSink};
use crate::services::guides::{GuideId, GuideSequencer};

/// A photo uploaded and analysed, awaiting the user's confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedPhoto {
    pub image_url: String,
    pub preview_url: Option<String>,
    pub draft: GarmentDraft,
}

/// Garment inventory reads and mutations.
pub struct Closet {
    remote: Arc<dyn RemoteClient>,
    cache: CacheStore,
    events: Arc<dyn EventSink>,
    guides: GuideSequencer,
    owner: OwnerKey,
}

impl Closet {
    pub fn new(
        remote: Arc<dyn RemoteClient>,
        cache: CacheStore,
        events: Arc<dyn EventSink>,
        guides: GuideSequencer,
        owner: OwnerKey,
    ) -> Self {
        Self { remote, cache, events, guides, owner }
    }

    /// Grouped inventory; valid until an `inventory-changed` event forces a refresh.
    pub async fn inventory(&self, force_refresh: bool) -> Result<Inventory, CacheError> {
        let (remote, owner) = (&self.remote, &self.owner);
        self.cache
            .fetch_with_cache(CacheKey::Inventory, &ValidityTag::unconditional(), force_refresh, || async move {
                let garments = remote.list_garments(owner, None).await?;
                Ok(Inventory::group(garments))
            })
            .await
    }

    /// Upload a garment photo and ask the backend to propose its attributes.
    pub async fn analyze_photo(&self, bytes: Vec<u8>) -> Result<AnalyzedPhoto, FlowError> {
        let target = self.remote.request_upload_url("jpg").await?;
        self.remote.upload_image(&target, bytes).await?;
        let draft = self.remote.analyze_garment(&self.owner, &target.image_url).await?;

        tracing::info!(image_url = %target.image_url, category = %draft.category, "Garment photo analysed");

        Ok(AnalyzedPhoto {
            image_url: target.image_url,
            preview_url: target.download_url,
            draft,
        })
    }

    /// Register a garment and notify screens showing inventory or history.
    pub async fn register(&self, image_url: &str, draft: &GarmentDraft) -> Result<Garment, FlowError> {
        validate_draft(draft)?;

        let garment = self.remote.register_garment(&self.owner, image_url, draft).await?;
        tracing::info!(cloth_id = garment.cloth_id, category = %garment.category, "Garment registered");

        self.events.publish(AppEvent::InventoryChanged);
        self.events.publish(AppEvent::HomeRefresh);
        if self.guides.should_show(GuideId::CoordinationStart) {
            self.events.publish(AppEvent::FirstUploadDone);
        }

        Ok(garment)
    }

    pub async fn update(&self, cloth_id: i64, draft: &GarmentDraft) -> Result<(), FlowError> {
        validate_draft(draft)?;
        self.remote.update_garment(&self.owner, cloth_id, draft).await?;
        tracing::info!(cloth_id, "Garment updated");
        self.events.publish(AppEvent::InventoryChanged);
        Ok(())
    }

    /// Delete a garment. Past outfits that used it stay in history.
    pub async fn delete(&self, cloth_id: i64) -> Result<(), FlowError> {
        self.remote.delete_garment(&self.owner, cloth_id).await?;
        tracing::info!(cloth_id, "Garment deleted");
        self.events.publish(AppEvent::InventoryChanged);
        Ok(())
    }
}

fn validate_draft(draft: &GarmentDraft) -> Result<(), FlowError> {
    draft.validate()?;
    draft
        .category
        .parse::<GarmentCategory>()
        .map_err(|_| FlowError::Invalid(format!("unknown category: {}", draft.category)))?;
    Ok(())
}
