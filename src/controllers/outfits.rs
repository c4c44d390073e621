use std::sync::Arc;

use crate::controllers::FlowError;
use crate::models::job::{JobKind, JobRequest, OwnerKey};
use crate::services::api::RemoteClient;
use crate::services::events::{AppEvent, EventSink};
use crate::services::poller::{JobCallbacks, JobError, JobPoller, JobRunner};

const FACE_PHOTO_REQUIRED: &str = "face photo required";

/// Outfit generation and try-on rendering.
///
/// Both jobs publish `home-refresh` once they complete, after the caller's
/// own completion callback.
pub struct Outfits {
    remote: Arc<dyn RemoteClient>,
    runner: JobRunner,
    events: Arc<dyn EventSink>,
    owner: OwnerKey,
}

impl Outfits {
    pub fn new(remote: Arc<dyn RemoteClient>, runner: JobRunner, events: Arc<dyn EventSink>, owner: OwnerKey) -> Self {
        Self { remote, runner, events, owner }
    }

    /// Start an outfit-generation job, optionally built around one garment.
    pub async fn generate(&self, anchor_cloth_id: Option<i64>, callbacks: JobCallbacks) -> Result<JobPoller, FlowError> {
        let request = JobRequest::Outfit { anchor_cloth_id };
        Ok(self.runner.start(self.owner.clone(), request, self.with_refresh(callbacks)).await?)
    }

    /// Start a try-on render of a generated outfit on the user's face photo.
    pub async fn try_on(&self, coordinate_id: &str, callbacks: JobCallbacks) -> Result<JobPoller, FlowError> {
        let profile = self.remote.get_user(&self.owner).await?;
        if !profile.has_face_photo() {
            tracing::info!(owner = %self.owner, "Try-on refused, no face photo on file");
            return Err(JobError::StartFailed {
                kind: JobKind::TryOnRender,
                reason: FACE_PHOTO_REQUIRED.to_string(),
            }
            .into());
        }

        let request = JobRequest::TryOn {
            coordinate_id: coordinate_id.to_string(),
        };
        Ok(self.runner.start(self.owner.clone(), request, self.with_refresh(callbacks)).await?)
    }

    fn with_refresh(&self, callbacks: JobCallbacks) -> JobCallbacks {
        let events = Arc::clone(&self.events);
        callbacks.after_complete(move || events.publish(AppEvent::HomeRefresh))
    }
}
