use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::job::{JobId, JobKind, JobOutput, JobRequest, OwnerKey, RemoteState, StatusReport};
use crate::models::wardrobe::{
    Garment, GarmentDraft, Outfit, TryOnImage, UploadTarget, UserProfile, WeatherSnapshot,
};

/// Request/response calls against the backend's resources.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn get_user(&self, owner: &OwnerKey) -> Result<UserProfile, ApiError>;

    async fn save_profile(&self, profile: &UserProfile) -> Result<(), ApiError>;

    async fn get_weather(&self, owner: &OwnerKey, city: &str) -> Result<WeatherSnapshot, ApiError>;

    async fn list_garments(
        &self,
        owner: &OwnerKey,
        category: Option<&str>,
    ) -> Result<Vec<Garment>, ApiError>;

    async fn register_garment(
        &self,
        owner: &OwnerKey,
        image_url: &str,
        draft: &GarmentDraft,
    ) -> Result<Garment, ApiError>;

    async fn update_garment(
        &self,
        owner: &OwnerKey,
        cloth_id: i64,
        draft: &GarmentDraft,
    ) -> Result<(), ApiError>;

    async fn delete_garment(&self, owner: &OwnerKey, cloth_id: i64) -> Result<(), ApiError>;

    async fn request_upload_url(&self, file_type: &str) -> Result<UploadTarget, ApiError>;

    async fn upload_image(&self, target: &UploadTarget, bytes: Vec<u8>) -> Result<(), ApiError>;

    async fn analyze_garment(&self, owner: &OwnerKey, image_url: &str) -> Result<GarmentDraft, ApiError>;

    async fn list_history(&self, owner: &OwnerKey) -> Result<Vec<Outfit>, ApiError>;
}

/// Begin/status calls for long-running server-side jobs.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Start a job and return its identifier.
    async fn begin(&self, owner: &OwnerKey, request: &JobRequest) -> Result<JobId, ApiError>;

    /// Check the state of a previously started job.
    async fn status(
        &self,
        owner: &OwnerKey,
        kind: JobKind,
        job_id: &JobId,
    ) -> Result<StatusReport, ApiError>;
}

/// HTTP client for the Coordii backend.
pub struct HttpApiClient {
    http: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartedCoordinate {
    coordinate_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusWire {
    status: RemoteState,
    #[serde(default)]
    data: Option<Outfit>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    fail_reason: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GarmentWrite<'a> {
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cloth_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
    #[serde(flatten)]
    draft: &'a GarmentDraft,
}

impl StatusWire {
    fn into_report(self, kind: JobKind) -> StatusReport {
        match (self.status, kind) {
            (RemoteState::Completed, JobKind::OutfitGeneration) => {
                StatusReport::completed(JobOutput::Outfit(self.data.unwrap_or_default()))
            }
            (RemoteState::Completed, JobKind::TryOnRender) => match self.image_url {
                Some(image_url) => StatusReport::completed(JobOutput::TryOn(TryOnImage { image_url })),
                // The render is recorded but the image is not published yet.
                None => StatusReport::processing(),
            },
            (RemoteState::Failed, _) => StatusReport {
                state: RemoteState::Failed,
                output: None,
                failure_reason: self.fail_reason,
            },
            (state, _) => StatusReport { state, output: None, failure_reason: None },
        }
    }
}

impl HttpApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(timeout).build().map_err(ApiError::Http)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and decode the JSON body, mapping non-success statuses
    /// to `ApiError::Status` with the body's `message`.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, path: &str) -> Result<T, ApiError> {
        tracing::debug!(path, "API request");
        let response = request.send().await.map_err(ApiError::Http)?;
        let status = response.status();
        let body = response.bytes().await.map_err(ApiError::Http)?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| "API Error".to_string());
            tracing::warn!(path, status = status.as_u16(), message = %message, "API request failed");
            return Err(ApiError::Status { status: status.as_u16(), message });
        }

        serde_json::from_slice(&body).map_err(ApiError::Decode)
    }

    async fn try_on_status(&self, owner: &OwnerKey, coordinate_id: &str) -> Result<StatusWire, ApiError> {
        let request = self
            .http
            .get(self.url("/try-on"))
            .query(&[("userId", owner.0.as_str()), ("coordinateId", coordinate_id)]);
        self.send(request, "/try-on").await
    }
}

#[async_trait]
impl RemoteClient for HttpApiClient {
    async fn get_user(&self, owner: &OwnerKey) -> Result<UserProfile, ApiError> {
        let request = self.http.get(self.url("/users")).query(&[("userId", &owner.0)]);
        self.send(request, "/users").await
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<(), ApiError> {
        let request = self.http.post(self.url("/users")).json(profile);
        self.send::<serde_json::Value>(request, "/users").await?;
        Ok(())
    }

    async fn get_weather(&self, owner: &OwnerKey, city: &str) -> Result<WeatherSnapshot, ApiError> {
        let request = self
            .http
            .post(self.url("/weather"))
            .json(&serde_json::json!({ "userId": owner.0, "city": city }));
        self.send(request, "/weather").await
    }

    async fn list_garments(
        &self,
        owner: &OwnerKey,
        category: Option<&str>,
    ) -> Result<Vec<Garment>, ApiError> {
        let mut query = vec![("userId", owner.0.as_str())];
        if let Some(category) = category {
            query.push(("category", category));
        }
        let request = self.http.get(self.url("/clothes")).query(&query);
        self.send(request, "/clothes").await
    }

    async fn register_garment(
        &self,
        owner: &OwnerKey,
        image_url: &str,
        draft: &GarmentDraft,
    ) -> Result<Garment, ApiError> {
        let body = GarmentWrite {
            user_id: &owner.0,
            cloth_id: None,
            image_url: Some(image_url),
            draft,
        };
        let request = self.http.post(self.url("/clothes")).json(&body);
        let envelope: DataEnvelope<Garment> = self.send(request, "/clothes").await?;
        Ok(envelope.data)
    }

    async fn update_garment(
        &self,
        owner: &OwnerKey,
        cloth_id: i64,
        draft: &GarmentDraft,
    ) -> Result<(), ApiError> {
        let body = GarmentWrite {
            user_id: &owner.0,
            cloth_id: Some(cloth_id),
            image_url: None,
            draft,
        };
        let request = self.http.put(self.url("/clothes")).json(&body);
        self.send::<serde_json::Value>(request, "/clothes").await?;
        Ok(())
    }

    async fn delete_garment(&self, owner: &OwnerKey, cloth_id: i64) -> Result<(), ApiError> {
        let request = self
            .http
            .delete(self.url("/clothes"))
            .json(&serde_json::json!({ "userId": owner.0, "clothId": cloth_id }));
        self.send::<serde_json::Value>(request, "/clothes").await?;
        Ok(())
    }

    async fn request_upload_url(&self, file_type: &str) -> Result<UploadTarget, ApiError> {
        let request = self
            .http
            .post(self.url("/upload-url"))
            .json(&serde_json::json!({ "fileType": file_type }));
        self.send(request, "/upload-url").await
    }

    async fn upload_image(&self, target: &UploadTarget, bytes: Vec<u8>) -> Result<(), ApiError> {
        let format = image::guess_format(&bytes).map_err(|_| ApiError::UnsupportedImage)?;

        let response = self
            .http
            .put(&target.upload_url)
            .header(reqwest::header::CONTENT_TYPE, format.to_mime_type())
            .body(bytes)
            .send()
            .await
            .map_err(ApiError::Http)?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Upload { status: status.as_u16(), body });
        }

        tracing::debug!(image_url = %target.image_url, "Image uploaded");
        Ok(())
    }

    async fn analyze_garment(&self, owner: &OwnerKey, image_url: &str) -> Result<GarmentDraft, ApiError> {
        let request = self
            .http
            .post(self.url("/analyze"))
            .json(&serde_json::json!({ "imageUrl": image_url, "userId": owner.0 }));
        let envelope: DataEnvelope<GarmentDraft> = self.send(request, "/analyze").await?;
        Ok(envelope.data)
    }

    async fn list_history(&self, owner: &OwnerKey) -> Result<Vec<Outfit>, ApiError> {
        let request = self.http.get(self.url("/coordinates")).query(&[("userId", &owner.0)]);
        self.send(request, "/coordinates").await
    }
}

#[async_trait]
impl JobBackend for HttpApiClient {
    async fn begin(&self, owner: &OwnerKey, request: &JobRequest) -> Result<JobId, ApiError> {
        match request {
            JobRequest::Outfit { anchor_cloth_id } => {
                let mut body = serde_json::json!({ "userId": owner.0 });
                if let Some(anchor) = anchor_cloth_id {
                    body["anchorClothId"] = serde_json::json!(anchor);
                }
                let request = self.http.post(self.url("/coordinates")).json(&body);
                let started: StartedCoordinate = self.send(request, "/coordinates").await?;
                Ok(JobId(started.coordinate_id))
            }
            JobRequest::TryOn { coordinate_id } => {
                let current = self.try_on_status(owner, coordinate_id).await?;
                if resumes_existing_render(current.status) {
                    tracing::info!(coordinate_id, status = ?current.status, "Resuming existing try-on render");
                    return Ok(JobId(coordinate_id.clone()));
                }

                let request = self
                    .http
                    .post(self.url("/try-on"))
                    .json(&serde_json::json!({ "userId": owner.0, "coordinateId": coordinate_id }));
                self.send::<serde_json::Value>(request, "/try-on").await?;
                Ok(JobId(coordinate_id.clone()))
            }
        }
    }

    async fn status(
        &self,
        owner: &OwnerKey,
        kind: JobKind,
        job_id: &JobId,
    ) -> Result<StatusReport, ApiError> {
        let wire = match kind {
            JobKind::OutfitGeneration => {
                let request = self
                    .http
                    .get(self.url("/coordinates/status"))
                    .query(&[("userId", owner.0.as_str()), ("coordinateId", job_id.0.as_str())]);
                self.send::<StatusWire>(request, "/coordinates/status").await?
            }
            JobKind::TryOnRender => self.try_on_status(owner, &job_id.0).await?,
        };
        Ok(wire.into_report(kind))
    }
}

/// A try-on render already recorded for an outfit is tracked instead of
/// started again. A failed one surfaces its reason on the first poll; the
/// user retries from scratch only when no render is recorded.
fn resumes_existing_render(state: RemoteState) -> bool {
    matches!(state, RemoteState::Processing | RemoteState::Completed | RemoteState::Failed)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} (status {status})")]
    Status { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Image upload failed with status {status}: {body}")]
    Upload { status: u16, body: String },

    #[error("Unsupported image format")]
    UnsupportedImage,
}

impl ApiError {
    /// Human-readable message suitable for surfacing to the user.
    pub fn message(&self) -> String {
        match self {
            ApiError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
