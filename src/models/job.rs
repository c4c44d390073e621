use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use strum::{Display, EnumString};

use crate::models::wardrobe::{Outfit, TryOnImage};

/// Kind of asynchronous server-side job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq, Hash)]
#[strum(serialize_all = "snake_case")]
pub enum JobKind {
    OutfitGeneration,
    TryOnRender,
}

/// Client-side lifecycle state of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    NotStarted,
    Processing,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// Server-assigned job identifier (a timestamp-derived string for outfits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-installation user identifier scoping jobs and cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerKey(pub String);

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What to ask the backend to start.
#[derive(Debug, Clone, PartialEq)]
pub enum JobRequest {
    Outfit { anchor_cloth_id: Option<i64> },
    TryOn { coordinate_id: String },
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::Outfit { .. } => JobKind::OutfitGeneration,
            JobRequest::TryOn { .. } => JobKind::TryOnRender,
        }
    }
}

/// Result payload of a completed job, shaped by its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobOutput {
    Outfit(Outfit),
    TryOn(TryOnImage),
}

/// Remote job state as reported by a status check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteState {
    Processing,
    Completed,
    Failed,
    /// Anything else the backend reports (e.g. no job recorded yet).
    #[serde(other)]
    Idle,
}

/// One status-check response.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub state: RemoteState,
    pub output: Option<JobOutput>,
    pub failure_reason: Option<String>,
}

impl StatusReport {
    pub fn processing() -> Self {
        Self { state: RemoteState::Processing, output: None, failure_reason: None }
    }

    pub fn completed(output: JobOutput) -> Self {
        Self { state: RemoteState::Completed, output: Some(output), failure_reason: None }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self { state: RemoteState::Failed, output: None, failure_reason: Some(reason.into()) }
    }
}

/// Snapshot of one job tracked by a poller.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub job_id: JobId,
    pub kind: JobKind,
    pub state: JobState,
    pub result: Option<JobOutput>,
    pub failure_reason: Option<String>,
}

/// Polling configuration selected once per job kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobKindConfig {
    pub kind: JobKind,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobSettings {
    pub outfit: JobKindConfig,
    pub try_on: JobKindConfig,
    /// Jobs still unfinished after this long are failed with "timeout".
    pub timeout: Duration,
}

impl JobSettings {
    pub fn config_for(&self, kind: JobKind) -> JobKindConfig {
        match kind {
            JobKind::OutfitGeneration => self.outfit,
            JobKind::TryOnRender => self.try_on,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_state_wire_names() {
        let state: RemoteState = serde_json::from_str("\"COMPLETED\"").unwrap();
        assert_eq!(state, RemoteState::Completed);
        let state: RemoteState = serde_json::from_str("\"PROCESSING\"").unwrap();
        assert_eq!(state, RemoteState::Processing);
        let state: RemoteState = serde_json::from_str("\"NONE\"").unwrap();
        assert_eq!(state, RemoteState::Idle);
    }

    #[test]
    fn test_request_kind() {
        assert_eq!(JobRequest::Outfit { anchor_cloth_id: None }.kind(), JobKind::OutfitGeneration);
        assert_eq!(
            JobRequest::TryOn { coordinate_id: "c1".to_string() }.kind(),
            JobKind::TryOnRender
        );
        assert_eq!(JobKind::TryOnRender.to_string(), "try_on_render");
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Processing.is_terminal());
        assert!(!JobState::NotStarted.is_terminal());
    }
}
