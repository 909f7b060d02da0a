//! Video generation models and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use vireo_core::types::{DbId, Timestamp};
use vireo_core::video_params::{VideoResolution, VideoStatus};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from `video_generations`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VideoGeneration {
    pub id: DbId,
    pub user_id: DbId,
    pub status: String,
    pub generation_mode: String,
    pub aspect_ratio: String,
    pub resolution: String,
    pub duration_seconds: i32,
    pub prompt: String,
    pub media_uri: Option<String>,
    pub source_video_id: Option<DbId>,
    pub credit_cost: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl VideoGeneration {
    /// Typed status, `None` for unrecognized stored values.
    pub fn video_status(&self) -> Option<VideoStatus> {
        match self.status.as_str() {
            "pending" => Some(VideoStatus::Pending),
            "processing" => Some(VideoStatus::Processing),
            "completed" => Some(VideoStatus::Completed),
            "failed" => Some(VideoStatus::Failed),
            _ => None,
        }
    }

    /// Typed resolution, `None` for unrecognized stored values.
    pub fn video_resolution(&self) -> Option<VideoResolution> {
        match self.resolution.as_str() {
            "720p" => Some(VideoResolution::P720),
            "1080p" => Some(VideoResolution::P1080),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Input for queueing a video-extension task.
#[derive(Debug, Clone)]
pub struct NewExtensionTask {
    pub user_id: DbId,
    pub source_video_id: DbId,
    pub prompt: String,
    pub aspect_ratio: String,
    pub duration_seconds: i32,
    pub credit_cost: i32,
}
