//! Repository for the `video_generations` table.

use sqlx::PgPool;
use vireo_core::types::DbId;
use vireo_core::video_params::{GenerationMode, VideoResolution, VideoStatus};

use crate::models::video::{NewExtensionTask, VideoGeneration};

/// Column list for `video_generations` queries.
const COLUMNS: &str = "\
    id, user_id, status, generation_mode, aspect_ratio, resolution, \
    duration_seconds, prompt, media_uri, source_video_id, credit_cost, \
    created_at, updated_at";

/// Provides operations for generated-video rows.
pub struct VideoRepo;

impl VideoRepo {
    /// Look up a video owned by the given user.
    pub async fn find_for_user(
        pool: &PgPool,
        video_id: DbId,
        user_id: DbId,
    ) -> Result<Option<VideoGeneration>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM video_generations \
             WHERE id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, VideoGeneration>(&query)
            .bind(video_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Queue an extension task as a new pending generation row.
    ///
    /// Extensions are always 720p and inherit the source clip's aspect
    /// ratio; the external pipeline picks pending rows up from here.
    pub async fn insert_extension_task(
        pool: &PgPool,
        input: &NewExtensionTask,
    ) -> Result<VideoGeneration, sqlx::Error> {
        let query = format!(
            "INSERT INTO video_generations \
             (user_id, status, generation_mode, aspect_ratio, resolution, \
              duration_seconds, prompt, source_video_id, credit_cost) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VideoGeneration>(&query)
            .bind(input.user_id)
            .bind(VideoStatus::Pending.as_str())
            .bind(GenerationMode::ExtendVideo.as_str())
            .bind(&input.aspect_ratio)
            .bind(VideoResolution::P720.as_str())
            .bind(input.duration_seconds)
            .bind(&input.prompt)
            .bind(input.source_video_id)
            .bind(input.credit_cost)
            .fetch_one(pool)
            .await
    }
}
