//! Generation-mode parameter policy for video requests.
//!
//! Each generation mode constrains the parameter space differently
//! (aspect ratio, duration, resolution, person-generation policy), and
//! some regions additionally restrict the person-generation options.
//! [`validate_video_parameters`] checks every applicable rule and
//! accumulates all violations instead of stopping at the first one, so
//! the UI can surface the complete set of problems in a single round
//! trip. The `allowed_*` lookup helpers drive the option pickers in the
//! frontend and must stay consistent with the validator.

use serde::{Deserialize, Serialize};

/* --------------------------------------------------------------------------
Limits
-------------------------------------------------------------------------- */

/// Hard cap on a video's total duration after extension, in seconds.
pub const MAX_TOTAL_DURATION_SECS: u32 = 148;

/// Net seconds an extension adds for the default 8-second extend request.
///
/// Used by [`can_extend_video`], which predates variable extension
/// durations; the product only offers 8-second extends from the UI.
pub const DEFAULT_NET_EXTENSION_SECS: u32 = 7;

/// Regions where `person_generation = allow_all` is not permitted.
///
/// `MENA` is the umbrella code; the member-state codes are listed as
/// well because upstream geo-IP resolution may return either.
pub const RESTRICTED_REGIONS: &[&str] = &[
    "EU", "UK", "CH", // European codes
    "MENA", "SA", "AE", "QA", "KW", "OM", "BH", // MENA umbrella + member states
];

/// Whether a region code falls under the person-generation restriction.
/// Matching is case-insensitive.
pub fn is_restricted_region(region: &str) -> bool {
    let upper = region.to_ascii_uppercase();
    RESTRICTED_REGIONS.contains(&upper.as_str())
}

/* --------------------------------------------------------------------------
Request enums
-------------------------------------------------------------------------- */

/// How the video is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationMode {
    TextToVideo,
    ImageToVideo,
    ReferenceImages,
    FirstLastFrame,
    ExtendVideo,
}

impl GenerationMode {
    /// Wire string, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextToVideo => "text-to-video",
            Self::ImageToVideo => "image-to-video",
            Self::ReferenceImages => "reference-images",
            Self::FirstLastFrame => "first-last-frame",
            Self::ExtendVideo => "extend-video",
        }
    }
}

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
        }
    }
}

/// Output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoResolution {
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl VideoResolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::P720 => "720p",
            Self::P1080 => "1080p",
        }
    }
}

/// Requested clip duration. Only 4, 6, and 8 seconds exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum VideoDuration {
    Secs4,
    Secs6,
    Secs8,
}

impl VideoDuration {
    pub fn as_secs(self) -> u32 {
        match self {
            Self::Secs4 => 4,
            Self::Secs6 => 6,
            Self::Secs8 => 8,
        }
    }
}

impl TryFrom<u32> for VideoDuration {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(Self::Secs4),
            6 => Ok(Self::Secs6),
            8 => Ok(Self::Secs8),
            other => Err(format!("duration must be one of 4, 6, 8 (got {other})")),
        }
    }
}

impl From<VideoDuration> for u32 {
    fn from(value: VideoDuration) -> Self {
        value.as_secs()
    }
}

/// Person-generation policy requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonGeneration {
    AllowAll,
    AllowAdult,
    DontAllow,
}

impl PersonGeneration {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllowAll => "allow_all",
            Self::AllowAdult => "allow_adult",
            Self::DontAllow => "dont_allow",
        }
    }

    /// Parse a wire string. Returns `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "allow_all" => Some(Self::AllowAll),
            "allow_adult" => Some(Self::AllowAdult),
            "dont_allow" => Some(Self::DontAllow),
            _ => None,
        }
    }
}

/// Lifecycle state of a generated video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl VideoStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/* --------------------------------------------------------------------------
Request / result types
-------------------------------------------------------------------------- */

/// A video generation request as seen by the policy layer.
///
/// `person_generation` is optional on purpose: the mode restriction
/// (rule 4) only fires when the caller set the field explicitly, never
/// for the implicit default.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoGenerationParams {
    pub generation_mode: GenerationMode,
    pub aspect_ratio: AspectRatio,
    pub resolution: VideoResolution,
    pub duration: VideoDuration,
    #[serde(default)]
    pub person_generation: Option<PersonGeneration>,
    /// Duration of the source clip, in seconds. Only meaningful for
    /// `extend-video`; when absent the extension-limit rule is skipped.
    #[serde(default)]
    pub source_video_duration: Option<u32>,
    /// Caller's region code, from upstream geo-IP resolution.
    #[serde(default)]
    pub user_region: Option<String>,
}

/// Stable machine-readable violation codes. The wire strings are part of
/// the public API contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    InvalidAspectRatioForMode,
    InvalidDurationForMode,
    #[serde(rename = "EXTENSION_NOT_SUPPORTED_FOR_1080P")]
    ExtensionNotSupportedFor1080p,
    ExtensionExceedsLimit,
    InvalidPersonGenerationForMode,
    PersonGenerationNotAllowedInRegion,
    MissingSourceVideoId,
    MissingPrompt,
    InvalidPersonGeneration,
    VideoNotFound,
    ExtensionNotSupported,
}

impl ValidationCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidAspectRatioForMode => "INVALID_ASPECT_RATIO_FOR_MODE",
            Self::InvalidDurationForMode => "INVALID_DURATION_FOR_MODE",
            Self::ExtensionNotSupportedFor1080p => "EXTENSION_NOT_SUPPORTED_FOR_1080P",
            Self::ExtensionExceedsLimit => "EXTENSION_EXCEEDS_LIMIT",
            Self::InvalidPersonGenerationForMode => "INVALID_PERSON_GENERATION_FOR_MODE",
            Self::PersonGenerationNotAllowedInRegion => "PERSON_GENERATION_NOT_ALLOWED_IN_REGION",
            Self::MissingSourceVideoId => "MISSING_SOURCE_VIDEO_ID",
            Self::MissingPrompt => "MISSING_PROMPT",
            Self::InvalidPersonGeneration => "INVALID_PERSON_GENERATION",
            Self::VideoNotFound => "VIDEO_NOT_FOUND",
            Self::ExtensionNotSupported => "EXTENSION_NOT_SUPPORTED",
        }
    }
}

/// A single parameter violation.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    pub code: ValidationCode,
    pub message: String,
    pub field: &'static str,
}

/// Aggregated result of validating one request.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/* --------------------------------------------------------------------------
Validator
-------------------------------------------------------------------------- */

/// Net seconds added to the source clip by an extension of the given
/// nominal duration (the first second overlaps the source's last frame).
pub fn net_extension_secs(duration: VideoDuration) -> u32 {
    duration.as_secs() - 1
}

/// Validate a generation request against the per-mode parameter policy.
///
/// Rules are evaluated in a fixed order and every applicable rule is
/// checked regardless of earlier failures; errors append in rule order.
///
/// 1. `reference-images` forces 16:9 and 8 seconds (two independent checks).
/// 2. `first-last-frame` forces 8 seconds.
/// 3. `extend-video` forces 720p, and -- when the source duration is
///    known -- rejects extensions that would push the total past
///    [`MAX_TOTAL_DURATION_SECS`].
/// 4. `image-to-video` / `reference-images` / `first-last-frame` only
///    accept `allow_adult`, and only when the caller set the field.
/// 5. Restricted regions reject `allow_all`.
pub fn validate_video_parameters(params: &VideoGenerationParams) -> ValidationResult {
    let mut errors = Vec::new();

    // Rule 1: reference-images is pinned to 16:9 at 8 seconds.
    if params.generation_mode == GenerationMode::ReferenceImages {
        if params.aspect_ratio != AspectRatio::Landscape {
            errors.push(ValidationError {
                code: ValidationCode::InvalidAspectRatioForMode,
                message: "reference-images模式仅支持16:9宽高比".to_string(),
                field: "aspectRatio",
            });
        }
        if params.duration != VideoDuration::Secs8 {
            errors.push(ValidationError {
                code: ValidationCode::InvalidDurationForMode,
                message: "reference-images模式仅支持8秒时长".to_string(),
                field: "duration",
            });
        }
    }

    // Rule 2: first-last-frame is pinned to 8 seconds.
    if params.generation_mode == GenerationMode::FirstLastFrame
        && params.duration != VideoDuration::Secs8
    {
        errors.push(ValidationError {
            code: ValidationCode::InvalidDurationForMode,
            message: "first-last-frame模式仅支持8秒时长".to_string(),
            field: "duration",
        });
    }

    // Rule 3: extension constraints.
    if params.generation_mode == GenerationMode::ExtendVideo {
        if params.resolution != VideoResolution::P720 {
            errors.push(ValidationError {
                code: ValidationCode::ExtensionNotSupportedFor1080p,
                message: "视频延长仅支持720p分辨率，1080p视频无法延长".to_string(),
                field: "resolution",
            });
        }

        if let Some(source_secs) = params.source_video_duration {
            let total = source_secs + net_extension_secs(params.duration);
            if total > MAX_TOTAL_DURATION_SECS {
                errors.push(ValidationError {
                    code: ValidationCode::ExtensionExceedsLimit,
                    message: format!(
                        "视频延长后总时长将达到{total}秒，超过{MAX_TOTAL_DURATION_SECS}秒上限（源视频{source_secs}秒）"
                    ),
                    field: "sourceVideoDuration",
                });
            }
        }
    }

    // Rule 4: person-generation is locked to allow_adult in image-seeded
    // modes. Fires only when the caller set the field explicitly.
    if let Some(person_generation) = params.person_generation {
        let restricted_mode = matches!(
            params.generation_mode,
            GenerationMode::ImageToVideo
                | GenerationMode::ReferenceImages
                | GenerationMode::FirstLastFrame
        );
        if restricted_mode && person_generation != PersonGeneration::AllowAdult {
            errors.push(ValidationError {
                code: ValidationCode::InvalidPersonGenerationForMode,
                message: format!(
                    "{}模式仅支持personGeneration=allow_adult",
                    params.generation_mode.as_str()
                ),
                field: "personGeneration",
            });
        }

        // Rule 5: restricted regions forbid allow_all (allow_adult and
        // dont_allow both remain available).
        if let Some(region) = params.user_region.as_deref() {
            if is_restricted_region(region) && person_generation == PersonGeneration::AllowAll {
                errors.push(ValidationError {
                    code: ValidationCode::PersonGenerationNotAllowedInRegion,
                    message: format!(
                        "{region}地区禁止使用personGeneration=allow_all，请使用allow_adult或dont_allow"
                    ),
                    field: "personGeneration",
                });
            }
        }
    }

    ValidationResult::from_errors(errors)
}

/* --------------------------------------------------------------------------
Extend-request shape validation
-------------------------------------------------------------------------- */

/// Validate the request shape of a video-extension call.
///
/// This runs before any lookup of the source video: missing/blank fields
/// and malformed person-generation strings are reported here, in field
/// order, with all violations accumulated.
pub fn validate_extend_request(
    source_video_id: Option<&str>,
    prompt: Option<&str>,
    person_generation: Option<&str>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if source_video_id.map_or(true, |v| v.trim().is_empty()) {
        errors.push(ValidationError {
            code: ValidationCode::MissingSourceVideoId,
            message: "缺少必需字段：source_video_id".to_string(),
            field: "source_video_id",
        });
    }

    if prompt.map_or(true, |v| v.trim().is_empty()) {
        errors.push(ValidationError {
            code: ValidationCode::MissingPrompt,
            message: "缺少必需字段：prompt（延长部分的提示词）".to_string(),
            field: "prompt",
        });
    }

    if let Some(raw) = person_generation {
        if PersonGeneration::parse(raw).is_none() {
            errors.push(ValidationError {
                code: ValidationCode::InvalidPersonGeneration,
                message: "person_generation必须是以下之一：allow_all, allow_adult, dont_allow"
                    .to_string(),
                field: "person_generation",
            });
        }
    }

    errors
}

/* --------------------------------------------------------------------------
Allowed-option lookups (drive the frontend pickers)
-------------------------------------------------------------------------- */

/// Person-generation options available for a mode, optionally narrowed
/// by the caller's region.
///
/// Image-seeded modes always return only `allow_adult`, regardless of
/// region. Restricted regions drop `allow_all` from the open modes.
pub fn allowed_person_generation_options(
    mode: GenerationMode,
    region: Option<&str>,
) -> Vec<PersonGeneration> {
    let base: &[PersonGeneration] = match mode {
        GenerationMode::TextToVideo | GenerationMode::ExtendVideo => &[
            PersonGeneration::AllowAll,
            PersonGeneration::AllowAdult,
            PersonGeneration::DontAllow,
        ],
        GenerationMode::ImageToVideo
        | GenerationMode::ReferenceImages
        | GenerationMode::FirstLastFrame => &[PersonGeneration::AllowAdult],
    };

    match region {
        Some(r) if is_restricted_region(r) => base
            .iter()
            .copied()
            .filter(|&option| option != PersonGeneration::AllowAll)
            .collect(),
        _ => base.to_vec(),
    }
}

/// Durations available for a mode.
pub fn allowed_durations(mode: GenerationMode) -> &'static [VideoDuration] {
    match mode {
        GenerationMode::ReferenceImages | GenerationMode::FirstLastFrame => {
            &[VideoDuration::Secs8]
        }
        _ => &[VideoDuration::Secs4, VideoDuration::Secs6, VideoDuration::Secs8],
    }
}

/// Aspect ratios available for a mode.
pub fn allowed_aspect_ratios(mode: GenerationMode) -> &'static [AspectRatio] {
    match mode {
        GenerationMode::ReferenceImages => &[AspectRatio::Landscape],
        _ => &[AspectRatio::Landscape, AspectRatio::Portrait],
    }
}

/// Resolutions available for a mode.
pub fn allowed_resolutions(mode: GenerationMode) -> &'static [VideoResolution] {
    match mode {
        GenerationMode::ExtendVideo => &[VideoResolution::P720],
        _ => &[VideoResolution::P720, VideoResolution::P1080],
    }
}

/// Whether a generated video is eligible for extension.
///
/// Requires a completed 720p clip with a provider media URI whose total
/// duration after the default 8-second extend stays within the cap.
pub fn can_extend_video(
    status: VideoStatus,
    resolution: VideoResolution,
    duration_seconds: u32,
    media_uri: Option<&str>,
) -> bool {
    status == VideoStatus::Completed
        && resolution == VideoResolution::P720
        && duration_seconds + DEFAULT_NET_EXTENSION_SECS <= MAX_TOTAL_DURATION_SECS
        && media_uri.is_some()
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
