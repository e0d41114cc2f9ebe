// SPDX-License-Identifier: MIT

//! Normalized activity model shared by all sources and destinations.
//!
//! Every source adapter translates a third-party payload into a
//! `StandardizedActivity` before it enters the pipeline; every uploader
//! consumes one on the way out. The tree is Session -> Lap -> Record,
//! where a Record carries one timestamped sample.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ingestion sources. Some of these have a corresponding destination
/// (see `loop_prevention`), others are source-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Strava,
    Hevy,
    Fitbit,
    FileUpload,
    ParkrunResults,
}

impl Source {
    /// Lowercase identifier used in document ids and metadata keys.
    pub fn id(&self) -> &'static str {
        match self {
            Source::Strava => "strava",
            Source::Hevy => "hevy",
            Source::Fitbit => "fitbit",
            Source::FileUpload => "file_upload",
            Source::ParkrunResults => "parkrun_results",
        }
    }
}

/// Upload destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Strava,
    Hevy,
    TrainingPeaks,
    Intervals,
    GoogleSheets,
}

impl Destination {
    /// Lowercase identifier used in topic names, document ids and
    /// metadata keys.
    pub fn id(&self) -> &'static str {
        match self {
            Destination::Strava => "strava",
            Destination::Hevy => "hevy",
            Destination::TrainingPeaks => "trainingpeaks",
            Destination::Intervals => "intervals",
            Destination::GoogleSheets => "googlesheets",
        }
    }
}

/// High-level activity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    #[default]
    Unspecified,
    Run,
    Ride,
    Swim,
    Walk,
    Hike,
    StrengthTraining,
    Workout,
}

/// One timestamped sample within a lap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cadence: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_long: Option<f64>,
}

impl Record {
    /// An empty placeholder record at the given timestamp.
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            heart_rate: None,
            power: None,
            cadence: None,
            position_lat: None,
            position_long: None,
        }
    }
}

/// One lap within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lap {
    pub start_time: DateTime<Utc>,
    /// Elapsed time in seconds.
    pub total_elapsed_time: u64,
    #[serde(default)]
    pub records: Vec<Record>,
}

/// One session within an activity. Valid activities carry exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub start_time: DateTime<Utc>,
    /// Elapsed time in seconds.
    pub total_elapsed_time: u64,
    #[serde(default)]
    pub laps: Vec<Lap>,
}

/// A normalized activity as produced by a source adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizedActivity {
    /// Identifier assigned by the source platform.
    pub external_id: String,
    pub source: Source,
    pub name: String,
    /// Narrative description. Append-only; organized into named sections
    /// (see `description`).
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub activity_type: ActivityType,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub sessions: Vec<Session>,
}

impl StandardizedActivity {
    /// Validate the activity shape before enrichment.
    ///
    /// Malformed input will never become valid on redelivery, so these
    /// are surfaced as non-retryable errors.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.sessions.len() != 1 {
            return Err(AppError::BadRequest(
                "multiple sessions not supported".to_string(),
            ));
        }
        if self.sessions[0].total_elapsed_time == 0 {
            return Err(AppError::BadRequest(
                "session total elapsed time is 0".to_string(),
            ));
        }
        Ok(())
    }
}
