//! Wire and domain types shared by the transport, session, poller and view layers.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Decode an explicit `null` the same way as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Authentication phase as asserted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionPhase {
    Querying,
    NotLoggedIn,
    #[serde(rename = "NeedToSendMFACode", alias = "NeedToSendMfaCode")]
    NeedToSendMfaCode,
    #[serde(rename = "WaitingForMFACode", alias = "WaitingForMfaCode")]
    WaitingForMfaCode,
    LoggedIn,
}

impl SessionPhase {
    pub const ALL: [SessionPhase; 5] = [
        SessionPhase::Querying,
        SessionPhase::NotLoggedIn,
        SessionPhase::NeedToSendMfaCode,
        SessionPhase::WaitingForMfaCode,
        SessionPhase::LoggedIn,
    ];

    /// Label used by the backend for this phase.
    pub fn label(self) -> &'static str {
        match self {
            SessionPhase::Querying => "Querying",
            SessionPhase::NotLoggedIn => "NotLoggedIn",
            SessionPhase::NeedToSendMfaCode => "NeedToSendMFACode",
            SessionPhase::WaitingForMfaCode => "WaitingForMFACode",
            SessionPhase::LoggedIn => "LoggedIn",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `{status: <phase label>}` body returned by every authentication endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PhaseResponse {
    pub status: SessionPhase,
}

/// Opaque device identifier. Kept as raw JSON so it is echoed back exactly as
/// the server sent it, whether string or number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(serde_json::Value);

impl DeviceId {
    pub fn matches(&self, candidate: &str) -> bool {
        match &self.0 {
            serde_json::Value::String(value) => value == candidate,
            other => other.to_string() == candidate,
        }
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        DeviceId(serde_json::Value::String(value.to_string()))
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            serde_json::Value::String(value) => f.write_str(value),
            other => write!(f, "{other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaDevice {
    pub device_id: DeviceId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub device_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone_number: String,
}

impl MfaDevice {
    pub fn label(&self) -> String {
        format!("{}: {}", self.device_type, self.phone_number)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloaderStatus {
    #[serde(rename = "status", default, deserialize_with = "null_as_default")]
    pub status_text: String,
    /// `null` while no album is configured.
    #[serde(default, deserialize_with = "null_as_default")]
    pub album: String,
    pub num_photos: u64,
    #[serde(rename = "numPhotosProcessed")]
    pub num_photos_fetched: u64,
    /// Older backends omit this field.
    #[serde(default, deserialize_with = "null_as_default")]
    pub cache_use_percent: f64,
}

impl DownloaderStatus {
    pub fn cache_use_clamped(&self) -> f64 {
        self.cache_use_percent.clamp(0.0, 100.0)
    }
}

/// One fetched photo, identified by its server-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GalleryEntry {
    pub path: String,
}

impl GalleryEntry {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Final path segment; the only part of the path sent on deletion.
    pub fn file_name(&self) -> Option<&str> {
        file_name(&self.path)
    }

    /// Server path serving the image bytes.
    pub fn media_path(&self) -> String {
        format!("media/{}", self.path.trim_start_matches('/'))
    }
}

pub(crate) fn file_name(path: &str) -> Option<&str> {
    path.rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
}

/// Result of one successful poll tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PollSnapshot {
    pub status: DownloaderStatus,
    pub gallery: Vec<GalleryEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenPower {
    On,
    Off,
}

impl ScreenPower {
    pub fn as_str(self) -> &'static str {
        match self {
            ScreenPower::On => "on",
            ScreenPower::Off => "off",
        }
    }
}

impl fmt::Display for ScreenPower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandClass {
    ScreenControl,
    DeletePhoto,
}

impl fmt::Display for CommandClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandClass::ScreenControl => f.write_str("screen control"),
            CommandClass::DeletePhoto => f.write_str("delete photo"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InFlightFlags {
    pub screen_control: bool,
    pub delete_photo: bool,
}
