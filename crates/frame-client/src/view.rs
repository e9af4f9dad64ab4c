//! Pure projection from session phase and view state to a screen descriptor.

use crate::model::{DownloaderStatus, GalleryEntry, InFlightFlags, MfaDevice, SessionPhase};
use crate::state::ViewState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenKind {
    Spinner,
    Login,
    DeviceChoice,
    CodeEntry,
    Status,
}

impl ScreenKind {
    pub fn for_phase(phase: SessionPhase) -> Self {
        match phase {
            SessionPhase::Querying => ScreenKind::Spinner,
            SessionPhase::NotLoggedIn => ScreenKind::Login,
            SessionPhase::NeedToSendMfaCode => ScreenKind::DeviceChoice,
            SessionPhase::WaitingForMfaCode => ScreenKind::CodeEntry,
            SessionPhase::LoggedIn => ScreenKind::Status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceOption {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressLines {
    pub status_text: String,
    pub album_line: String,
    pub fetched_line: String,
    pub cache_line: String,
}

impl ProgressLines {
    fn from_status(status: &DownloaderStatus) -> Self {
        Self {
            status_text: status.status_text.clone(),
            album_line: format!("Album is: {}", status.album),
            fetched_line: format!(
                "Fetched {} photos, {} left",
                status.num_photos_fetched, status.num_photos
            ),
            cache_line: format!("Cache use: {}%", format_percent(status.cache_use_clamped())),
        }
    }

    pub fn lines(&self) -> [&str; 4] {
        [
            &self.status_text,
            &self.album_line,
            &self.fetched_line,
            &self.cache_line,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryItem {
    pub path: String,
    /// Server path of the image, e.g. `/media/a.jpg`.
    pub media_path: String,
}

impl From<&GalleryEntry> for GalleryItem {
    fn from(entry: &GalleryEntry) -> Self {
        Self {
            path: entry.path.clone(),
            media_path: format!("/{}", entry.media_path()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusScreen {
    /// `None` until the first successful poll.
    pub progress: Option<ProgressLines>,
    pub gallery: Vec<GalleryItem>,
    pub screen_controls_enabled: bool,
    pub delete_enabled: bool,
    pub poll_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Spinner,
    Login,
    DeviceChoice { devices: Vec<DeviceOption> },
    CodeEntry,
    Status(StatusScreen),
}

impl Screen {
    pub fn kind(&self) -> ScreenKind {
        match self {
            Screen::Spinner => ScreenKind::Spinner,
            Screen::Login => ScreenKind::Login,
            Screen::DeviceChoice { .. } => ScreenKind::DeviceChoice,
            Screen::CodeEntry => ScreenKind::CodeEntry,
            Screen::Status(_) => ScreenKind::Status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub screen: Screen,
    pub notice: Option<String>,
    /// An authentication request is outstanding; input must not be resubmitted.
    pub busy: bool,
}

pub fn project(
    phase: SessionPhase,
    state: &ViewState,
    devices: &[MfaDevice],
    in_flight: InFlightFlags,
    auth_pending: bool,
) -> Projection {
    let screen = match phase {
        SessionPhase::Querying => Screen::Spinner,
        SessionPhase::NotLoggedIn => Screen::Login,
        SessionPhase::NeedToSendMfaCode => Screen::DeviceChoice {
            devices: devices
                .iter()
                .map(|device| DeviceOption {
                    id: device.device_id.to_string(),
                    label: device.label(),
                })
                .collect(),
        },
        SessionPhase::WaitingForMfaCode => Screen::CodeEntry,
        SessionPhase::LoggedIn => Screen::Status(status_screen(state, in_flight)),
    };

    Projection {
        screen,
        notice: state.notice.clone(),
        busy: auth_pending,
    }
}

fn status_screen(state: &ViewState, in_flight: InFlightFlags) -> StatusScreen {
    let snapshot = state.snapshot.as_deref();
    StatusScreen {
        progress: snapshot.map(|snapshot| ProgressLines::from_status(&snapshot.status)),
        gallery: snapshot
            .map(|snapshot| snapshot.gallery.iter().map(GalleryItem::from).collect())
            .unwrap_or_default(),
        screen_controls_enabled: !in_flight.screen_control,
        delete_enabled: !in_flight.delete_photo,
        poll_error: state.last_poll_error.clone(),
    }
}

/// Up to two decimals, the precision the backend reports, without trailing zeros.
fn format_percent(value: f64) -> String {
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
