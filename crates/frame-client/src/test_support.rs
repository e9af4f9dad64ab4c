//! Scriptable in-memory backend for unit tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::error::TransportError;
use crate::model::{DeviceId, DownloaderStatus, GalleryEntry, MfaDevice, ScreenPower, SessionPhase};
use crate::transport::StatusTransport;

pub(crate) struct FakeTransport {
    state: Mutex<FakeState>,
    command_gate: Semaphore,
}

struct FakeState {
    phase: SessionPhase,
    login_reply: SessionPhase,
    choose_reply: SessionPhase,
    code_reply: SessionPhase,
    devices: Vec<MfaDevice>,
    status: DownloaderStatus,
    gallery: Vec<GalleryEntry>,
    fail_status: bool,
    fail_next_login: bool,
    poll_failure: Option<StatusCode>,
    delete_not_found: bool,
    hold_commands: bool,
    auth_delay: Duration,
    poll_delay: Duration,
    logins: Vec<(String, String)>,
    chosen: Vec<String>,
    codes: Vec<String>,
    device_list_calls: usize,
    poll_started_at: Vec<Instant>,
    polls_in_flight: usize,
    max_polls_in_flight: usize,
    screen_commands: Vec<ScreenPower>,
    deleted: Vec<String>,
}

pub(crate) fn server_error(status: StatusCode) -> TransportError {
    TransportError::Server {
        status,
        body: status.canonical_reason().unwrap_or_default().to_string(),
    }
}

pub(crate) fn sample_status() -> DownloaderStatus {
    DownloaderStatus {
        status_text: "Downloading".into(),
        album: "Trip".into(),
        num_photos: 50,
        num_photos_fetched: 10,
        cache_use_percent: 42.0,
    }
}

impl FakeTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                phase: SessionPhase::NotLoggedIn,
                login_reply: SessionPhase::LoggedIn,
                choose_reply: SessionPhase::WaitingForMfaCode,
                code_reply: SessionPhase::LoggedIn,
                devices: Vec::new(),
                status: sample_status(),
                gallery: Vec::new(),
                fail_status: false,
                fail_next_login: false,
                poll_failure: None,
                delete_not_found: false,
                hold_commands: false,
                auth_delay: Duration::ZERO,
                poll_delay: Duration::ZERO,
                logins: Vec::new(),
                chosen: Vec::new(),
                codes: Vec::new(),
                device_list_calls: 0,
                poll_started_at: Vec::new(),
                polls_in_flight: 0,
                max_polls_in_flight: 0,
                screen_commands: Vec::new(),
                deleted: Vec::new(),
            }),
            command_gate: Semaphore::new(0),
        })
    }

    pub(crate) fn set_phase(&self, phase: SessionPhase) {
        self.state.lock().phase = phase;
    }

    pub(crate) fn script_login(&self, reply: SessionPhase) {
        self.state.lock().login_reply = reply;
    }

    pub(crate) fn script_choose(&self, reply: SessionPhase) {
        self.state.lock().choose_reply = reply;
    }

    pub(crate) fn script_code(&self, reply: SessionPhase) {
        self.state.lock().code_reply = reply;
    }

    pub(crate) fn set_devices(&self, ids: &[&str]) {
        self.state.lock().devices = ids
            .iter()
            .map(|id| MfaDevice {
                device_id: DeviceId::from(*id),
                device_type: "SMS".into(),
                phone_number: format!("***-{id}"),
            })
            .collect();
    }

    pub(crate) fn set_status(&self, status: DownloaderStatus) {
        self.state.lock().status = status;
    }

    pub(crate) fn set_gallery(&self, paths: &[&str]) {
        self.state.lock().gallery = paths.iter().map(|path| GalleryEntry::new(*path)).collect();
    }

    pub(crate) fn fail_status(&self) {
        self.state.lock().fail_status = true;
    }

    pub(crate) fn fail_next_login(&self) {
        self.state.lock().fail_next_login = true;
    }

    /// Fail every poll with `status` until called with `None`.
    pub(crate) fn fail_polls(&self, status: Option<StatusCode>) {
        self.state.lock().poll_failure = status;
    }

    pub(crate) fn delete_not_found(&self) {
        self.state.lock().delete_not_found = true;
    }

    pub(crate) fn set_auth_delay(&self, delay: Duration) {
        self.state.lock().auth_delay = delay;
    }

    pub(crate) fn set_poll_delay(&self, delay: Duration) {
        self.state.lock().poll_delay = delay;
    }

    /// Screen and delete requests wait for [`FakeTransport::release_command`].
    pub(crate) fn hold_commands(&self) {
        self.state.lock().hold_commands = true;
    }

    pub(crate) fn release_command(&self) {
        self.command_gate.add_permits(1);
    }

    pub(crate) fn logins(&self) -> Vec<(String, String)> {
        self.state.lock().logins.clone()
    }

    pub(crate) fn chosen_devices(&self) -> Vec<String> {
        self.state.lock().chosen.clone()
    }

    pub(crate) fn codes(&self) -> Vec<String> {
        self.state.lock().codes.clone()
    }

    pub(crate) fn device_list_calls(&self) -> usize {
        self.state.lock().device_list_calls
    }

    /// Milliseconds from `origin` at which each poll's status fetch began.
    pub(crate) fn poll_offsets_ms(&self, origin: Instant) -> Vec<u128> {
        self.state
            .lock()
            .poll_started_at
            .iter()
            .map(|at| at.duration_since(origin).as_millis())
            .collect()
    }

    pub(crate) fn max_polls_in_flight(&self) -> usize {
        self.state.lock().max_polls_in_flight
    }

    pub(crate) fn screen_commands(&self) -> Vec<ScreenPower> {
        self.state.lock().screen_commands.clone()
    }

    pub(crate) fn deleted(&self) -> Vec<String> {
        self.state.lock().deleted.clone()
    }

    async fn auth_pause(&self) {
        let delay = self.state.lock().auth_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    async fn command_pause(&self) {
        let hold = self.state.lock().hold_commands;
        if hold {
            if let Ok(permit) = self.command_gate.acquire().await {
                permit.forget();
            }
        }
    }
}

#[async_trait]
impl StatusTransport for FakeTransport {
    async fn session_status(&self) -> Result<SessionPhase, TransportError> {
        let state = self.state.lock();
        if state.fail_status {
            return Err(server_error(StatusCode::BAD_GATEWAY));
        }
        Ok(state.phase)
    }

    async fn login(&self, user_name: &str, password: &str) -> Result<SessionPhase, TransportError> {
        self.auth_pause().await;
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_login) {
            return Err(server_error(StatusCode::INTERNAL_SERVER_ERROR));
        }
        state.logins.push((user_name.to_string(), password.to_string()));
        state.phase = state.login_reply;
        Ok(state.phase)
    }

    async fn mfa_devices(&self) -> Result<Vec<MfaDevice>, TransportError> {
        let mut state = self.state.lock();
        state.device_list_calls += 1;
        Ok(state.devices.clone())
    }

    async fn choose_mfa_device(&self, device: &DeviceId) -> Result<SessionPhase, TransportError> {
        self.auth_pause().await;
        let mut state = self.state.lock();
        state.chosen.push(device.to_string());
        state.phase = state.choose_reply;
        Ok(state.phase)
    }

    async fn submit_mfa_code(&self, code: &str) -> Result<SessionPhase, TransportError> {
        self.auth_pause().await;
        let mut state = self.state.lock();
        state.codes.push(code.to_string());
        state.phase = state.code_reply;
        Ok(state.phase)
    }

    async fn downloader_status(&self) -> Result<DownloaderStatus, TransportError> {
        let delay = {
            let mut state = self.state.lock();
            state.poll_started_at.push(Instant::now());
            state.polls_in_flight += 1;
            state.max_polls_in_flight = state.max_polls_in_flight.max(state.polls_in_flight);
            state.poll_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock();
        state.polls_in_flight -= 1;
        if let Some(status) = state.poll_failure {
            return Err(server_error(status));
        }
        Ok(state.status.clone())
    }

    async fn displayed_list(&self) -> Result<Vec<GalleryEntry>, TransportError> {
        Ok(self.state.lock().gallery.clone())
    }

    async fn screen_control(&self, power: ScreenPower) -> Result<(), TransportError> {
        self.command_pause().await;
        self.state.lock().screen_commands.push(power);
        Ok(())
    }

    async fn delete_photo(&self, photo: &str) -> Result<(), TransportError> {
        self.command_pause().await;
        let mut state = self.state.lock();
        if state.delete_not_found {
            return Err(server_error(StatusCode::NOT_FOUND));
        }
        state.deleted.push(photo.to_string());
        Ok(())
    }
}
