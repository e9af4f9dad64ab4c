//! Authentication phase tracking.
//!
//! The phase only ever changes to a value the backend returned. Every change
//! goes through [`transition`], so the full table can be reviewed and tested
//! without a transport or a screen.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{SessionError, TransportError};
use crate::model::{MfaDevice, SessionPhase};
use crate::transport::StatusTransport;

/// Authentication request that can move the session to a new phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOp {
    QueryInitial,
    /// Re-read the phase from the backend in any phase.
    Refresh,
    Login,
    ListDevices,
    ChooseDevice,
    SubmitCode,
}

impl AuthOp {
    /// Phase the session must be in before the request is sent.
    pub fn required_phase(self) -> Option<SessionPhase> {
        match self {
            AuthOp::QueryInitial => Some(SessionPhase::Querying),
            AuthOp::Refresh => None,
            AuthOp::Login => Some(SessionPhase::NotLoggedIn),
            AuthOp::ListDevices | AuthOp::ChooseDevice => Some(SessionPhase::NeedToSendMfaCode),
            AuthOp::SubmitCode => Some(SessionPhase::WaitingForMfaCode),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The backend answered `op` with `phase`.
    Resolved { op: AuthOp, phase: SessionPhase },
    /// `op` failed before the backend asserted a phase.
    Failed { op: AuthOp },
}

/// Next phase for `event` observed in `current`.
pub fn transition(current: SessionPhase, event: SessionEvent) -> SessionPhase {
    use SessionPhase::*;

    match (current, event) {
        (_, SessionEvent::Resolved { phase, .. }) => phase,
        (
            Querying | NotLoggedIn | NeedToSendMfaCode | WaitingForMfaCode | LoggedIn,
            SessionEvent::Failed { .. },
        ) => current,
    }
}

pub struct SessionStateMachine {
    transport: Arc<dyn StatusTransport>,
    phase: SessionPhase,
    devices: Vec<MfaDevice>,
    pending: Option<AuthOp>,
}

impl SessionStateMachine {
    pub fn new(transport: Arc<dyn StatusTransport>) -> Self {
        Self {
            transport,
            phase: SessionPhase::Querying,
            devices: Vec::new(),
            pending: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Operation whose request was sent but never resolved. Set when a caller
    /// dropped the future mid-request; cleared by the next resolution.
    pub fn pending(&self) -> Option<AuthOp> {
        self.pending
    }

    /// Devices from the last successful listing in the current phase.
    pub fn devices(&self) -> &[MfaDevice] {
        &self.devices
    }

    pub async fn query_initial(&mut self) -> Result<SessionPhase, SessionError> {
        self.begin(AuthOp::QueryInitial)?;
        let outcome = self.transport.session_status().await;
        self.resolve(AuthOp::QueryInitial, outcome)
    }

    /// Ask the backend for the current phase without any precondition. Used
    /// when a logged-in request is refused and the session may have expired.
    pub async fn refresh(&mut self) -> Result<SessionPhase, SessionError> {
        self.begin(AuthOp::Refresh)?;
        let outcome = self.transport.session_status().await;
        self.resolve(AuthOp::Refresh, outcome)
    }

    pub async fn login(&mut self, user_name: &str, password: &str) -> Result<SessionPhase, SessionError> {
        if user_name.is_empty() {
            return Err(SessionError::EmptyField("user name"));
        }
        if password.is_empty() {
            return Err(SessionError::EmptyField("password"));
        }
        self.begin(AuthOp::Login)?;
        info!(target: "frame::session", user = %user_name, "logging in");
        let outcome = self.transport.login(user_name, password).await;
        self.resolve(AuthOp::Login, outcome)
    }

    pub async fn list_mfa_devices(&mut self) -> Result<&[MfaDevice], SessionError> {
        self.begin(AuthOp::ListDevices)?;
        let outcome = self.transport.mfa_devices().await;
        self.pending = None;
        match outcome {
            Ok(devices) => {
                debug!(target: "frame::session", count = devices.len(), "mfa devices listed");
                self.devices = devices;
                Ok(&self.devices)
            }
            Err(err) => {
                warn!(target: "frame::session", error = %err, kind = err.kind(), "listing mfa devices failed");
                Err(err.into())
            }
        }
    }

    pub async fn choose_mfa_device(&mut self, device_id: &str) -> Result<SessionPhase, SessionError> {
        if device_id.is_empty() {
            return Err(SessionError::EmptyField("device id"));
        }
        self.require(AuthOp::ChooseDevice)?;
        let device = self
            .devices
            .iter()
            .find(|device| device.device_id.matches(device_id))
            .map(|device| device.device_id.clone())
            .ok_or_else(|| SessionError::UnknownDevice(device_id.to_string()))?;
        info!(target: "frame::session", device = %device, "requesting mfa code");
        self.pending = Some(AuthOp::ChooseDevice);
        let outcome = self.transport.choose_mfa_device(&device).await;
        self.resolve(AuthOp::ChooseDevice, outcome)
    }

    pub async fn submit_mfa_code(&mut self, code: &str) -> Result<SessionPhase, SessionError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(SessionError::EmptyField("code"));
        }
        self.begin(AuthOp::SubmitCode)?;
        let outcome = self.transport.submit_mfa_code(code).await;
        self.resolve(AuthOp::SubmitCode, outcome)
    }

    fn begin(&mut self, op: AuthOp) -> Result<(), SessionError> {
        self.require(op)?;
        self.pending = Some(op);
        Ok(())
    }

    fn require(&self, op: AuthOp) -> Result<(), SessionError> {
        match op.required_phase() {
            Some(expected) if expected != self.phase => Err(SessionError::WrongPhase {
                expected,
                actual: self.phase,
            }),
            _ => Ok(()),
        }
    }

    fn resolve(
        &mut self,
        op: AuthOp,
        outcome: Result<SessionPhase, TransportError>,
    ) -> Result<SessionPhase, SessionError> {
        self.pending = None;
        match outcome {
            Ok(asserted) => {
                let next = transition(self.phase, SessionEvent::Resolved { op, phase: asserted });
                if next != self.phase {
                    info!(target: "frame::session", from = %self.phase, to = %next, ?op, "phase changed");
                }
                if next != SessionPhase::NeedToSendMfaCode {
                    self.devices.clear();
                }
                self.phase = next;
                Ok(next)
            }
            Err(err) => {
                self.phase = transition(self.phase, SessionEvent::Failed { op });
                warn!(
                    target: "frame::session",
                    error = %err,
                    kind = err.kind(),
                    ?op,
                    phase = %self.phase,
                    "authentication request failed"
                );
                Err(err.into())
            }
        }
    }
}
