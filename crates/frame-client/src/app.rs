//! Controller tying the session phase to the poller and dispatcher lifecycle.
//!
//! `FrameApp` is the only owner of the [`ViewState`]. Background work (poll
//! ticks, command requests) reports back over channels and is applied here,
//! one event at a time, through [`FrameApp::handle_event`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::dispatcher::{CommandDispatcher, DeleteOutcome};
use crate::error::{CommandError, SessionError, TransportError};
use crate::model::{CommandClass, MfaDevice, ScreenPower, SessionPhase};
use crate::poller::{PollUpdate, StatusPoller};
use crate::session::SessionStateMachine;
use crate::state::ViewState;
use crate::transport::{HttpStatusTransport, StatusTransport};
use crate::view::{self, Projection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAck {
    ScreenPower(ScreenPower),
    Delete { path: String, outcome: DeleteOutcome },
}

#[derive(Debug)]
pub struct CommandCompletion {
    /// Poller generation the command was issued under.
    pub generation: u64,
    pub class: CommandClass,
    pub result: Result<CommandAck, CommandError>,
}

#[derive(Debug)]
pub enum AppEvent {
    Poll(PollUpdate),
    Command(CommandCompletion),
}

pub struct FrameApp {
    session: SessionStateMachine,
    poller: StatusPoller,
    dispatcher: CommandDispatcher,
    view: ViewState,
    poll_rx: mpsc::UnboundedReceiver<PollUpdate>,
    command_tx: mpsc::UnboundedSender<CommandCompletion>,
    command_rx: mpsc::UnboundedReceiver<CommandCompletion>,
}

impl FrameApp {
    pub fn new(transport: Arc<dyn StatusTransport>, poll_interval: Duration) -> Self {
        let (poll_tx, poll_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        Self {
            session: SessionStateMachine::new(Arc::clone(&transport)),
            poller: StatusPoller::new(Arc::clone(&transport), poll_interval, poll_tx),
            dispatcher: CommandDispatcher::new(transport),
            view: ViewState::default(),
            poll_rx,
            command_tx,
            command_rx,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        let transport = HttpStatusTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), config.poll_interval))
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    pub fn devices(&self) -> &[MfaDevice] {
        self.session.devices()
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    pub fn projection(&self) -> Projection {
        view::project(
            self.session.phase(),
            &self.view,
            self.session.devices(),
            self.dispatcher.in_flight(),
            self.session.pending().is_some(),
        )
    }

    pub async fn query_initial(&mut self) -> Result<SessionPhase, SessionError> {
        let result = self.session.query_initial().await;
        self.after_auth(result)
    }

    pub async fn refresh_session(&mut self) -> Result<SessionPhase, SessionError> {
        let result = self.session.refresh().await;
        self.after_auth(result)
    }

    pub async fn login(&mut self, user_name: &str, password: &str) -> Result<SessionPhase, SessionError> {
        let result = self.session.login(user_name, password).await;
        self.after_auth(result)
    }

    pub async fn list_mfa_devices(&mut self) -> Result<&[MfaDevice], SessionError> {
        if let Err(err) = self.session.list_mfa_devices().await {
            self.view = self.view.with_notice(err.to_string());
            return Err(err);
        }
        Ok(self.session.devices())
    }

    pub async fn choose_mfa_device(&mut self, device_id: &str) -> Result<SessionPhase, SessionError> {
        let result = self.session.choose_mfa_device(device_id).await;
        self.after_auth(result)
    }

    pub async fn submit_mfa_code(&mut self, code: &str) -> Result<SessionPhase, SessionError> {
        let result = self.session.submit_mfa_code(code).await;
        self.after_auth(result)
    }

    fn after_auth(
        &mut self,
        result: Result<SessionPhase, SessionError>,
    ) -> Result<SessionPhase, SessionError> {
        self.view = match &result {
            Ok(_) => self.view.without_notice(),
            Err(err) => self.view.with_notice(err.to_string()),
        };
        self.sync_lifecycle();
        result
    }

    /// Start or stop background work so it runs exactly while logged in.
    fn sync_lifecycle(&mut self) {
        let logged_in = self.session.phase() == SessionPhase::LoggedIn;
        let active = self.poller.generation().is_some();

        if logged_in && !active {
            self.view = ViewState::default();
            self.dispatcher.arm();
            let generation = self.poller.start();
            info!(target: "frame::session", generation, "session active");
        } else if !logged_in && active {
            self.poller.stop();
            self.dispatcher.disarm();
            self.view = ViewState {
                notice: self.view.notice.clone(),
                ..ViewState::default()
            };
            info!(target: "frame::session", phase = %self.session.phase(), "session inactive");
        }
    }

    pub fn request_screen_power(&mut self, power: ScreenPower) -> Result<(), CommandError> {
        let request = match self.dispatcher.begin_screen_power(power) {
            Ok(request) => request,
            Err(err) => return Err(self.reject(err)),
        };
        let completions = self.command_tx.clone();
        let generation = self.active_generation();
        tokio::spawn(async move {
            let result = request.await.map(|()| CommandAck::ScreenPower(power));
            let _ = completions.send(CommandCompletion {
                generation,
                class: CommandClass::ScreenControl,
                result,
            });
        });
        Ok(())
    }

    /// Delete a photo listed by the latest successful poll.
    pub fn request_delete(&mut self, path: &str) -> Result<(), CommandError> {
        let gallery = self
            .view
            .snapshot
            .as_ref()
            .map(|snapshot| snapshot.gallery.as_slice())
            .unwrap_or_default();
        let request = match self.dispatcher.begin_delete(gallery, path) {
            Ok(request) => request,
            Err(err) => return Err(self.reject(err)),
        };
        let completions = self.command_tx.clone();
        let generation = self.active_generation();
        let path = path.to_string();
        tokio::spawn(async move {
            let result = request
                .await
                .map(|outcome| CommandAck::Delete { path, outcome });
            let _ = completions.send(CommandCompletion {
                generation,
                class: CommandClass::DeletePhoto,
                result,
            });
        });
        Ok(())
    }

    /// Generation of the current logged-in period; 0 when none is active.
    fn active_generation(&self) -> u64 {
        self.poller.generation().unwrap_or_default()
    }

    /// Show an operator-facing message until the next successful action.
    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.view = self.view.with_notice(notice);
    }

    fn reject(&mut self, err: CommandError) -> CommandError {
        debug!(target: "frame::command", error = %err, "command rejected");
        self.view = self.view.with_notice(err.to_string());
        err
    }

    /// Wait for the next poll tick or command completion.
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        tokio::select! {
            Some(update) = self.poll_rx.recv() => Some(AppEvent::Poll(update)),
            Some(completion) = self.command_rx.recv() => Some(AppEvent::Command(completion)),
            else => None,
        }
    }

    pub async fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Poll(update) => self.apply_poll_update(update).await,
            AppEvent::Command(completion) => self.apply_command_completion(completion),
        }
    }

    async fn apply_poll_update(&mut self, update: PollUpdate) {
        if self.session.phase() != SessionPhase::LoggedIn
            || self.poller.generation() != Some(update.generation)
        {
            debug!(target: "frame::poller", generation = update.generation, "stale poll result discarded");
            return;
        }

        match update.result {
            Ok(snapshot) => {
                self.dispatcher.reconcile(&snapshot.gallery);
                self.view = self.view.with_snapshot(snapshot);
            }
            Err(err) => {
                self.view = self.view.with_poll_failure(&err);
                if err.is_unauthorized() {
                    warn!(target: "frame::session", error = %err, "poll refused, re-checking session");
                    // Failure is already recorded as a notice by `after_auth`.
                    let _ = self.refresh_session().await;
                }
            }
        }
    }

    fn apply_command_completion(&mut self, completion: CommandCompletion) {
        if self.session.phase() != SessionPhase::LoggedIn
            || self.poller.generation() != Some(completion.generation)
        {
            debug!(
                target: "frame::command",
                class = %completion.class,
                generation = completion.generation,
                "command result from an ended session discarded"
            );
            return;
        }
        match completion.result {
            Ok(ack) => {
                debug!(target: "frame::command", ?ack, "command acknowledged");
                self.view = self.view.without_notice();
            }
            Err(err) => {
                self.view = self
                    .view
                    .with_notice(format!("{} failed: {err}", completion.class));
            }
        }
    }

    /// Stop background work. Outstanding command results are ignored.
    pub fn shutdown(&mut self) {
        self.poller.stop();
        self.dispatcher.disarm();
    }
}

impl Drop for FrameApp {
    fn drop(&mut self) {
        self.shutdown();
    }
}
