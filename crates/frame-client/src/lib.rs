//! Client core for the photo frame backend.
//!
//! Responsibilities:
//! - driving the operator through login and the MFA handshake, one server-asserted phase at a time
//! - polling downloader progress and the displayed photo list while the session is logged in
//! - dispatching screen power and photo deletion commands with one request in flight per class
//! - projecting session phase and the latest poll snapshot into renderable screens

pub mod app;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod model;
pub mod poller;
pub mod session;
pub mod state;
pub mod transport;
pub mod view;

#[cfg(test)]
mod test_support;

pub use app::{AppEvent, CommandAck, CommandCompletion, FrameApp};
pub use config::{ClientConfig, ConfigError};
pub use dispatcher::{CommandDispatcher, DeleteOutcome};
pub use error::{CommandError, SessionError, TransportError};
pub use model::{
    CommandClass, DeviceId, DownloaderStatus, GalleryEntry, InFlightFlags, MfaDevice, PollSnapshot,
    ScreenPower, SessionPhase,
};
pub use poller::{PollUpdate, StatusPoller};
pub use session::{AuthOp, SessionEvent, SessionStateMachine};
pub use state::ViewState;
pub use transport::{HttpStatusTransport, StatusTransport};
pub use view::{Projection, Screen, ScreenKind};
