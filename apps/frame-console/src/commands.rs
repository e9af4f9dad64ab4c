//! One-shot subcommands. These reuse an already established backend session
//! and never prompt.

use std::sync::Arc;

use frame_client::poller::poll_once;
use frame_client::view;
use frame_client::{
    ClientConfig, CommandDispatcher, DeleteOutcome, HttpStatusTransport, InFlightFlags, ScreenPower,
    SessionPhase, SessionStateMachine, ViewState,
};
use tracing::info;

use crate::console;
use crate::error::CliError;

async fn connect(config: &ClientConfig) -> Result<(Arc<HttpStatusTransport>, SessionPhase), CliError> {
    let transport = Arc::new(HttpStatusTransport::new(config)?);
    let mut session = SessionStateMachine::new(transport.clone());
    let phase = session.query_initial().await?;
    info!(target: "frame::session", %phase, server = %config.server, "session queried");
    Ok((transport, phase))
}

async fn logged_in(config: &ClientConfig) -> Result<Arc<HttpStatusTransport>, CliError> {
    match connect(config).await? {
        (transport, SessionPhase::LoggedIn) => Ok(transport),
        (_, phase) => Err(CliError::NotLoggedIn(phase)),
    }
}

pub async fn status(config: &ClientConfig) -> Result<(), CliError> {
    let (transport, phase) = connect(config).await?;
    println!("Session: {phase}");
    if phase != SessionPhase::LoggedIn {
        return Ok(());
    }

    let snapshot = poll_once(transport.as_ref()).await?;
    let state = ViewState::default().with_snapshot(snapshot);
    let projection = view::project(phase, &state, &[], InFlightFlags::default(), false);
    print!("{}", console::render(&projection, transport.base()));
    Ok(())
}

pub async fn screen(config: &ClientConfig, power: ScreenPower) -> Result<(), CliError> {
    let transport = logged_in(config).await?;
    let dispatcher = CommandDispatcher::new(transport);
    dispatcher.arm();
    dispatcher.set_screen_power(power).await?;
    println!("✅ screen {power}");
    Ok(())
}

pub async fn delete(config: &ClientConfig, path: &str) -> Result<(), CliError> {
    let transport = logged_in(config).await?;
    let snapshot = poll_once(transport.as_ref()).await?;
    let dispatcher = CommandDispatcher::new(transport);
    dispatcher.arm();
    match dispatcher.delete_photo(&snapshot.gallery, path).await? {
        DeleteOutcome::Deleted => println!("✅ deleted {path}"),
        DeleteOutcome::AlreadyDeleted => println!("✅ {path} was already deleted"),
    }
    Ok(())
}
