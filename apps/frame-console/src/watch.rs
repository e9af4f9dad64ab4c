//! Interactive console: walks the operator through login, then follows the
//! status screen until they quit.

use crossterm::cursor::MoveTo;
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use frame_client::{ClientConfig, FrameApp, MfaDevice, ScreenPower, SessionPhase};
use std::io::{self, IsTerminal, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;
use url::Url;

use crate::console;
use crate::error::CliError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum StatusCommand {
    Screen(ScreenPower),
    Remove(String),
    Quit,
    Empty,
}

enum Exit {
    Quit,
    SessionEnded,
}

struct Input<R> {
    lines: Lines<R>,
}

impl Input<BufReader<Stdin>> {
    fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> Input<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.lines.next_line().await
    }

    async fn prompt(&mut self, label: &str) -> Result<String, CliError> {
        let mut stdout = io::stdout();
        write!(stdout, "{label}")?;
        stdout.flush()?;
        self.next_line()
            .await?
            .map(|line| line.trim().to_string())
            .ok_or(CliError::InputClosed)
    }
}

async fn read_password(label: &'static str) -> Result<String, CliError> {
    tokio::task::spawn_blocking(move || rpassword::prompt_password(label))
        .await
        .map_err(io::Error::other)?
        .map_err(CliError::from)
}

pub async fn run(config: ClientConfig) -> Result<(), CliError> {
    let base = config.server.clone();
    let mut app = FrameApp::from_config(&config)?;
    let mut input = Input::stdin();

    draw(&app, &base)?;
    while let Err(err) = app.query_initial().await {
        println!("❌ {err}");
        let answer = input.prompt("Retry? [Y/n] ").await?;
        if answer.eq_ignore_ascii_case("n") {
            return Err(err.into());
        }
    }

    loop {
        authenticate(&mut app, &mut input, &base).await?;
        match follow_status(&mut app, &mut input, &base).await? {
            Exit::Quit => break,
            Exit::SessionEnded => debug!(target: "frame::session", "session ended, returning to login"),
        }
    }

    app.shutdown();
    Ok(())
}

async fn authenticate<R: AsyncBufRead + Unpin>(
    app: &mut FrameApp,
    input: &mut Input<R>,
    base: &Url,
) -> Result<(), CliError> {
    loop {
        draw(app, base)?;
        // Failures land in the projection notice and are shown on the next draw.
        let _ = match app.phase() {
            SessionPhase::LoggedIn => return Ok(()),
            SessionPhase::Querying => {
                input.prompt("Press enter to re-check the session ").await?;
                app.refresh_session().await
            }
            SessionPhase::NotLoggedIn => {
                let user = input.prompt("User name: ").await?;
                let password = read_password("Password: ").await?;
                app.login(&user, &password).await
            }
            SessionPhase::NeedToSendMfaCode => {
                if app.list_mfa_devices().await.is_err() {
                    draw(app, base)?;
                    input.prompt("Press enter to retry ").await?;
                    continue;
                }
                draw(app, base)?;
                let choice = input.prompt("Device number: ").await?;
                let device_id = pick_device(&choice, app.devices());
                app.choose_mfa_device(&device_id).await
            }
            SessionPhase::WaitingForMfaCode => {
                let code = input.prompt("Code: ").await?;
                app.submit_mfa_code(&code).await
            }
        };
    }
}

async fn follow_status<R: AsyncBufRead + Unpin>(
    app: &mut FrameApp,
    input: &mut Input<R>,
    base: &Url,
) -> Result<Exit, CliError> {
    draw(app, base)?;
    loop {
        tokio::select! {
            event = app.next_event() => {
                let Some(event) = event else {
                    return Ok(Exit::Quit);
                };
                app.handle_event(event).await;
            }
            line = input.next_line() => {
                let Some(line) = line? else {
                    return Ok(Exit::Quit);
                };
                // Rejected requests are reported through the projection notice.
                match parse_command(&line) {
                    Ok(StatusCommand::Quit) => return Ok(Exit::Quit),
                    Ok(StatusCommand::Screen(power)) => {
                        let _ = app.request_screen_power(power);
                    }
                    Ok(StatusCommand::Remove(path)) => {
                        let _ = app.request_delete(&path);
                    }
                    Ok(StatusCommand::Empty) => {}
                    Err(message) => app.set_notice(message),
                }
            }
        }

        if app.phase() != SessionPhase::LoggedIn {
            return Ok(Exit::SessionEnded);
        }
        draw(app, base)?;
    }
}

fn draw(app: &FrameApp, base: &Url) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    if stdout.is_terminal() {
        execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
    }
    write!(stdout, "{}", console::render(&app.projection(), base))?;
    stdout.flush()?;
    Ok(())
}

fn parse_command(line: &str) -> Result<StatusCommand, String> {
    let mut parts = line.split_whitespace();
    let command = match parts.next() {
        None => return Ok(StatusCommand::Empty),
        Some("on") => StatusCommand::Screen(ScreenPower::On),
        Some("off") => StatusCommand::Screen(ScreenPower::Off),
        Some("q" | "quit") => StatusCommand::Quit,
        Some("rm") => {
            let path = parts.next().ok_or_else(|| "usage: rm <path>".to_string())?;
            StatusCommand::Remove(path.to_string())
        }
        Some(other) => return Err(format!("unknown command '{other}'; {}", console::STATUS_HELP)),
    };
    match parts.next() {
        Some(extra) => Err(format!("unexpected argument '{extra}'")),
        None => Ok(command),
    }
}

/// Accept either a 1-based index into `devices` or a device id.
fn pick_device(choice: &str, devices: &[MfaDevice]) -> String {
    choice
        .parse::<usize>()
        .ok()
        .and_then(|index| index.checked_sub(1))
        .and_then(|index| devices.get(index))
        .map(|device| device.device_id.to_string())
        .unwrap_or_else(|| choice.to_string())
}
