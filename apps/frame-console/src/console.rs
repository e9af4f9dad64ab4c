//! Plain-text rendering of screen descriptors.

use frame_client::view::{DeviceOption, StatusScreen};
use frame_client::{Projection, Screen};
use std::fmt::Write as _;
use url::Url;

pub const STATUS_HELP: &str = "commands: on | off | rm <path> | q";

pub fn render(projection: &Projection, base: &Url) -> String {
    let mut out = String::new();
    match &projection.screen {
        Screen::Spinner => out.push_str("⏳ Checking session...\n"),
        Screen::Login => out.push_str("🔐 Log in to the photo frame\n"),
        Screen::DeviceChoice { devices } => render_devices(&mut out, devices),
        Screen::CodeEntry => out.push_str("📨 Enter the code sent to your device\n"),
        Screen::Status(status) => render_status(&mut out, status, base),
    }
    if projection.busy {
        out.push_str("⏳ Waiting for the server...\n");
    }
    if let Some(notice) = &projection.notice {
        let _ = writeln!(out, "⚠️  {notice}");
    }
    out
}

fn render_devices(out: &mut String, devices: &[DeviceOption]) {
    out.push_str("📱 Choose where to send the verification code\n");
    if devices.is_empty() {
        out.push_str("   (no devices offered)\n");
    }
    for (index, device) in devices.iter().enumerate() {
        let _ = writeln!(out, "   [{}] {}", index + 1, device.label);
    }
}

fn render_status(out: &mut String, status: &StatusScreen, base: &Url) {
    match &status.progress {
        Some(progress) => {
            for line in progress.lines() {
                let _ = writeln!(out, "{line}");
            }
        }
        None => out.push_str("Waiting for first status update...\n"),
    }
    if let Some(error) = &status.poll_error {
        let _ = writeln!(out, "❌ last update failed: {error}");
    }

    out.push('\n');
    let _ = writeln!(
        out,
        "Screen: {}",
        if status.screen_controls_enabled {
            "[on] [off]"
        } else {
            "(command in flight)"
        }
    );

    let _ = writeln!(out, "Photos ({}):", status.gallery.len());
    for item in &status.gallery {
        let media = base
            .join(item.media_path.trim_start_matches('/'))
            .map(|url| url.to_string())
            .unwrap_or_else(|_| item.media_path.clone());
        let marker = if status.delete_enabled { "rm" } else { "--" };
        let _ = writeln!(out, "  {marker} {}  {media}", item.path);
    }
    let _ = writeln!(out, "{STATUS_HELP}");
}
