//! `now` and `today`: show the day's events.

use std::io::Write;

use chrono::{DateTime, Local, TimeZone, Utc};
use dayfocus_core::CalendarEvent;
use tracing::debug;

use crate::config::ClientConfig;
use crate::dashboard::{CLOCK_REFRESH, DashboardView, LiveDashboard};
use crate::error::{ClientError, ClientResult};
use crate::sync::{SyncController, SyncOutcome};

const NOT_SIGNED_IN: &str =
    "Not signed in. Run `dayfocus connect google` (or microsoft) to connect a calendar.";

/// Start time for display: local `HH:MM`, or "all day".
pub fn format_start<Tz>(event: &CalendarEvent, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    if event.is_all_day {
        return "all day".to_string();
    }
    match event.starts_at() {
        Some(start) => start.with_timezone(tz).format("%H:%M").to_string(),
        None => event.start_time.clone(),
    }
}

/// One line per event: `09:00-09:30  Standup (30 min) @ Room 1`.
pub fn format_event_line<Tz>(event: &CalendarEvent, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut when = format_start(event, tz);
    if !event.is_all_day
        && let Some(end) = event.ends_at()
    {
        when = format!("{}-{}", when, end.with_timezone(tz).format("%H:%M"));
    }

    let mut line = format!("{:<11}  {}", when, event.title);
    if let Some(minutes) = event.duration_minutes().filter(|_| !event.is_all_day) {
        line.push_str(&format!(" ({} min)", minutes));
    }
    if !event.location.is_empty() {
        line.push_str(&format!(" @ {}", event.location));
    }
    line
}

/// Renders the current/next summary.
pub fn render_view<Tz>(view: &DashboardView, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut text = String::new();

    match &view.current {
        Some(event) => {
            text.push_str(&format!("Now:  {}", event.title));
            if let Some(progress) = view.progress {
                text.push_str(&format!(" [{:.0}%]", progress * 100.0));
            }
            text.push('\n');
            if !event.description.is_empty() {
                text.push_str(&format!("      {}\n", event.description));
            }
        }
        None => text.push_str("Now:  nothing scheduled\n"),
    }

    match &view.next {
        Some(event) => text.push_str(&format!("Next: {}\n", format_event_line(event, tz))),
        None => text.push_str("Next: nothing else today\n"),
    }

    text
}

/// Loads today's events. `false` means nobody is signed in.
async fn load(controller: &SyncController) -> ClientResult<bool> {
    match controller.refresh().await? {
        SyncOutcome::Delivered(count) => {
            debug!(count, "events loaded");
            Ok(true)
        }
        SyncOutcome::SignedOut => Ok(false),
        SyncOutcome::Stale | SyncOutcome::Failed => Err(ClientError::Connection(
            "could not load calendar events".to_string(),
        )),
    }
}

/// Prints the current and next event, optionally refreshing every minute.
pub async fn now(config: &ClientConfig, watch: bool, out: &mut impl Write) -> ClientResult<()> {
    let dashboard = LiveDashboard::new(Utc::now());
    let controller = super::controller(config, dashboard.events_callback())?;

    if !load(&controller).await? {
        writeln!(out, "{}", NOT_SIGNED_IN)?;
        return Ok(());
    }
    print_view(&dashboard.view(), out)?;

    if !watch {
        return Ok(());
    }

    let mut views = dashboard.subscribe();
    let _clock = dashboard.start_clock(CLOCK_REFRESH);
    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let view = views.borrow_and_update().clone();
                writeln!(out)?;
                print_view(&view, out)?;
                out.flush()?;
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

/// Prints every event of the day.
pub async fn today(config: &ClientConfig, json: bool, out: &mut impl Write) -> ClientResult<()> {
    let dashboard = LiveDashboard::new(Utc::now());
    let controller = super::controller(config, dashboard.events_callback())?;

    if !load(&controller).await? {
        writeln!(out, "{}", NOT_SIGNED_IN)?;
        return Ok(());
    }

    let events = dashboard.view().events;
    if json {
        let body = serde_json::to_string_pretty(&events)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        writeln!(out, "{}", body)?;
    } else if events.is_empty() {
        writeln!(out, "No events today.")?;
    } else {
        write!(out, "{}", render_list(&events, &Local))?;
    }
    Ok(())
}

fn render_list<Tz>(events: &[CalendarEvent], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    events
        .iter()
        .map(|event| format!("{}\n", format_event_line(event, tz)))
        .collect()
}

/// Formats the local wall clock for headers.
pub fn clock_label(now: DateTime<Utc>) -> String {
    now.with_timezone(&Local).format("%A %H:%M").to_string()
}

fn print_view(view: &DashboardView, out: &mut impl Write) -> ClientResult<()> {
    writeln!(out, "{}", clock_label(view.now))?;
    write!(out, "{}", render_view(view, &Local))?;
    Ok(())
}
