//! Dashboard state: today's events and the clock they are judged against.
//!
//! Delivered event lists replace the previous one wholesale. The clock is
//! refreshed every [`CLOCK_REFRESH`] by a [`ScopedInterval`], and each
//! change publishes a fresh [`DashboardView`].

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dayfocus_core::{Agenda, CalendarEvent};
use tokio::sync::watch;
use tracing::debug;

use crate::sync::EventsCallback;
use crate::timer::ScopedInterval;

/// How often the current time is re-read.
pub const CLOCK_REFRESH: Duration = Duration::from_secs(60);

/// What the dashboard shows at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub now: DateTime<Utc>,
    pub current: Option<CalendarEvent>,
    pub next: Option<CalendarEvent>,
    /// Elapsed share of the current event, between 0 and 1.
    pub progress: Option<f64>,
    pub events: Vec<CalendarEvent>,
}

/// Events plus the clock reading they are evaluated at.
#[derive(Debug, Clone)]
pub struct Dashboard {
    agenda: Agenda,
    now: DateTime<Utc>,
}

impl Dashboard {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            agenda: Agenda::default(),
            now,
        }
    }

    pub fn replace_events(&mut self, events: Vec<CalendarEvent>) {
        self.agenda = Agenda::new(events);
    }

    pub fn set_now(&mut self, now: DateTime<Utc>) {
        self.now = now;
    }

    pub fn view(&self) -> DashboardView {
        let current = self.agenda.current(self.now).cloned();
        DashboardView {
            now: self.now,
            progress: current.as_ref().and_then(|e| progress(e, self.now)),
            next: self.agenda.next(self.now).cloned(),
            current,
            events: self.agenda.events().to_vec(),
        }
    }
}

/// Elapsed share of `event` at `now`, clamped to `0..=1`.
pub fn progress(event: &CalendarEvent, now: DateTime<Utc>) -> Option<f64> {
    let start = event.starts_at()?;
    let end = event.ends_at()?;
    let total = (end - start).num_seconds();
    if total <= 0 {
        return None;
    }
    let elapsed = (now - start).num_seconds();
    Some((elapsed as f64 / total as f64).clamp(0.0, 1.0))
}

/// A dashboard shared between the sync callback and the clock.
#[derive(Debug, Clone)]
pub struct LiveDashboard {
    state: Arc<Mutex<Dashboard>>,
    views: Arc<watch::Sender<DashboardView>>,
}

impl LiveDashboard {
    pub fn new(now: DateTime<Utc>) -> Self {
        let dashboard = Dashboard::new(now);
        let (views, _) = watch::channel(dashboard.view());
        Self {
            state: Arc::new(Mutex::new(dashboard)),
            views: Arc::new(views),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardView> {
        self.views.subscribe()
    }

    pub fn view(&self) -> DashboardView {
        self.views.borrow().clone()
    }

    /// A sync callback that replaces the event list.
    pub fn events_callback(&self) -> EventsCallback {
        let live = self.clone();
        Box::new(move |events| {
            debug!(count = events.len(), "dashboard events replaced");
            live.update(|dashboard| dashboard.replace_events(events));
        })
    }

    pub fn set_now(&self, now: DateTime<Utc>) {
        self.update(|dashboard| dashboard.set_now(now));
    }

    /// Re-reads the wall clock every `period` until the handle is dropped.
    pub fn start_clock(&self, period: Duration) -> ScopedInterval {
        let live = self.clone();
        ScopedInterval::spawn(period, move || live.set_now(Utc::now()))
    }

    fn update(&self, change: impl FnOnce(&mut Dashboard)) {
        let mut dashboard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        change(&mut dashboard);
        self.views.send_replace(dashboard.view());
    }
}
