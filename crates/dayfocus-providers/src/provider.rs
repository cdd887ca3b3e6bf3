//! CalendarProvider trait definition.
//!
//! A provider adapter turns an access token into the canonical event list
//! for a time window. The trait boundary sits after normalization: whatever
//! the upstream schema looks like, callers only ever see
//! [`CalendarEvent`]s.

use std::future::Future;
use std::pin::Pin;

use chrono::{Local, Utc};
use dayfocus_core::{CalendarEvent, Provider, TimeWindow};

use crate::error::ProviderResult;

/// A boxed future for async trait methods.
///
/// Boxing keeps the trait object-safe so the server can hold a
/// `dyn CalendarProvider` per provider.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The core abstraction for calendar providers.
///
/// Implementations perform no token refresh: an expired token surfaces as
/// an authentication error and the caller decides what to do.
pub trait CalendarProvider: Send + Sync {
    /// Which provider this adapter talks to.
    fn provider(&self) -> Provider;

    /// Lists the events of the primary calendar inside `window`, ordered by
    /// start time, with recurring events expanded into single occurrences.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`](crate::ProviderError) on transport
    /// failures, non-success statuses and malformed bodies.
    fn list_events<'a>(
        &'a self,
        access_token: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>>;

    /// Lists the events between now and the end of the local day.
    fn list_today_events<'a>(
        &'a self,
        access_token: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>> {
        let window = TimeWindow::today_remaining(Utc::now(), &Local);
        self.list_events(access_token, window)
    }
}
