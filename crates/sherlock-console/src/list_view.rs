//! List view: table state plus the fetcher that fills it.
//!
//! `start()` loads once, then refetches on a fixed interval and whenever a
//! navigation to the view's own route completes. Both triggers stop when the
//! view is dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sherlock_common::Result;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

use crate::table::{Row, TableState};
use crate::timer::ScopedTimer;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Source of rows for a list view.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    type Row: Row + Send + Sync + 'static;

    async fn fetch(&self) -> Result<Vec<Self::Row>>;
}

/// Emitted by the router when a navigation finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEnd {
    pub url: String,
}

pub struct ListView<F: Fetcher> {
    state: Arc<Mutex<TableState<F::Row>>>,
    fetcher: Arc<F>,
    interval: Duration,
    route: Option<String>,
    refresh_timer: Option<ScopedTimer>,
    nav_listener: Option<ScopedTimer>,
}

impl<F: Fetcher> ListView<F> {
    pub fn new(fetcher: F, table: TableState<F::Row>) -> Self {
        Self {
            state: Arc::new(Mutex::new(table)),
            fetcher: Arc::new(fetcher),
            interval: DEFAULT_REFRESH_INTERVAL,
            route: None,
            refresh_timer: None,
            nav_listener: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Route whose navigation-end events trigger a refetch.
    pub fn with_route(mut self, url: impl Into<String>) -> Self {
        self.route = Some(url.into());
        self
    }

    pub fn state(&self) -> Arc<Mutex<TableState<F::Row>>> {
        self.state.clone()
    }

    /// Fetch once and replace the displayed rows.
    pub async fn refresh(&self) -> Result<()> {
        refresh_into(&self.state, self.fetcher.as_ref()).await
    }

    /// Initial load, then periodic and navigation-triggered refetches.
    /// A failed initial load is returned; later failures are logged and the
    /// previous rows stay on screen.
    pub async fn start(&mut self, navigation: Option<broadcast::Receiver<NavigationEnd>>) -> Result<()> {
        self.stop();
        self.refresh().await?;

        let state = self.state.clone();
        let fetcher = self.fetcher.clone();
        self.refresh_timer = Some(ScopedTimer::every(self.interval, move || {
            let state = state.clone();
            let fetcher = fetcher.clone();
            async move {
                if let Err(e) = refresh_into(&state, fetcher.as_ref()).await {
                    warn!("Periodic list refresh failed: {}", e);
                }
            }
        }));

        if let (Some(route), Some(mut rx)) = (self.route.clone(), navigation) {
            let state = self.state.clone();
            let fetcher = self.fetcher.clone();
            let handle = tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(event) if event.url == route => {
                            debug!(url = %event.url, "navigation refresh");
                            if let Err(e) = refresh_into(&state, fetcher.as_ref()).await {
                                warn!("Navigation refresh failed: {}", e);
                            }
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(skipped, "navigation listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            });
            self.nav_listener = Some(ScopedTimer::from_handle(handle));
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.refresh_timer.as_ref().is_some_and(|t| t.is_active())
    }

    /// Cancel both refresh triggers.
    pub fn stop(&mut self) {
        if let Some(mut timer) = self.refresh_timer.take() {
            timer.cancel();
        }
        if let Some(mut listener) = self.nav_listener.take() {
            listener.cancel();
        }
    }
}

async fn refresh_into<F: Fetcher>(state: &Mutex<TableState<F::Row>>, fetcher: &F) -> Result<()> {
    let rows = fetcher.fetch().await?;
    let count = rows.len();
    state.lock().await.set_rows(rows);
    debug!(rows = count, "list refreshed");
    Ok(())
}
