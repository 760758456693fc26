//! Browser session lifecycle management
//!
//! Owns the single process-wide headless browser used for contact reveal
//! and rendered-page fetches. The session is launched lazily on first use,
//! serialized through a mutex (no two extractions may drive it at once),
//! and shut down by an idle watchdog after 5 seconds without activity. A
//! `waiting` flag suppresses the watchdog while a bounded page-load wait is
//! outstanding; the session mutex keeps it from interrupting an extraction
//! already in flight.

pub mod reveal;

use anyhow::{anyhow, Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::captcha::ChallengeSolver;
use crate::fetch::USER_AGENT;

pub use reveal::ContactInfo;

/// Interval between idle checks
const WATCHDOG_INTERVAL: Duration = Duration::from_secs(5);

/// Wrapper for the browser and its event handler task
///
/// The handler MUST be aborted when the session ends, otherwise it runs
/// indefinitely after the browser process is gone.
pub struct SessionWrapper {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl SessionWrapper {
    fn browser(&self) -> &Browser {
        &self.browser
    }
}

impl Drop for SessionWrapper {
    fn drop(&mut self) {
        self.handler.abort();
        // Browser::drop kills the Chrome process if close() wasn't called.
    }
}

struct SessionInner {
    session: Mutex<Option<SessionWrapper>>,
    last_used: Mutex<Instant>,
    waiting: AtomicBool,
    watchdog: Mutex<Option<JoinHandle<()>>>,
    idle_timeout: Duration,
    element_wait: Duration,
    solver: Option<Arc<dyn ChallengeSolver>>,
}

/// Manager for the shared browser session
///
/// Cloning shares the same underlying session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

impl SessionManager {
    /// Create a manager; the browser is not launched until first use
    #[must_use]
    pub fn new(
        idle_timeout: Duration,
        element_wait: Duration,
        solver: Option<Arc<dyn ChallengeSolver>>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                session: Mutex::new(None),
                last_used: Mutex::new(Instant::now()),
                waiting: AtomicBool::new(false),
                watchdog: Mutex::new(None),
                idle_timeout,
                element_wait,
                solver,
            }),
        }
    }

    /// Lock the session, launching the browser if absent
    ///
    /// The returned guard serializes all interactive operations; hold it
    /// for the duration of an extraction.
    async fn ensure_session(&self) -> Result<MutexGuard<'_, Option<SessionWrapper>>> {
        let mut guard = self.inner.session.lock().await;
        if guard.is_none() {
            info!("launching browser session");
            *guard = Some(launch_session().await?);

            let mut watchdog = self.inner.watchdog.lock().await;
            if watchdog.is_none() {
                *watchdog = Some(spawn_watchdog(Arc::clone(&self.inner)));
            }
        }
        self.touch().await;
        Ok(guard)
    }

    async fn touch(&self) {
        *self.inner.last_used.lock().await = Instant::now();
    }

    /// Navigate the session to `url` and return the rendered page source
    ///
    /// When `wait_for` is set, waits (bounded) for the selector to appear
    /// before reading the document; rendered result pages populate their
    /// rows from script after the navigation completes.
    pub async fn page_source(&self, url: &str, wait_for: Option<&str>) -> Result<String> {
        let guard = self.ensure_session().await?;
        let wrapper = guard
            .as_ref()
            .ok_or_else(|| anyhow!("browser session unavailable"))?;

        let page = wrapper
            .browser()
            .new_page(url)
            .await
            .with_context(|| format!("failed to open {url}"))?;

        self.inner.waiting.store(true, Ordering::SeqCst);
        let source = async {
            page.wait_for_navigation()
                .await
                .context("page failed to load")?;
            if let Some(selector) = wait_for {
                wait_for_element(&page, selector, self.inner.element_wait)
                    .await
                    .with_context(|| format!("timed out waiting for '{selector}'"))?;
            }
            page.content().await.context("failed to read page content")
        }
        .await;
        self.inner.waiting.store(false, Ordering::SeqCst);

        let _ = page.close().await;
        self.touch().await;
        source
    }

    /// Reveal a listing's contact details (see [`reveal`])
    pub async fn reveal_contact(&self, url: &str) -> Result<ContactInfo> {
        let guard = self.ensure_session().await?;
        let wrapper = guard
            .as_ref()
            .ok_or_else(|| anyhow!("browser session unavailable"))?;

        let page = wrapper
            .browser()
            .new_page(url)
            .await
            .with_context(|| format!("failed to open {url}"))?;

        self.inner.waiting.store(true, Ordering::SeqCst);
        let loaded = page.wait_for_navigation().await;
        self.inner.waiting.store(false, Ordering::SeqCst);
        if let Err(e) = loaded {
            let _ = page.close().await;
            return Err(anyhow!("listing page failed to load: {e}"));
        }

        let contact = reveal::run_reveal(
            &page,
            self.inner.element_wait,
            self.inner.solver.as_deref(),
        )
        .await;

        let _ = page.close().await;
        self.touch().await;
        Ok(contact)
    }

    /// Explicitly shut the session down
    ///
    /// Safe to call when no session is live; a later call launches a fresh
    /// browser.
    pub async fn quit(&self) {
        let mut guard = self.inner.session.lock().await;
        if let Some(wrapper) = guard.take() {
            info!("shutting down browser session");
            shutdown_wrapper(wrapper).await;
        }
        if let Some(watchdog) = self.inner.watchdog.lock().await.take() {
            watchdog.abort();
        }
    }
}

/// Launch the headless browser
///
/// Sandboxing is disabled so the session works in containerized
/// environments without extra privileges.
async fn launch_session() -> Result<SessionWrapper> {
    let config = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(30))
        .headless_mode(HeadlessMode::default())
        .arg(format!("--user-agent={USER_AGENT}"))
        .arg("--no-sandbox")
        .arg("--disable-setuid-sandbox")
        .arg("--disable-gpu")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-infobars")
        .arg("--disable-extensions")
        .arg("--disable-application-cache")
        .build()
        .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .context("failed to launch headless browser")?;

    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                error!("browser handler error: {e:?}");
            }
        }
        debug!("browser event handler task completed");
    });

    Ok(SessionWrapper {
        browser,
        handler: handler_task,
    })
}

async fn shutdown_wrapper(mut wrapper: SessionWrapper) {
    if let Err(e) = wrapper.browser.close().await {
        warn!("failed to close browser cleanly: {e}");
    }
    if let Err(e) = wrapper.browser.wait().await {
        warn!("failed to wait for browser exit: {e}");
    }
    // Drop aborts the handler task.
}

/// Background task: quit the session after `idle_timeout` without activity
///
/// Advisory only. `try_lock` skips the check while an extraction holds the
/// session, and the `waiting` flag covers page-load waits.
fn spawn_watchdog(inner: Arc<SessionInner>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(WATCHDOG_INTERVAL);
        interval.tick().await; // first tick completes immediately
        loop {
            interval.tick().await;

            if inner.waiting.load(Ordering::SeqCst) {
                continue;
            }
            let idle = inner.last_used.lock().await.elapsed();
            if idle < inner.idle_timeout {
                continue;
            }
            let Ok(mut guard) = inner.session.try_lock() else {
                continue;
            };
            if let Some(wrapper) = guard.take() {
                info!("browser session idle for {idle:?}, shutting down");
                shutdown_wrapper(wrapper).await;
            }
        }
    })
}

/// Poll for an element until it appears or the bounded wait elapses
pub(crate) async fn wait_for_element(
    page: &Page,
    selector: &str,
    timeout: Duration,
) -> Option<Element> {
    let start = Instant::now();
    let poll_interval = Duration::from_millis(200);
    loop {
        if let Ok(element) = page.find_element(selector).await {
            return Some(element);
        }
        if start.elapsed() >= timeout {
            return None;
        }
        tokio::time::sleep(poll_interval).await;
    }
}
