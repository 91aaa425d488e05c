//! Owner of the single shared browser page.
//!
//! The manager builds the driver's layers eagerly, hands out one lease at a
//! time, probes the page on every acquisition and recreates it when the
//! probe fails. Leases hold the lock for the whole tool action.

use crate::driver::BrowserDriver;
use crate::error::BrowserError;
use std::ops::Deref;
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMappedMutexGuard, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

/// How hard the manager tries to replace a dead page.
#[derive(Debug, Clone)]
pub struct RecoveryPolicy {
    /// Page recreation attempts after a failed probe (at least one).
    pub attempts: u32,
    /// Delay before the second attempt, doubled for each further one.
    pub backoff: Duration,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::from_millis(250),
        }
    }
}

struct Resource<D: BrowserDriver> {
    platform: D::Platform,
    browser: D::Browser,
    context: D::Context,
    page: D::Page,
}

pub struct ResourceManager<D: BrowserDriver> {
    driver: D,
    state: Arc<Mutex<Option<Resource<D>>>>,
    policy: RecoveryPolicy,
    holder: Arc<parking_lot::Mutex<Option<ThreadId>>>,
}

impl<D: BrowserDriver> ResourceManager<D> {
    /// Build platform, browser, context and page before returning.
    ///
    /// Configuration problems surface here rather than on the first tool call.
    /// Layers created before a failure are torn down again.
    pub async fn launch(driver: D, policy: RecoveryPolicy) -> Result<Self, BrowserError> {
        info!(
            thread = ?std::thread::current().id(),
            "initializing browser resource"
        );
        let resource = build_resource(&driver).await.map_err(|e| {
            error!("failed to initialize browser: {}", e);
            e
        })?;
        info!("browser and page initialized");

        Ok(Self {
            driver,
            state: Arc::new(Mutex::new(Some(resource))),
            policy,
            holder: Arc::new(parking_lot::Mutex::new(None)),
        })
    }

    /// Lease the page for the duration of one operation.
    ///
    /// Waits for any other holder. Must not be called while the same task
    /// already holds a lease: that deadlocks.
    pub async fn acquire(&self) -> Result<PageLease<D>, BrowserError> {
        let start = Instant::now();
        let thread = std::thread::current().id();
        debug!(?thread, "acquiring browser page");

        let mut guard = Arc::clone(&self.state).lock_owned().await;
        let wait_time = start.elapsed();

        let resource = guard.as_mut().ok_or_else(not_initialized)?;
        if let Err(probe_error) = self.driver.probe(&resource.page).await {
            warn!(error = %probe_error, "page failed liveness probe, recreating");
            self.recover(resource).await?;
        }

        *self.holder.lock() = Some(thread);
        let page = OwnedMutexGuard::try_map(guard, |state| {
            state.as_mut().map(|resource| &mut resource.page)
        })
        .map_err(|_| not_initialized())?;

        Ok(PageLease {
            page,
            holder: Arc::clone(&self.holder),
            wait_time,
        })
    }

    /// Tear everything down. Safe to call more than once.
    ///
    /// Later acquisitions fail with `ResourceUnavailable`.
    pub async fn cleanup(&self) {
        let mut guard = self.state.lock().await;
        let Some(resource) = guard.take() else {
            debug!("browser already cleaned up");
            return;
        };

        info!(
            thread = ?std::thread::current().id(),
            "starting browser cleanup"
        );
        let Resource {
            platform,
            browser,
            context,
            page,
        } = resource;

        log_teardown("page", self.driver.close_page(page).await);
        log_teardown("context", self.driver.close_context(context).await);
        log_teardown("browser", self.driver.close_browser(browser).await);
        log_teardown("platform", self.driver.stop_platform(platform).await);
        info!("browser cleanup completed");
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// Thread currently holding a lease, for diagnostics only.
    pub fn holder(&self) -> Option<ThreadId> {
        *self.holder.lock()
    }

    async fn recover(&self, resource: &mut Resource<D>) -> Result<(), BrowserError> {
        let attempts = self.policy.attempts.max(1);
        let mut delay = self.policy.backoff;
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.driver.new_page(&resource.context).await {
                Ok(page) => {
                    let dead = std::mem::replace(&mut resource.page, page);
                    if let Err(e) = self.driver.close_page(dead).await {
                        debug!(error = %e, "closing dead page failed");
                    }
                    info!(attempt, "browser page recreated");
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, error = %e, "page recreation failed");
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(delay).await;
                        delay = delay.saturating_mul(2);
                    }
                }
            }
        }

        Err(BrowserError::ResourceUnavailable(format!(
            "page recreation failed after {} attempt(s): {}",
            attempts,
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string())
        )))
    }
}

/// Exclusive access to the page; the lock is released on drop.
pub struct PageLease<D: BrowserDriver> {
    page: OwnedMappedMutexGuard<Option<Resource<D>>, D::Page>,
    holder: Arc<parking_lot::Mutex<Option<ThreadId>>>,
    wait_time: Duration,
}

impl<D: BrowserDriver> PageLease<D> {
    pub fn wait_time(&self) -> Duration {
        self.wait_time
    }
}

impl<D: BrowserDriver> Deref for PageLease<D> {
    type Target = D::Page;

    fn deref(&self) -> &D::Page {
        &self.page
    }
}

impl<D: BrowserDriver> Drop for PageLease<D> {
    fn drop(&mut self) {
        *self.holder.lock() = None;
    }
}

fn not_initialized() -> BrowserError {
    BrowserError::ResourceUnavailable("browser is not initialized".to_string())
}

fn log_teardown(layer: &str, result: Result<(), BrowserError>) {
    if let Err(e) = result {
        warn!(layer, error = %e, "error during browser cleanup");
    }
}

async fn build_resource<D: BrowserDriver>(driver: &D) -> Result<Resource<D>, BrowserError> {
    let platform = driver.start_platform().await?;

    let browser = match driver.launch_browser(&platform).await {
        Ok(browser) => browser,
        Err(e) => {
            log_teardown("platform", driver.stop_platform(platform).await);
            return Err(e);
        }
    };

    let context = match driver.new_context(&browser).await {
        Ok(context) => context,
        Err(e) => {
            log_teardown("browser", driver.close_browser(browser).await);
            log_teardown("platform", driver.stop_platform(platform).await);
            return Err(e);
        }
    };

    let page = match driver.new_page(&context).await {
        Ok(page) => page,
        Err(e) => {
            log_teardown("context", driver.close_context(context).await);
            log_teardown("browser", driver.close_browser(browser).await);
            log_teardown("platform", driver.stop_platform(platform).await);
            return Err(e);
        }
    };

    Ok(Resource {
        platform,
        browser,
        context,
        page,
    })
}
