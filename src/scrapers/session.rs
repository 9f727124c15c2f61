use anyhow::Result;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tracing::debug;

/// A live browser page driven by the crawler.
///
/// Waits are bounded: an expired wait returns `Ok(false)` and is the normal
/// way a walk learns there is nothing more to read. `Err` means the session
/// itself is broken.
pub trait BrowserSession {
    /// Navigate to `url` and wait for the navigation to settle
    fn open(&mut self, url: &str) -> Result<()>;

    /// Wait until `selector` matches something on the page
    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Current rendered document
    fn page_html(&mut self) -> Result<String>;

    /// Wait for an enabled control matching `selector` and scroll it into view
    fn prepare_click(&mut self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Click the control matching `selector`
    fn click(&mut self, selector: &str) -> Result<()>;

    /// Shut the browser down. Called once by [`SessionGuard`].
    fn release(&mut self);
}

/// Owns a session for one crawl and releases it when dropped
pub struct SessionGuard<S: BrowserSession> {
    session: S,
}

impl<S: BrowserSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }
}

impl<S: BrowserSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: BrowserSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: BrowserSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        debug!("Releasing browser session");
        self.session.release();
    }
}
