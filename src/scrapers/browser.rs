use crate::config::BrowserConfig;
use crate::scrapers::session::BrowserSession;
use anyhow::{anyhow, Context, Result};
use headless_chrome::util::Timeout;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Browser session backed by headless Chrome
pub struct ChromeSession {
    browser: Option<Browser>,
    tab: Option<Arc<Tab>>,
}

impl ChromeSession {
    /// Launch Chrome and open the tab the crawl will drive
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false)
            .window_size(Some(config.window_size))
            .idle_browser_timeout(Duration::from_secs(config.idle_timeout_secs))
            .args(vec![
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-blink-features=AutomationControlled"),
            ])
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
        let tab = browser.new_tab().context("Failed to open tab")?;
        tab.set_user_agent(
            &config.user_agent,
            Some(config.accept_language.as_str()),
            Some(config.platform.as_str()),
        )
        .context("Failed to set user agent")?;

        Ok(Self {
            browser: Some(browser),
            tab: Some(tab),
        })
    }

    fn tab(&self) -> Result<&Arc<Tab>> {
        self.tab
            .as_ref()
            .ok_or_else(|| anyhow!("browser session already released"))
    }
}

/// Expired bounded waits surface as `Ok(false)`, anything else is a fault
fn timed_out<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.downcast_ref::<Timeout>().is_some() => Ok(None),
        Err(e) => Err(e),
    }
}

impl BrowserSession for ChromeSession {
    fn open(&mut self, url: &str) -> Result<()> {
        let tab = self.tab()?;
        debug!("Navigating to {}", url);
        tab.navigate_to(url)
            .with_context(|| format!("Failed to navigate to {}", url))?;
        tab.wait_until_navigated()?;
        if let Ok(title) = tab.get_title() {
            info!("Page opened: {}", title);
        }
        Ok(())
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool> {
        let tab = self.tab()?;
        let found = timed_out(tab.wait_for_element_with_custom_timeout(selector, timeout))?;
        Ok(found.is_some())
    }

    fn page_html(&mut self) -> Result<String> {
        self.tab()?
            .get_content()
            .context("Failed to read page HTML")
    }

    fn prepare_click(&mut self, selector: &str, timeout: Duration) -> Result<bool> {
        let tab = self.tab()?;
        let Some(element) =
            timed_out(tab.wait_for_element_with_custom_timeout(selector, timeout))?
        else {
            return Ok(false);
        };

        let disabled = element.get_attribute_value("disabled")?.is_some()
            || element.get_attribute_value("aria-disabled")?.as_deref() == Some("true");
        if disabled {
            debug!("Control {} is disabled", selector);
            return Ok(false);
        }

        element.scroll_into_view()?;
        Ok(true)
    }

    fn click(&mut self, selector: &str) -> Result<()> {
        self.tab()?
            .find_element(selector)
            .with_context(|| format!("Control {} vanished before click", selector))?
            .click()?;
        Ok(())
    }

    fn release(&mut self) {
        if let Some(tab) = self.tab.take() {
            if let Err(e) = tab.close(true) {
                warn!("Failed to close tab cleanly: {}", e);
            }
        }
        // Dropping the browser kills the Chrome process
        if self.browser.take().is_some() {
            info!("Chrome session closed");
        }
    }
}
