use headless_chrome::Browser as ChromeBrowser;
use headless_chrome::LaunchOptions;
pub use headless_chrome::{Element, Tab};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Bounded wait applied after navigation until the document body exists.
pub const READY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),
    #[error("Navigation error: {0}")]
    NavigationError(String),
    #[error("Timeout error: {0}")]
    Timeout(String),
    #[error("Browser error: {0}")]
    BrowserError(#[from] anyhow::Error),
}

/// One Chrome process. Dropping the value terminates the process, so a
/// session held by a collector or batch run is released on every exit path.
pub struct Browser {
    browser: ChromeBrowser,
}

impl Browser {
    pub fn new(headless: bool) -> Result<Self, BrowserError> {
        let launch_options = LaunchOptions::default_builder()
            .headless(headless)
            .window_size(Some((1920, 1080)))
            .idle_browser_timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let browser = ChromeBrowser::new(launch_options)
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        info!("Browser launched (headless: {})", headless);
        Ok(Self { browser })
    }

    pub fn new_tab(&self) -> Result<Arc<Tab>, BrowserError> {
        self.browser
            .new_tab()
            .map_err(|e| BrowserError::BrowserError(anyhow::anyhow!(e.to_string())))
    }

    /// Navigate and wait for basic readiness. The body wait is the one
    /// failure callers must treat as fatal for the page.
    pub fn navigate(&self, tab: &Arc<Tab>, url: &str) -> Result<(), BrowserError> {
        info!("Navigating to: {}", url);

        tab.navigate_to(url)
            .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
        tab.wait_until_navigated()
            .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
        tab.wait_for_element_with_custom_timeout("body", READY_TIMEOUT)
            .map_err(|e| BrowserError::Timeout(format!("body not ready at {url}: {e}")))?;

        debug!("Navigation complete");
        Ok(())
    }

    /// Snapshot of the rendered DOM as an HTML string.
    pub fn page_html(&self, tab: &Arc<Tab>) -> Result<String, BrowserError> {
        tab.get_content()
            .map_err(|e| BrowserError::BrowserError(anyhow::anyhow!(e.to_string())))
    }

    pub fn execute_script(
        &self,
        tab: &Arc<Tab>,
        script: &str,
    ) -> Result<serde_json::Value, BrowserError> {
        let result = tab
            .evaluate(script, false)
            .map_err(|e| BrowserError::BrowserError(anyhow::anyhow!(e.to_string())))?;
        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    pub fn scroll_by_viewport_fraction(
        &self,
        tab: &Arc<Tab>,
        fraction: f64,
    ) -> Result<(), BrowserError> {
        self.execute_script(tab, &scroll_by_script(fraction))?;
        Ok(())
    }

    pub fn page_y_offset(&self, tab: &Arc<Tab>) -> Result<f64, BrowserError> {
        let value = self.execute_script(tab, "window.pageYOffset")?;
        numeric(&value, "window.pageYOffset")
    }

    pub fn inner_height(&self, tab: &Arc<Tab>) -> Result<f64, BrowserError> {
        let value = self.execute_script(tab, "window.innerHeight")?;
        numeric(&value, "window.innerHeight")
    }
}

/// True when a Chrome/Chromium executable can be located on this machine.
pub fn chrome_available() -> bool {
    headless_chrome::browser::default_executable().is_ok()
}

/// Vertical position of a live element relative to the viewport top.
pub fn element_viewport_top(element: &Element<'_>) -> Result<f64, BrowserError> {
    let result = element
        .call_js_fn(
            "function() { return this.getBoundingClientRect().top; }",
            vec![],
            false,
        )
        .map_err(|e| BrowserError::BrowserError(anyhow::anyhow!(e.to_string())))?;
    let value = result.value.unwrap_or(serde_json::Value::Null);
    numeric(&value, "getBoundingClientRect().top")
}

fn scroll_by_script(fraction: f64) -> String {
    format!("window.scrollBy(0, window.innerHeight * {});", fraction)
}

fn numeric(value: &serde_json::Value, what: &str) -> Result<f64, BrowserError> {
    value
        .as_f64()
        .ok_or_else(|| BrowserError::BrowserError(anyhow::anyhow!("{what} returned {value}")))
}
