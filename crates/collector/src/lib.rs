use browser::{Browser, BrowserError};
use indexmap::IndexSet;
use scraper::{Html, Selector};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Listing page that enumerates every promotion card.
pub const LISTING_URL: &str = "https://www.modo.com.ar/promos";
/// Origin that relative card hrefs resolve against.
pub const BASE_URL: &str = "https://www.modo.com.ar";

// Promo cards on the listing page.
const CARD_SELECTOR: &str = ".w-full.h-auto";
// Help heading near the bottom of the listing, used only as a scroll gauge.
const LANDMARK_XPATH: &str = "//h3[normalize-space()='¿Necesitás ayuda?']";

const SCROLL_FRACTION: f64 = 0.8;
const LANDMARK_BOTTOM_MARGIN: f64 = 100.0;
const INITIAL_SETTLE: Duration = Duration::from_secs(2);
const SCROLL_SETTLE: Duration = Duration::from_millis(300);

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Landmark heading not found on listing page: {0}")]
    LandmarkMissing(String),
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub listing_url: String,
    pub base_url: Url,
    /// Delay before each collection attempt once the landmark is in view.
    pub pause: Duration,
    /// Consecutive no-growth collection attempts tolerated before stopping.
    pub max_stalls: u32,
    pub headless: bool,
}

impl CollectorConfig {
    pub fn new(listing_url: &str, base_url: &str) -> Result<Self, CollectorError> {
        let base = Url::parse(base_url).map_err(|e| CollectorError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            listing_url: listing_url.to_string(),
            base_url: base,
            pause: Duration::from_secs(1),
            max_stalls: 2,
            headless: true,
        })
    }
}

/// Counts consecutive collection attempts that added no new links.
/// Growth resets the count; iterations that skip collection never reach it.
#[derive(Debug)]
struct StallTracker {
    stalls: u32,
    max_stalls: u32,
}

impl StallTracker {
    fn new(max_stalls: u32) -> Self {
        Self {
            stalls: 0,
            max_stalls,
        }
    }

    fn observe(&mut self, added: usize) {
        if added == 0 {
            self.stalls += 1;
        } else {
            self.stalls = 0;
        }
    }

    fn exhausted(&self) -> bool {
        self.stalls >= self.max_stalls
    }

    fn count(&self) -> u32 {
        self.stalls
    }
}

/// Detects the absolute bottom of the page: the scroll offset did not move
/// during this iteration and already matched the previous iteration.
#[derive(Debug, Default)]
struct BottomDetector {
    last_y: Option<f64>,
}

impl BottomDetector {
    fn at_bottom(&mut self, y_before: f64, y_after: f64) -> bool {
        if y_after == y_before && self.last_y == Some(y_after) {
            return true;
        }
        self.last_y = Some(y_after);
        false
    }
}

/// Pull candidate promo links out of a rendered listing snapshot: every card
/// element with a non-empty href, resolved against `base_url`, fragment
/// stripped, same-origin only. Duplicates are kept; the caller's set dedupes.
pub fn extract_card_links(html: &str, base_url: &Url) -> Result<Vec<String>, CollectorError> {
    let document = Html::parse_document(html);
    let selector =
        Selector::parse(CARD_SELECTOR).map_err(|e| CollectorError::ParseError(e.to_string()))?;

    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if href.is_empty() {
            continue;
        }
        if let Ok(mut url) = base_url.join(href) {
            url.set_fragment(None);
            if url.domain() == base_url.domain() {
                links.push(url.to_string());
            }
        }
    }

    debug!("Extracted {} candidate links from snapshot", links.len());
    Ok(links)
}

/// Scroll the listing page until link discovery stalls `max_stalls` times in
/// a row or the page bottoms out, then return the deduplicated links in
/// lexicographic order. Fails outright when the landmark heading is missing.
/// The browser session is owned here and closes on every return path.
pub fn collect_links(config: &CollectorConfig) -> Result<Vec<String>, CollectorError> {
    let browser = Browser::new(config.headless)?;
    let tab = browser.new_tab()?;

    browser.navigate(&tab, &config.listing_url)?;
    thread::sleep(INITIAL_SETTLE);

    let landmark = tab
        .find_element_by_xpath(LANDMARK_XPATH)
        .map_err(|e| CollectorError::LandmarkMissing(e.to_string()))?;

    let mut seen: IndexSet<String> = IndexSet::new();
    let mut stalls = StallTracker::new(config.max_stalls);
    let mut bottom = BottomDetector::default();

    while !stalls.exhausted() {
        let y_before = browser.page_y_offset(&tab)?;
        browser.scroll_by_viewport_fraction(&tab, SCROLL_FRACTION)?;
        thread::sleep(SCROLL_SETTLE);
        let y_after = browser.page_y_offset(&tab)?;

        if bottom.at_bottom(y_before, y_after) {
            debug!("Absolute bottom reached at offset {}", y_after);
            break;
        }

        let top = browser::element_viewport_top(&landmark)?;
        let inner_height = browser.inner_height(&tab)?;
        if top > 0.0 && top < inner_height - LANDMARK_BOTTOM_MARGIN {
            thread::sleep(config.pause);
            let html = browser.page_html(&tab)?;
            let before = seen.len();
            for link in extract_card_links(&html, &config.base_url)? {
                seen.insert(link);
            }
            let added = seen.len() - before;
            stalls.observe(added);
            debug!(
                "Collection attempt: {} new, {} total, {} stalls",
                added,
                seen.len(),
                stalls.count()
            );
        }
    }

    let mut links: Vec<String> = seen.into_iter().collect();
    links.sort();
    info!("Collected {} promo links", links.len());
    Ok(links)
}
