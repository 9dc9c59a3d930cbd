use browser::{Browser, BrowserError, Tab};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

// Detail-page selectors, ordered by preference where alternatives exist.
const TITULO_SELECTORS: [&str; 2] = ["h1", "label.styles__TextCard-sc-25khzf-6"];
const FOTO_SELECTOR: &str = "div.styles__ImageContainer-sc-25khzf-3 img";
const SUBTITULO_SELECTORS: [&str; 3] = [
    "h1 + p",
    "h3.styles_new_description_sub_header__AEMry span",
    "div.styles_container_sub_header__JpoUq",
];
const BLOCK_SELECTOR: &str =
    "div.styles__ItemText-sc-25khzf-15, div.styles__ItemSubContainer-sc-waujo0-9";
const LABEL_SELECTORS: [&str; 2] = ["span.styles_sub_item__s3Aiz", "p.text-caption-regular"];
const VALUE_SELECTORS: [&str; 2] = ["span.styles_sub_item_data__kKr1_", "p.text-body-medium"];

// Participating-stores modal. The trigger search stays inside the parameter
// blocks; stray "Ver listado" text elsewhere on the page must not match.
const MODAL_TRIGGER_XPATH: &str = "//div[contains(@class,'styles__ItemText') \
     or contains(@class,'styles__ItemSubContainer')]//p[contains(.,'Ver listado')]";
const STORES_SECTION_SELECTOR: &str = "section[data-testid='participating-stores-list']";
const STORE_NAME_SELECTOR: &str = "p[data-testid='store-name']";
const STORE_ADDRESS_SELECTOR: &str = "p[data-testid='store-address']";
const MODAL_CLOSE_SELECTOR: &str = "button[data-testid='button-modal-close']";
const MODAL_WAIT: Duration = Duration::from_secs(10);

const STORE_LIST_MARKER: &str = "ver listado";

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("Failed to open {url}: {source}")]
    PageUnavailable { url: String, source: BrowserError },
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),
}

/// Column order of the tabular output.
pub const COLUMNS: [&str; 13] = [
    "link",
    "titulo",
    "foto",
    "subtitulo",
    "comercios",
    "store_names",
    "store_addresses",
    "vigencia",
    "bancos",
    "tope_reintegro",
    "tiempo_acreditacion",
    "dias",
    "canal",
];

/// One promotion page. Every field except `link` is best-effort: a selector
/// miss leaves it `None`, and stored strings are always trimmed, never
/// whitespace-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoRecord {
    pub link: String,
    pub titulo: Option<String>,
    pub foto: Option<String>,
    pub subtitulo: Option<String>,
    pub comercios: Option<String>,
    pub store_names: Option<Vec<String>>,
    pub store_addresses: Option<Vec<String>>,
    pub vigencia: Option<String>,
    pub bancos: Option<Vec<String>>,
    pub tope_reintegro: Option<String>,
    pub tiempo_acreditacion: Option<String>,
    pub dias: Option<Vec<String>>,
    pub canal: Option<String>,
}

impl PromoRecord {
    pub fn new(link: &str) -> Self {
        Self {
            link: link.to_string(),
            titulo: None,
            foto: None,
            subtitulo: None,
            comercios: None,
            store_names: None,
            store_addresses: None,
            vigencia: None,
            bancos: None,
            tope_reintegro: None,
            tiempo_acreditacion: None,
            dias: None,
            canal: None,
        }
    }

    /// The stores value is a "Ver listado" placeholder, so a fuller list
    /// sits behind the modal.
    pub fn wants_store_list(&self) -> bool {
        self.comercios
            .as_deref()
            .map(|v| v.to_lowercase().starts_with(STORE_LIST_MARKER))
            .unwrap_or(false)
    }
}

/// Per-item progress callbacks for a batch run. All methods default to
/// no-ops so callers opt into what they need.
pub trait Progress {
    fn begin(&mut self, _total: usize) {}
    fn url_started(&mut self, _index: usize, _total: usize, _url: &str) {}
    fn finish(&mut self) {}
}

/// Use when no progress reporting is wanted.
pub struct NullProgress;

impl Progress for NullProgress {}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn first_text(scope: ElementRef, selectors: &[&str]) -> Option<String> {
    for css in selectors {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        if let Some(el) = scope.select(&selector).next() {
            let text = element_text(el);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn first_attr(scope: ElementRef, selectors: &[&str], attr: &str) -> Option<String> {
    for css in selectors {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        if let Some(el) = scope.select(&selector).next() {
            if let Some(value) = el.value().attr(attr) {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

fn block_value(block: ElementRef) -> Option<String> {
    first_text(block, &VALUE_SELECTORS).or_else(|| {
        // Neither value class resolved; fall back to the block's second
        // paragraph (the first is usually the label).
        let p = Selector::parse("p").ok()?;
        block
            .select(&p)
            .nth(1)
            .map(element_text)
            .filter(|t| !t.is_empty())
    })
}

fn bank_alts(block: ElementRef) -> Option<Vec<String>> {
    let img = Selector::parse("img").ok()?;
    let alts: Vec<String> = block
        .select(&img)
        .filter_map(|i| i.value().attr("alt"))
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    if alts.is_empty() {
        None
    } else {
        Some(alts)
    }
}

fn active_day_labels(block: ElementRef) -> Option<Vec<String>> {
    let span = Selector::parse("span[aria-label]").ok()?;
    let days: Vec<String> = block
        .select(&span)
        .filter(|s| s.value().attr("aria-hidden") != Some("true"))
        .filter_map(|s| s.value().attr("aria-label"))
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    if days.is_empty() {
        None
    } else {
        Some(days)
    }
}

fn apply_block(record: &mut PromoRecord, block: ElementRef) {
    let Some(label) = first_text(block, &LABEL_SELECTORS) else {
        return;
    };
    let label = label.to_lowercase();
    let value = block_value(block);

    if label.starts_with("comercios") {
        record.comercios = value;
    } else if label.starts_with("vigencia") {
        record.vigencia = value;
    } else if label.starts_with("bancos") {
        record.bancos = bank_alts(block);
    } else if label.starts_with("tope") {
        record.tope_reintegro = value;
    } else if label.starts_with("tiempo") {
        record.tiempo_acreditacion = value;
    } else if label.contains("usalo") {
        record.dias = active_day_labels(block);
    } else if label.starts_with("desde la") {
        record.canal = value;
    }
}

/// Read every non-modal field out of a rendered detail-page snapshot.
/// Wholly best-effort: missing selectors leave fields `None`.
pub fn parse_detail(html: &str, url: &str) -> PromoRecord {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let mut record = PromoRecord::new(url);
    record.titulo = first_text(root, &TITULO_SELECTORS);
    record.foto = first_attr(root, &[FOTO_SELECTOR], "src");
    record.subtitulo = first_text(root, &SUBTITULO_SELECTORS);

    if let Ok(blocks) = Selector::parse(BLOCK_SELECTOR) {
        for block in root.select(&blocks) {
            apply_block(&mut record, block);
        }
    }

    record
}

/// Read the participating-stores modal out of a snapshot taken while the
/// modal is open. Entries are trimmed and the two lists truncated to the
/// common length so they stay index-aligned; `None` when nothing usable
/// remains.
pub fn parse_store_modal(html: &str) -> Option<(Vec<String>, Vec<String>)> {
    let document = Html::parse_document(html);
    let section_sel = Selector::parse(STORES_SECTION_SELECTOR).ok()?;
    let name_sel = Selector::parse(STORE_NAME_SELECTOR).ok()?;
    let address_sel = Selector::parse(STORE_ADDRESS_SELECTOR).ok()?;

    let section = document.select(&section_sel).next()?;
    let mut names: Vec<String> = section
        .select(&name_sel)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();
    let mut addresses: Vec<String> = section
        .select(&address_sel)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();

    let len = names.len().min(addresses.len());
    if len == 0 {
        return None;
    }
    names.truncate(len);
    addresses.truncate(len);
    Some((names, addresses))
}

/// Click the "Ver listado" control, wait for the stores section, snapshot it
/// and close the modal again. `Ok(None)` means there was nothing to expand;
/// errors are for the caller to swallow.
fn expand_store_modal(
    browser: &Browser,
    tab: &Arc<Tab>,
) -> Result<Option<(Vec<String>, Vec<String>)>, BrowserError> {
    let trigger = match tab.find_element_by_xpath(MODAL_TRIGGER_XPATH) {
        Ok(trigger) => trigger,
        Err(e) => {
            debug!("Store list trigger not found: {}", e);
            return Ok(None);
        }
    };

    trigger.click()?;
    tab.wait_for_element_with_custom_timeout(STORES_SECTION_SELECTOR, MODAL_WAIT)
        .map_err(|e| BrowserError::Timeout(format!("store list did not appear: {e}")))?;

    let html = browser.page_html(tab)?;
    let stores = parse_store_modal(&html);

    // Leave the page usable for the next visit; a missing close control is
    // tolerated.
    if let Ok(close) = tab.find_element(MODAL_CLOSE_SELECTOR) {
        let _ = close.click();
    }

    Ok(stores)
}

/// Visit one promotion page and build its record. The page-readiness wait is
/// the only failure that propagates; every field read, including the whole
/// modal expansion, is best-effort.
pub fn extract(browser: &Browser, tab: &Arc<Tab>, url: &str) -> Result<PromoRecord, ExtractorError> {
    browser
        .navigate(tab, url)
        .map_err(|source| ExtractorError::PageUnavailable {
            url: url.to_string(),
            source,
        })?;

    let html = browser.page_html(tab)?;
    let mut record = parse_detail(&html, url);

    if record.wants_store_list() {
        match expand_store_modal(browser, tab) {
            Ok(Some((names, addresses))) => {
                debug!("Expanded store list: {} entries", names.len());
                record.store_names = Some(names);
                record.store_addresses = Some(addresses);
            }
            Ok(None) => {}
            Err(e) => warn!("Store list expansion failed for {}: {}", url, e),
        }
    }

    Ok(record)
}

/// Visit every URL in order with a single browser session and return one
/// record per URL. A page that fails to load aborts the batch; the session
/// is owned here and closes on every return path.
pub fn build_batch(
    urls: &[String],
    headless: bool,
    progress: &mut dyn Progress,
) -> Result<Vec<PromoRecord>, ExtractorError> {
    let browser = Browser::new(headless)?;
    let tab = browser.new_tab()?;

    progress.begin(urls.len());
    let mut records = Vec::with_capacity(urls.len());

    for (i, url) in urls.iter().enumerate() {
        info!("[{}/{}] {}", i + 1, urls.len(), url);
        progress.url_started(i + 1, urls.len(), url);
        records.push(extract(&browser, &tab, url)?);
    }

    progress.finish();
    Ok(records)
}
