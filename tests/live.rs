//! Browser-backed tests. These need a local Chrome/Chromium install and are
//! ignored by default: cargo test --test live -- --ignored

use browser::{chrome_available, Browser};
use collector::{collect_links, CollectorConfig, CollectorError, BASE_URL};
use extractor::{build_batch, extract, NullProgress};

fn data_url(html: &str) -> String {
    format!(
        "data:text/html,{}",
        html.replace('#', "%23").replace('\n', "%0A")
    )
}

#[test]
#[ignore = "requires Chrome"]
fn test_extract_minimal_page_keeps_link_only() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let browser = Browser::new(true).expect("launch browser");
    let tab = browser.new_tab().expect("open tab");

    let url = data_url("<html><body><div>nada</div></body></html>");
    let record = extract(&browser, &tab, &url).expect("extract record");

    assert_eq!(record.link, url);
    assert_eq!(record.titulo, None);
    assert_eq!(record.comercios, None);
}

#[test]
#[ignore = "requires Chrome"]
fn test_extract_reads_rendered_fields() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let browser = Browser::new(true).expect("launch browser");
    let tab = browser.new_tab().expect("open tab");

    let html = "<html><body>\
        <h1>30% de descuento</h1>\
        <p>Solo los lunes</p>\
        <div class='styles__ItemText-sc-25khzf-15'>\
            <span class='styles_sub_item__s3Aiz'>Vigencia</span>\
            <span class='styles_sub_item_data__kKr1_'>Hasta el 31/12/2025</span>\
        </div>\
        </body></html>";
    let record = extract(&browser, &tab, &data_url(html)).expect("extract record");

    assert_eq!(record.titulo.as_deref(), Some("30% de descuento"));
    assert_eq!(record.subtitulo.as_deref(), Some("Solo los lunes"));
    assert_eq!(record.vigencia.as_deref(), Some("Hasta el 31/12/2025"));
}

#[test]
#[ignore = "requires Chrome"]
fn test_collect_links_fails_without_landmark() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let listing = data_url(
        "<html><body><a class='w-full h-auto' href='/promos/uno'>Uno</a></body></html>",
    );
    let config = CollectorConfig::new(&listing, BASE_URL).expect("build config");

    let result = collect_links(&config);
    assert!(matches!(result, Err(CollectorError::LandmarkMissing(_))));
}

#[test]
#[ignore = "requires Chrome"]
fn test_store_list_click_ignores_text_outside_blocks() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let browser = Browser::new(true).expect("launch browser");
    let tab = browser.new_tab().expect("open tab");

    // An unrelated "Ver listado" paragraph sits before the comercios block;
    // only the in-block trigger reveals the stores section when clicked.
    let html = r#"<html><body>
        <p>Ver listado de ayuda</p>
        <div class='styles__ItemText-sc-25khzf-15'>
            <span class='styles_sub_item__s3Aiz'>Comercios</span>
            <span class='styles_sub_item_data__kKr1_'>Ver listado completo</span>
            <p onclick='openStores()'>Ver listado completo</p>
        </div>
        <div id='stores'></div>
        <script>
        function openStores() {
            document.getElementById('stores').innerHTML =
                "<section data-testid='participating-stores-list'>" +
                "<p data-testid='store-name'>Store A</p>" +
                "<p data-testid='store-address'>Av. 1</p>" +
                "</section>";
        }
        </script>
        </body></html>"#;
    let record = extract(&browser, &tab, &data_url(html)).expect("extract record");

    assert_eq!(record.comercios.as_deref(), Some("Ver listado completo"));
    assert_eq!(record.store_names, Some(vec!["Store A".to_string()]));
    assert_eq!(record.store_addresses, Some(vec!["Av. 1".to_string()]));
}

#[test]
#[ignore = "requires Chrome"]
fn test_batch_failure_propagates_and_session_recycles() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let urls = vec![
        data_url("<html><body><h1>Uno</h1></body></html>"),
        // Chrome rejects the navigation outright.
        "not-a-url".to_string(),
        data_url("<html><body><h1>Tres</h1></body></html>"),
    ];

    let result = build_batch(&urls, true, &mut NullProgress);
    assert!(result.is_err());

    // The failed batch dropped its session; a fresh one must come up clean.
    let browser = Browser::new(true).expect("launch browser after failed batch");
    let tab = browser.new_tab().expect("open tab after failed batch");
    let record = extract(&browser, &tab, &data_url("<html><body><h1>Otra</h1></body></html>"))
        .expect("extract after failed batch");
    assert_eq!(record.titulo.as_deref(), Some("Otra"));
}
