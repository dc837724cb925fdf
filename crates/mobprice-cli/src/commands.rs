//! Command handlers for the CLI.
//!
//! `main` loads config and sets up logging, then dispatches here. Handlers
//! return strings rather than printing so they can be tested directly.

use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use mobprice_core::{OverlayConfig, PageKind};
use mobprice_overlay::{AnnotationReport, Lifecycle, LifecycleState, LivePage};
use mobprice_scraper::{extract_room_prices, extract_search_prices, Extraction, MobileClient};

/// Identity used when the CLI fetches the desktop rendering itself.
const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub(crate) fn classify(url: &str) -> PageKind {
    PageKind::classify(url)
}

/// Extracts deals for `url` from the mobile document (fetched, or read from
/// `html_file`) and renders them as pretty JSON.
///
/// # Errors
///
/// Returns an error if the page type is unsupported, the file cannot be read,
/// or the fetch fails.
pub(crate) async fn run_extract(
    config: &OverlayConfig,
    url: &str,
    html_file: Option<&Path>,
) -> anyhow::Result<String> {
    let kind = PageKind::classify(url);
    if !kind.is_supported() {
        anyhow::bail!("'{url}' is not a search results or property page");
    }

    let html = match html_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => MobileClient::from_config(config)?.fetch_mobile(url).await?,
    };

    let extraction = extract_for(kind, &html, config);
    let output = serde_json::json!({
        "page_kind": kind,
        "strategy": extraction.strategy.to_string(),
        "deals": extraction.index,
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

fn extract_for(kind: PageKind, html: &str, config: &OverlayConfig) -> Extraction {
    match kind {
        PageKind::Property => extract_room_prices(html, &config.selectors),
        _ => extract_search_prices(html, &config.selectors),
    }
}

/// Runs one lifecycle pass over the desktop document for `url` and writes
/// the annotated HTML to `out` (or stdout).
///
/// Must run inside a `tokio::task::LocalSet`.
///
/// # Errors
///
/// Returns an error if the desktop document cannot be loaded, the run does
/// not reach the annotated state, or the output cannot be written.
pub(crate) async fn run_annotate(
    config: OverlayConfig,
    url: &str,
    desktop_file: Option<&Path>,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let desktop = match desktop_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => fetch_desktop(url, config.network_timeout()).await?,
    };

    let (html, report) = annotate_document(config, url, &desktop).await?;
    tracing::info!(
        listings = report.listings,
        inserted = report.inserted,
        already_marked = report.already_marked,
        failed = report.failed,
        "annotation pass complete"
    );

    match out {
        Some(path) => std::fs::write(path, html)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{html}"),
    }
    Ok(())
}

/// Annotates `desktop_html` as the page at `url` and returns the resulting
/// document with the pass report.
///
/// # Errors
///
/// Returns an error if the run stops before [`LifecycleState::Annotated`].
pub(crate) async fn annotate_document(
    config: OverlayConfig,
    url: &str,
    desktop_html: &str,
) -> anyhow::Result<(String, AnnotationReport)> {
    let page = LivePage::parse(url, desktop_html);
    let client = MobileClient::from_config(&config)?;
    let lifecycle = Lifecycle::new(page.clone(), client, Rc::new(config));

    let state = lifecycle.run_to_annotated().await;
    if state != LifecycleState::Annotated {
        anyhow::bail!("overlay run for '{url}' stopped at state '{state}'");
    }
    let report = lifecycle.last_report().unwrap_or_default();
    Ok((page.to_html(), report))
}

async fn fetch_desktop(url: &str, timeout: Duration) -> anyhow::Result<String> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, DESKTOP_USER_AGENT)
        .send()
        .await
        .with_context(|| format!("failed to fetch desktop page {url}"))?
        .error_for_status()?;
    Ok(response.text().await?)
}
