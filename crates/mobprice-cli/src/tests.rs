use super::*;

use mobprice_core::{OverlayConfig, PageKind};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MOBILE_SEARCH: &str = r#"<html><body>
    <div data-testid="property-card">
      <div data-testid="title">Hotel A</div>
      <span data-testid="property-card-deal" aria-label="Mobile-only price">Mobile-only price</span>
      <span data-testid="price-and-discounted-price">$120</span>
    </div></body></html>"#;

const DESKTOP_SEARCH: &str = r#"<html><head></head><body>
    <div data-testid="property-card">
      <div data-testid="title">Hotel A</div>
      <div data-testid="price-box"><span data-testid="price-and-discounted-price">$200</span></div>
    </div></body></html>"#;

fn quick_config() -> OverlayConfig {
    OverlayConfig {
        initial_wait_ms: 0,
        network_timeout_ms: 2_000,
        ..OverlayConfig::default()
    }
}

#[test]
fn parses_classify_command() {
    let cli = Cli::try_parse_from(["mobprice", "classify", "https://www.booking.com/searchresults.html"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Classify { ref url } if url.ends_with("searchresults.html")
    ));
}

#[test]
fn parses_extract_with_html_file() {
    let cli = Cli::try_parse_from([
        "mobprice",
        "extract",
        "https://www.booking.com/hotel/il/x.html",
        "--html-file",
        "mobile.html",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Extract { html_file: Some(ref p), .. } if p.as_os_str() == "mobile.html"
    ));
}

#[test]
fn parses_annotate_defaults() {
    let cli = Cli::try_parse_from(["mobprice", "annotate", "https://www.booking.com/searchresults.html"])
        .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Annotate {
            desktop_file: None,
            out: None,
            ..
        }
    ));
}

#[test]
fn missing_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["mobprice"]).is_err());
}

#[test]
fn classify_reports_page_kind() {
    assert_eq!(
        commands::classify("https://www.booking.com/searchresults.html?ss=Eilat"),
        PageKind::Search
    );
    assert_eq!(
        commands::classify("https://www.booking.com/index.html").to_string(),
        "unknown"
    );
}

#[tokio::test]
async fn extract_reads_mobile_document_from_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/searchresults.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MOBILE_SEARCH))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/searchresults.html", server.uri());
    let json = commands::run_extract(&quick_config(), &url, None)
        .await
        .unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["page_kind"], "search");
    assert_eq!(value["strategy"], "markup");
    assert_eq!(value["deals"]["Hotel A"]["display_text"], "$120");
}

#[tokio::test]
async fn extract_rejects_unsupported_url() {
    let err = commands::run_extract(&quick_config(), "https://www.booking.com/", None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not a search results or property page"));
}

#[tokio::test]
async fn annotate_document_inserts_badge() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MOBILE_SEARCH))
        .mount(&server)
        .await;

    let url = format!("{}/searchresults.html", server.uri());
    let (html, report) = tokio::task::LocalSet::new()
        .run_until(commands::annotate_document(quick_config(), &url, DESKTOP_SEARCH))
        .await
        .unwrap();

    assert_eq!(report.inserted, 1);
    assert!(html.contains("mobile-price-badge"));
    assert!(html.contains("Mobile: $120"));
    assert!(html.contains("data-mobile-price-viewer"));
}

#[tokio::test]
async fn annotate_document_fails_when_fetch_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let url = format!("{}/searchresults.html", server.uri());
    let err = tokio::task::LocalSet::new()
        .run_until(commands::annotate_document(quick_config(), &url, DESKTOP_SEARCH))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("fetching"));
}
