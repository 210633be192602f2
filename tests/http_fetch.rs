use std::time::Duration;

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ozon_tracker::config::ScrapeConfig;
use ozon_tracker::{FetchError, HttpFetcher, PageFetcher, Paginator, ScrapeContext, StopReason};

fn context_for(server: &MockServer, timeout_secs: u64) -> ScrapeContext {
    let config = ScrapeConfig {
        base_url: server.uri(),
        timeout_secs,
        ..ScrapeConfig::default()
    };
    ScrapeContext::from_config(&config)
        .unwrap()
        .with_page_delay(Duration::ZERO)
}

const PAGE_ONE: &str = r#"
    <html><body>
    <div data-widget="searchResultsV2">
        <a data-widget="searchResultV2" title="Ноутбук A" href="/product/a/"></a>
        <span class="tsHeadline500Medium">45 990 ₽</span>
        <span class="tsBodyControl400Small">4,8</span>
    </div>
    <div data-widget="searchResultsV2">
        <span class="tsBody500Medium">Без цены</span>
    </div>
    <div data-widget="searchResultsV2">
        <a data-widget="searchResultV2" title="Ноутбук B" href="/product/b/"></a>
        <span class="tsHeadline500Medium">61 500 ₽</span>
    </div>
    </body></html>
"#;

#[tokio::test]
async fn fetch_returns_the_body_and_sends_browser_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(header_exists("user-agent"))
        .and(header_exists("accept-language"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context_for(&server, 5);
    let fetcher = HttpFetcher::new(&ctx).unwrap();
    let body = fetcher.fetch(&ctx.page_url("x", 1)).await.unwrap();

    assert_eq!(body, "<html>ok</html>");
}

#[tokio::test]
async fn empty_success_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let ctx = context_for(&server, 5);
    let fetcher = HttpFetcher::new(&ctx).unwrap();

    assert_eq!(fetcher.fetch(&ctx.page_url("x", 1)).await.unwrap(), "");
}

#[tokio::test]
async fn non_success_status_is_a_fetch_error_with_the_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let ctx = context_for(&server, 5);
    let fetcher = HttpFetcher::new(&ctx).unwrap();
    let url = ctx.page_url("x", 2);

    let err = fetcher.fetch(&url).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status, .. } if status.as_u16() == 403));
    assert_eq!(err.url(), url);
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let ctx = context_for(&server, 1);
    let fetcher = HttpFetcher::new(&ctx).unwrap();

    let err = fetcher.fetch(&ctx.page_url("x", 1)).await.unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }));
}

#[tokio::test]
async fn two_page_run_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("text", "ноутбуки"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_ONE))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context_for(&server, 5);
    let fetcher = HttpFetcher::new(&ctx).unwrap();
    let paginator = Paginator::new(fetcher, ctx);

    let run = paginator
        .collect("ноутбуки", 5, &CancellationToken::new())
        .await;

    assert_eq!(run.len(), 2);
    assert_eq!(run.pages_fetched, 2);
    assert_eq!(run.stop, StopReason::EmptyPage(2));

    let first = &run.records[0];
    assert_eq!(first.title, "Ноутбук A");
    assert_eq!(first.current_price, 45990);
    assert_eq!(first.rating, Some(4.8));
    assert_eq!(first.url.as_deref(), Some(format!("{}/product/a/", server.uri()).as_str()));
}
