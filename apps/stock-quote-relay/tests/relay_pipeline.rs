//! Relay Pipeline Integration Tests
//!
//! Drives `RelayService` end to end: mock provider over HTTP, real client,
//! in-memory publisher.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stock_quote_relay::{
    AlphaVantageClient, Credentials, ErrorPolicy, InMemoryQuotePublisher, ProviderSettings,
    QuotePublisherPort, QuoteRecord, RelayService, RelaySettings, RunOutcome, Ticker,
};

fn series(rows: &[(&str, &str)]) -> String {
    let entries: Vec<String> = rows
        .iter()
        .map(|(datetime, price)| {
            format!(
                r#""{datetime}": {{"1. open": "{price}", "2. high": "11.0", "3. low": "9.5", "4. close": "10.5", "5. volume": "1000"}}"#
            )
        })
        .collect();
    format!(r#"{{"Time Series (1min)": {{{}}}}}"#, entries.join(","))
}

async fn mount_symbol(server: &MockServer, symbol: &str, body: String) {
    Mock::given(method("GET"))
        .and(query_param("symbol", symbol))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(server)
        .await;
}

struct Harness {
    relay: Arc<RelayService>,
    publisher: Arc<InMemoryQuotePublisher>,
    cancel: CancellationToken,
}

fn harness(server: &MockServer, tickers: &[&str], error_policy: ErrorPolicy) -> Harness {
    let provider = ProviderSettings {
        base_url: format!("{}/query", server.uri()),
        request_timeout: Duration::from_secs(5),
        ..ProviderSettings::default()
    };
    let source =
        Arc::new(AlphaVantageClient::new(&provider, &Credentials::new("test-key".to_string())).unwrap());
    let publisher = Arc::new(InMemoryQuotePublisher::new());
    let cancel = CancellationToken::new();

    let settings = RelaySettings {
        tickers: tickers.iter().map(|s| Ticker::parse(s).unwrap()).collect(),
        topic: "stocks".to_string(),
        interval: Duration::from_secs(3600),
        error_policy,
    };

    let relay = RelayService::new(
        source,
        Arc::clone(&publisher) as Arc<dyn QuotePublisherPort>,
        settings,
        cancel.clone(),
    );

    Harness {
        relay: Arc::new(relay),
        publisher,
        cancel,
    }
}

async fn wait_for_messages(publisher: &InMemoryQuotePublisher, count: usize) {
    timeout(Duration::from_secs(5), async {
        while publisher.len() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("messages were not published in time");
}

#[tokio::test]
async fn newest_bar_is_published_as_json_record() {
    let server = MockServer::start().await;
    mount_symbol(
        &server,
        "MSFT",
        series(&[("2024-01-01 00:00:00", "10.0"), ("2023-12-31 23:59:00", "9.0")]),
    )
    .await;
    let h = harness(&server, &["MSFT"], ErrorPolicy::FailFast);

    let report = h.relay.run_cycle().await.unwrap();

    assert_eq!(report.published, 1);
    let messages = h.publisher.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].topic, "stocks");
    assert_eq!(
        messages[0].json().unwrap(),
        json!({
            "ticker": "MSFT",
            "timestamp": 1_704_067_200,
            "open": "10.0",
            "high": "11.0",
            "low": "9.5",
            "close": "10.5",
            "volume": "1000"
        })
    );

    let record: QuoteRecord = serde_json::from_slice(&messages[0].payload).unwrap();
    assert_eq!(record.ticker.as_str(), "MSFT");
}

#[tokio::test]
async fn tickers_are_published_in_configured_order() {
    let server = MockServer::start().await;
    for symbol in ["CTSH", "MSFT", "GOOGL"] {
        mount_symbol(&server, symbol, series(&[("2024-01-02 15:00:00", "1.0")])).await;
    }
    let h = harness(&server, &["CTSH", "MSFT", "GOOGL"], ErrorPolicy::FailFast);

    h.relay.run_cycle().await.unwrap();

    let order: Vec<String> = h
        .publisher
        .messages()
        .iter()
        .map(|m| m.json().unwrap()["ticker"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(order, vec!["CTSH", "MSFT", "GOOGL"]);
}

#[tokio::test]
async fn interrupt_during_sleep_ends_run_cleanly() {
    let server = MockServer::start().await;
    for symbol in ["CTSH", "MSFT", "GOOGL"] {
        mount_symbol(&server, symbol, series(&[("2024-01-02 15:00:00", "1.0")])).await;
    }
    let h = harness(&server, &["CTSH", "MSFT", "GOOGL"], ErrorPolicy::FailFast);

    let relay = Arc::clone(&h.relay);
    let handle = tokio::spawn(async move { relay.run().await });

    wait_for_messages(&h.publisher, 3).await;
    h.cancel.cancel();

    let outcome = timeout(Duration::from_secs(2), handle)
        .await
        .expect("relay did not stop after cancellation")
        .unwrap();

    assert_eq!(outcome.unwrap(), RunOutcome::Interrupted);
    assert_eq!(h.publisher.len(), 3);
    assert_eq!(h.relay.status().cycles_completed(), 1);
}

#[tokio::test]
async fn interrupt_during_fetch_abandons_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(series(&[("2024-01-02 15:00:00", "1.0")]), "application/json")
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;
    let h = harness(&server, &["MSFT"], ErrorPolicy::FailFast);

    let relay = Arc::clone(&h.relay);
    let handle = tokio::spawn(async move { relay.run().await });

    tokio::time::sleep(Duration::from_millis(200)).await;
    let started = std::time::Instant::now();
    h.cancel.cancel();

    let outcome = timeout(Duration::from_secs(2), handle)
        .await
        .expect("relay kept waiting on the provider after cancellation")
        .unwrap();

    assert_eq!(outcome.unwrap(), RunOutcome::Interrupted);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(h.publisher.is_empty());
    assert_eq!(h.relay.status().cycles_completed(), 0);
}

#[tokio::test]
async fn fail_fast_run_returns_provider_error() {
    let server = MockServer::start().await;
    mount_symbol(&server, "CTSH", series(&[("2024-01-02 15:00:00", "1.0")])).await;
    mount_symbol(
        &server,
        "MSFT",
        r#"{"Error Message": "Invalid API call."}"#.to_string(),
    )
    .await;
    let h = harness(&server, &["CTSH", "MSFT"], ErrorPolicy::FailFast);

    let err = timeout(Duration::from_secs(5), h.relay.run())
        .await
        .unwrap()
        .unwrap_err();

    assert_eq!(err.stage(), "fetch");
    assert_eq!(err.ticker().as_str(), "MSFT");
    assert_eq!(h.publisher.len(), 1);
}

#[tokio::test]
async fn isolate_skips_failing_ticker_and_keeps_going() {
    let server = MockServer::start().await;
    mount_symbol(
        &server,
        "CTSH",
        r#"{"Note": "API call frequency exceeded."}"#.to_string(),
    )
    .await;
    mount_symbol(&server, "MSFT", series(&[("2024-01-02 15:00:00", "1.0")])).await;
    let h = harness(&server, &["CTSH", "MSFT"], ErrorPolicy::Isolate);

    let report = h.relay.run_cycle().await.unwrap();

    assert_eq!(report.published, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0.as_str(), "CTSH");

    let snapshot = h.relay.status().snapshot();
    assert_eq!(snapshot.tickers["CTSH"].errors, 1);
    assert_eq!(snapshot.tickers["MSFT"].published, 1);
    assert_eq!(snapshot.cycles_completed, 1);
}

#[tokio::test]
async fn empty_series_is_normalize_error() {
    let server = MockServer::start().await;
    mount_symbol(&server, "MSFT", r#"{"Time Series (1min)": {}}"#.to_string()).await;
    let h = harness(&server, &["MSFT"], ErrorPolicy::FailFast);

    let err = h.relay.run_cycle().await.unwrap_err();

    assert_eq!(err.stage(), "normalize");
    assert!(h.publisher.is_empty());
}
