//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the shop and its search API
//! and run complete harvests end-to-end.

use listing_harvest::config::{Config, CountSetting, SourceMode, Strategy};
use listing_harvest::crawler::{harvest, HttpFetcher};
use listing_harvest::output::{JsonLinesSink, MemorySink, SqliteSink};
use listing_harvest::state::StopReason;
use listing_harvest::{HarvestError, RunPhase};
use rusqlite::Connection;
use std::collections::HashSet;
use std::sync::Arc;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(origin: &str, results: i64, max_pages: i64, strategy: Strategy) -> Config {
    let mut config = Config::default();
    config.source.origin = origin.to_string();
    config.input.results_wanted = Some(CountSetting::Integer(results));
    config.input.max_pages = Some(CountSetting::Integer(max_pages));
    config.crawler.strategy = Some(strategy);
    config.crawler.request_delay_ms = 0;
    config.crawler.retry_delay_ms = 0;
    config.crawler.list_timeout_secs = 5;
    config.crawler.detail_timeout_secs = 5;
    config
}

fn product_card(id: u32) -> String {
    format!(
        r#"<div class="md:p-4">
            <img data-src="/images/product-{id}.jpg?w=200" alt="">
            <a class="hover:underline" href="/p/{id}">Oak Sofa {id}</a>
            <p>by Acme</p>
            <span>$499.00</span>
        </div>"#,
        id = id
    )
}

fn search_page(ids: &[u32]) -> String {
    let cards: String = ids.iter().map(|id| product_card(*id)).collect();
    format!("<html><body><main>{}</main></body></html>", cards)
}

fn detail_page(id: &str) -> String {
    format!(
        r#"<html><body>
            <h1>Oak Sofa {id} (Detail)</h1>
            <a class="u-link" href="/brand/acme">Acme Furniture</a>
            <span class="product-price">$899.00 $1199.00</span>
            <div class="rating">4.6 out of 5</div>
            <span class="review-count">128 reviews</span>
            <div id="product-description"><p>Solid oak frame.</p></div>
        </body></html>"#,
        id = id
    )
}

/// Mounts HTML search pages; `pages[0]` is served when no page parameter is present
async fn mount_search_pages(server: &MockServer, pages: &[Vec<u32>]) {
    for (index, ids) in pages.iter().enumerate() {
        let page = index + 1;
        let mock = Mock::given(method("GET")).and(path("/search"));
        let mock = if page == 1 {
            mock.respond_with(ResponseTemplate::new(200).set_body_string(search_page(ids)))
                .with_priority(10)
        } else {
            mock.and(query_param("page", page.to_string()))
                .respond_with(ResponseTemplate::new(200).set_body_string(search_page(ids)))
                .with_priority(1)
        };
        mock.mount(server).await;
    }
}

async fn mount_detail_pages(server: &MockServer) {
    for id in 1..=40 {
        Mock::given(method("GET"))
            .and(path(format!("/p/{}", id)))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(detail_page(&id.to_string())),
            )
            .with_priority(5)
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn test_html_harvest_with_details() {
    let server = MockServer::start().await;
    mount_search_pages(&server, &[vec![1, 2, 3], vec![3, 4], vec![]]).await;
    mount_detail_pages(&server).await;

    let config = create_test_config(&server.uri(), 20, 5, Strategy::Sequential);
    let fetcher = HttpFetcher::new(&config.crawler, None).unwrap();
    let sink = MemorySink::new();
    let mut handle = sink.clone();

    let summary = harvest(config, Arc::new(fetcher), &mut handle)
        .await
        .unwrap();

    assert_eq!(summary.final_phase, RunPhase::Done);
    assert_eq!(summary.stop_reason, Some(StopReason::EmptyPage));
    assert_eq!(summary.pages_fetched, 3);
    assert_eq!(summary.saved, 4);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.detail_failures, 0);

    let records = sink.records();
    assert_eq!(records.len(), 4);

    let first = &records[0];
    assert_eq!(first.url, format!("{}/p/1", server.uri()));
    assert_eq!(first.title.as_deref(), Some("Oak Sofa 1 (Detail)"));
    assert_eq!(first.brand.as_deref(), Some("Acme Furniture"));
    assert_eq!(first.price.as_deref(), Some("$899.00"));
    assert_eq!(first.original_price.as_deref(), Some("$1199.00"));
    assert_eq!(first.rating, Some(4.6));
    assert_eq!(first.review_count, Some(128));
    assert_eq!(first.description.as_deref(), Some("Solid oak frame."));
    assert_eq!(
        first.image_url.as_deref(),
        Some(format!("{}/images/product-1.jpg", server.uri()).as_str())
    );

    // finalize saw the same summary
    assert_eq!(sink.summary(), Some(summary));
}

#[tokio::test]
async fn test_api_harvest_follows_reported_total() {
    let server = MockServer::start().await;

    let page_one = serde_json::json!({
        "response": {
            "total_num_results": 3,
            "results": [
                { "value": "Velvet Sofa", "data": { "url": "/p/a1", "price": 799, "compare_at_price": 999, "brand": "Acme" } },
                { "value": "Linen Sofa", "data": { "url": "/p/a2", "price": "649.5" } }
            ]
        }
    });
    let page_two = serde_json::json!({
        "response": {
            "total_num_results": 3,
            "results": [
                { "value": "Leather Sofa", "data": { "url": "/p/a3", "price": 1299, "rating": 4.2, "review_count": 31 } },
                { "value": "", "data": { "url": "/p/a4" } }
            ]
        }
    });

    Mock::given(method("GET"))
        .and(path("/search/sofa"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_one))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/sofa"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_two))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri(), 50, 10, Strategy::Sequential);
    config.source.mode = SourceMode::Api;
    config.source.api_endpoint = format!("{}/search", server.uri());
    config.source.api_key = "key_test".to_string();
    config.source.page_size = 2;
    config.input.collect_details = false;

    let fetcher = HttpFetcher::new(&config.crawler, None).unwrap();
    let sink = MemorySink::new();
    let mut handle = sink.clone();

    let summary = harvest(config, Arc::new(fetcher), &mut handle)
        .await
        .unwrap();

    assert_eq!(summary.stop_reason, Some(StopReason::TotalPagesReached));
    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.saved, 3);
    assert_eq!(summary.malformed, 1);
    assert_eq!(summary.total_available, Some(3));

    let records = sink.records();
    assert_eq!(records[0].price.as_deref(), Some("$799.00"));
    assert_eq!(records[0].original_price.as_deref(), Some("$999.00"));
    assert_eq!(records[1].price.as_deref(), Some("$649.50"));
    assert_eq!(records[1].original_price, None);
    assert_eq!(records[2].review_count, Some(31));
    assert_eq!(records[2].url, format!("{}/p/a3", server.uri()));

    // Every search carries the same visitor id and a fresh sequence number
    let requests = server.received_requests().await.unwrap();
    let param = |index: usize, key: &str| -> Option<String> {
        requests[index]
            .url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    };
    assert_eq!(param(0, "key").as_deref(), Some("key_test"));
    assert_eq!(param(0, "s").as_deref(), Some("1"));
    assert_eq!(param(1, "s").as_deref(), Some("2"));
    assert!(param(0, "i").is_some());
    assert_eq!(param(0, "i"), param(1, "i"));
    assert_eq!(param(0, "num_results_per_page").as_deref(), Some("2"));
}

#[tokio::test]
async fn test_target_truncates_page() {
    let server = MockServer::start().await;
    mount_search_pages(&server, &[vec![1, 2, 3]]).await;

    let mut config = create_test_config(&server.uri(), 2, 5, Strategy::Sequential);
    config.input.collect_details = false;

    let fetcher = HttpFetcher::new(&config.crawler, None).unwrap();
    let mut sink = MemorySink::new();

    let summary = harvest(config, Arc::new(fetcher), &mut sink).await.unwrap();

    assert_eq!(summary.stop_reason, Some(StopReason::TargetReached));
    assert_eq!(summary.pages_fetched, 1);
    assert_eq!(sink.records().len(), 2);
}

#[tokio::test]
async fn test_pool_harvest_dedups_and_batches() {
    let server = MockServer::start().await;
    // Pages overlap by one product
    let pages: Vec<Vec<u32>> = (0..6u32)
        .map(|p| (p * 5 + 1..=p * 5 + 6).collect())
        .collect();
    mount_search_pages(&server, &pages).await;
    mount_detail_pages(&server).await;

    let config = create_test_config(&server.uri(), 25, 20, Strategy::Pool);
    let fetcher = HttpFetcher::new(&config.crawler, None).unwrap();
    let sink = MemorySink::new();
    let mut handle = sink.clone();

    let summary = harvest(config, Arc::new(fetcher), &mut handle)
        .await
        .unwrap();

    assert_eq!(summary.stop_reason, Some(StopReason::TargetReached));
    assert_eq!(summary.saved, 25);
    assert!(summary.duplicates >= 4);

    let sizes: Vec<usize> = sink.batches().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![10, 10, 5]);

    let records = sink.records();
    let unique: HashSet<&str> = records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(unique.len(), 25);
    assert!(records
        .iter()
        .all(|r| r.title.as_deref().is_some_and(|t| t.ends_with("(Detail)"))));
}

#[tokio::test]
async fn test_detail_failure_keeps_list_fields() {
    let server = MockServer::start().await;
    mount_search_pages(&server, &[vec![1, 2, 3], vec![]]).await;

    Mock::given(method("GET"))
        .and(path("/p/2"))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/p/\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page("x")))
        .with_priority(5)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri(), 20, 5, Strategy::Sequential);
    config.crawler.max_attempts = 2;

    let fetcher = HttpFetcher::new(&config.crawler, None).unwrap();
    let mut sink = MemorySink::new();

    let summary = harvest(config, Arc::new(fetcher), &mut sink).await.unwrap();

    assert_eq!(summary.final_phase, RunPhase::Done);
    assert_eq!(summary.saved, 3);
    assert_eq!(summary.detail_failures, 1);

    let records = sink.records();
    let failed = records
        .iter()
        .find(|r| r.url.ends_with("/p/2"))
        .unwrap();
    assert_eq!(failed.title.as_deref(), Some("Oak Sofa 2"));
    assert_eq!(failed.brand.as_deref(), Some("Acme"));
    assert_eq!(failed.price.as_deref(), Some("$499.00"));

    let enriched = records
        .iter()
        .find(|r| r.url.ends_with("/p/1"))
        .unwrap();
    assert_eq!(enriched.price.as_deref(), Some("$899.00"));
}

#[tokio::test]
async fn test_list_failure_aborts_and_flushes() {
    let server = MockServer::start().await;
    mount_search_pages(&server, &[vec![1, 2, 3]]).await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .with_priority(1)
        .expect(3)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri(), 20, 5, Strategy::Sequential);
    config.input.collect_details = false;
    config.crawler.max_attempts = 3;

    let fetcher = HttpFetcher::new(&config.crawler, None).unwrap();
    let mut sink = MemorySink::new();

    let summary = harvest(config, Arc::new(fetcher), &mut sink).await.unwrap();

    assert_eq!(summary.final_phase, RunPhase::Aborted);
    assert_eq!(summary.stop_reason, Some(StopReason::ListFetchFailed));
    assert_eq!(summary.saved, 3);
    assert_eq!(sink.batches().len(), 1);
    assert!(summary.failure.as_deref().unwrap_or("").contains("503"));

    match summary.abort_error() {
        Some(HarvestError::Aborted { page, .. }) => assert_eq!(page, 2),
        other => panic!("expected abort error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sqlite_sink_end_to_end() {
    let server = MockServer::start().await;
    mount_search_pages(&server, &[vec![1, 2, 3, 4, 5, 6], vec![6, 7, 8, 9, 10, 11]]).await;

    let mut config = create_test_config(&server.uri(), 12, 2, Strategy::Sequential);
    config.input.collect_details = false;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("products.db");

    let fetcher = HttpFetcher::new(&config.crawler, None).unwrap();
    let mut sink = SqliteSink::open(&db_path, "test-hash").unwrap();

    let summary = harvest(config, Arc::new(fetcher), &mut sink).await.unwrap();
    drop(sink);

    assert_eq!(summary.saved, 11);
    assert_eq!(summary.stop_reason, Some(StopReason::PageCapReached));

    let conn = Connection::open(&db_path).unwrap();
    let products: i64 = conn
        .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
        .unwrap();
    assert_eq!(products, 11);

    let max_batch: i64 = conn
        .query_row("SELECT MAX(batch_no) FROM products", [], |row| row.get(0))
        .unwrap();
    assert_eq!(max_batch, 2);

    let (status, saved, hash): (String, i64, String) = conn
        .query_row(
            "SELECT status, saved, config_hash FROM runs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(status, "done");
    assert_eq!(saved, 11);
    assert_eq!(hash, "test-hash");
}

#[tokio::test]
async fn test_jsonl_sink_end_to_end() {
    let server = MockServer::start().await;
    mount_search_pages(&server, &[vec![1, 2], vec![]]).await;

    let mut config = create_test_config(&server.uri(), 20, 5, Strategy::Pool);
    config.input.collect_details = false;

    let fetcher = HttpFetcher::new(&config.crawler, None).unwrap();
    let mut sink = JsonLinesSink::new(Vec::new());

    let summary = harvest(config, Arc::new(fetcher), &mut sink).await.unwrap();
    assert_eq!(summary.saved, 2);
    assert_eq!(sink.written(), 2);

    let output = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<serde_json::Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["title"], "Oak Sofa 1");
    assert_eq!(lines[0]["price"], "$499.00");
    assert!(lines[0]["url"].as_str().unwrap().ends_with("/p/1"));
}

fn api_test_config(server: &MockServer, page_size: u32) -> Config {
    let mut config = create_test_config(&server.uri(), 50, 10, Strategy::Sequential);
    config.source.mode = SourceMode::Api;
    config.source.api_endpoint = format!("{}/search", server.uri());
    config.source.api_key = "key_test".to_string();
    config.source.page_size = page_size;
    config.input.collect_details = false;
    config
}

fn api_page(total: u64, ids: &[u32]) -> serde_json::Value {
    let results: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "value": format!("Sofa {}", id),
                "data": { "url": format!("/p/{}", id), "price": 500 + id }
            })
        })
        .collect();
    serde_json::json!({ "response": { "total_num_results": total, "results": results } })
}

/// Sequence numbers of the search requests the server saw, in order
async fn sequences(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter_map(|request| {
            request
                .url
                .query_pairs()
                .find(|(k, _)| k == "s")
                .map(|(_, v)| v.into_owned())
        })
        .collect()
}

#[tokio::test]
async fn test_unparseable_list_body_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/sofa"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/sofa"))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_page(2, &[1, 2])))
        .with_priority(5)
        .mount(&server)
        .await;

    let config = api_test_config(&server, 24);
    let fetcher = HttpFetcher::new(&config.crawler, None).unwrap();
    let mut sink = MemorySink::new();

    let summary = harvest(config, Arc::new(fetcher), &mut sink).await.unwrap();

    assert_eq!(summary.final_phase, RunPhase::Done);
    assert_eq!(summary.stop_reason, Some(StopReason::TotalPagesReached));
    assert_eq!(summary.pages_fetched, 1);
    assert_eq!(summary.saved, 2);

    // The retry is a new search and takes the next sequence number
    assert_eq!(sequences(&server).await, vec!["1", "2"]);
}

#[tokio::test]
async fn test_unparseable_list_body_exhausts_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/sofa"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(api_page(100, &[1, 2])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/sofa"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"response\": "))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = api_test_config(&server, 2);
    config.crawler.max_attempts = 3;

    let fetcher = HttpFetcher::new(&config.crawler, None).unwrap();
    let mut sink = MemorySink::new();

    let summary = harvest(config, Arc::new(fetcher), &mut sink).await.unwrap();

    assert_eq!(summary.final_phase, RunPhase::Aborted);
    assert_eq!(summary.stop_reason, Some(StopReason::ListFetchFailed));
    assert_eq!(summary.pages_fetched, 1);
    assert_eq!(summary.saved, 2);
    assert_eq!(sink.batches().len(), 1);
    assert!(summary
        .failure
        .as_deref()
        .unwrap_or("")
        .contains("Malformed JSON"));

    assert_eq!(sequences(&server).await, vec!["1", "2", "3", "4"]);
}
