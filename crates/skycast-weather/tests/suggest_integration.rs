//! Debounced suggestion behaviour against a mock geocoder.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{client_for, geocode_json, service_for};
use skycast_weather::SearchSuggester;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn suggester_for(server: &MockServer, delay_ms: u64) -> Arc<SearchSuggester> {
    Arc::new(SearchSuggester::new(
        client_for(server),
        Duration::from_millis(delay_ms),
    ))
}

#[tokio::test]
async fn test_rapid_keystrokes_send_one_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/direct"))
        .and(query_param("q", "Par"))
        .respond_with(ResponseTemplate::new(200).set_body_json(geocode_json(&["Paris", "Parma"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(geocode_json(&[])))
        .expect(0)
        .mount(&server)
        .await;

    let suggester = suggester_for(&server, 100);
    let mut pending = Vec::new();
    for query in ["P", "Pa", "Par"] {
        let suggester = suggester.clone();
        pending.push(tokio::spawn(async move { suggester.suggest(query, 5).await }));
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let mut results = Vec::new();
    for task in pending {
        results.push(task.await.unwrap());
    }

    assert!(results[0].is_empty());
    assert!(results[1].is_empty());
    assert_eq!(results[2].len(), 2);
    assert_eq!(suggester.current(), results[2]);
}

#[tokio::test]
async fn test_typing_within_debounce_window_sends_last_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/direct"))
        .and(query_param("q", "Lond"))
        .respond_with(ResponseTemplate::new(200).set_body_json(geocode_json(&["London"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(geocode_json(&[])))
        .expect(0)
        .mount(&server)
        .await;

    let suggester = suggester_for(&server, 150);
    let mut pending = Vec::new();
    for query in ["Lo", "Lon", "Lond"] {
        let suggester = suggester.clone();
        pending.push(tokio::spawn(async move { suggester.suggest(query, 5).await }));
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    let mut results = Vec::new();
    for task in pending {
        results.push(task.await.unwrap());
    }

    assert!(results[0].is_empty());
    assert!(results[1].is_empty());
    assert_eq!(results[2].len(), 1);
    assert_eq!(suggester.current()[0].name, "London");
}

#[tokio::test]
async fn test_late_response_never_replaces_newer_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/direct"))
        .and(query_param("q", "Pa"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(geocode_json(&["Pamplona"]))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/direct"))
        .and(query_param("q", "Par"))
        .respond_with(ResponseTemplate::new(200).set_body_json(geocode_json(&["Paris"])))
        .mount(&server)
        .await;

    let suggester = suggester_for(&server, 50);
    let stale = {
        let suggester = suggester.clone();
        tokio::spawn(async move { suggester.suggest("Pa", 5).await })
    };

    // "Pa" has left the debounce window and is waiting on the provider
    tokio::time::sleep(Duration::from_millis(100)).await;
    let fresh = suggester.suggest("Par", 5).await;

    assert_eq!(fresh[0].name, "Paris");
    assert!(stale.await.unwrap().is_empty());
    assert_eq!(suggester.current(), fresh);
}

#[tokio::test]
async fn test_short_query_sends_nothing_and_clears() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/direct"))
        .and(query_param("q", "Rome"))
        .respond_with(ResponseTemplate::new(200).set_body_json(geocode_json(&["Rome"])))
        .expect(1)
        .mount(&server)
        .await;

    let suggester = suggester_for(&server, 20);
    assert_eq!(suggester.suggest("Rome", 5).await.len(), 1);
    assert_eq!(suggester.current().len(), 1);

    assert!(suggester.suggest("R", 5).await.is_empty());
    assert!(suggester.suggest("   ", 5).await.is_empty());
    assert!(suggester.current().is_empty());
}

#[tokio::test]
async fn test_cancel_abandons_pending_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(geocode_json(&["Berlin"])))
        .expect(0)
        .mount(&server)
        .await;

    let suggester = suggester_for(&server, 200);
    let pending = {
        let suggester = suggester.clone();
        tokio::spawn(async move { suggester.suggest("Berlin", 5).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    suggester.cancel();

    assert!(pending.await.unwrap().is_empty());
    assert!(suggester.current().is_empty());
}

#[tokio::test]
async fn test_submit_search_clears_suggestions() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(geocode_json(&["Kyoto"])))
        .mount(&server)
        .await;

    let service = service_for(&server);
    let mut visible = service.suggester().subscribe();

    assert_eq!(service.suggest("Kyo", None).await.len(), 1);
    assert_eq!(visible.borrow_and_update().len(), 1);

    assert!(service.submit_search("Kyoto"));
    assert!(visible.borrow_and_update().is_empty());
    assert!(service.locations().searched().contains(&"Kyoto".to_string()));
}
