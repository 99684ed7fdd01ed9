mod common;

use cat_viewer::cat_api::normalize_tags;
use cat_viewer::types::*;
use cat_viewer::CatApi;
use common::{init_tracing, serve_once, TEST_BASE_URL};
use percent_encoding::percent_decode_str;
use proptest::prelude::*;
use serde_json::{json, Value};

fn api() -> CatApi {
    CatApi::with_client(reqwest::Client::new(), TEST_BASE_URL).expect("valid base url")
}

fn timestamp_of(url: &url::Url) -> i64 {
    url.query_pairs()
        .find(|(k, _)| k == "timestamp")
        .and_then(|(_, v)| v.parse().ok())
        .expect("timestamp query parameter")
}

fn is_sorted(tags: &[String]) -> bool {
    tags.windows(2)
        .all(|w| cat_viewer::utils::text::locale_cmp(&w[0], &w[1]) != std::cmp::Ordering::Greater)
}

#[test]
fn plain_request_uses_gif_path() {
    let url = api().build_gif_url(&MediaRequest::empty());

    assert_eq!(url.host_str(), Some("cats.test"));
    assert_eq!(url.path(), "/cat/gif");
    let keys: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
    assert_eq!(keys, vec!["timestamp".to_string()]);
}

#[test]
fn tag_and_caption_are_trimmed_and_placed() {
    let url = api().build_gif_url(&MediaRequest::new("  sleepy ", "  hello world  "));

    assert_eq!(url.path(), "/cat/gif/says/hello%20world");
    let tag = url.query_pairs().find(|(k, _)| k == "tag").map(|(_, v)| v.into_owned());
    assert_eq!(tag.as_deref(), Some("sleepy"));
}

#[test]
fn whitespace_only_fields_are_ignored() {
    let url = api().build_gif_url(&MediaRequest::new("   ", "\t "));

    assert_eq!(url.path(), "/cat/gif");
    assert!(url.query_pairs().all(|(k, _)| k != "tag"));
}

#[test]
fn base_path_and_trailing_slash_are_kept_once() {
    let api = CatApi::with_client(reqwest::Client::new(), "http://localhost:8080/proxy/?x=1")
        .expect("valid base url");
    let url = api.build_gif_url(&MediaRequest::new("", "hi"));

    assert_eq!(url.path(), "/proxy/cat/gif/says/hi");
    assert!(url.query_pairs().all(|(k, _)| k != "x"));
}

#[test]
fn timestamps_strictly_increase_for_identical_requests() {
    let api = api();
    let request = MediaRequest::new("cute", "");

    let stamps: Vec<i64> = (0..50).map(|_| timestamp_of(&api.build_gif_url(&request))).collect();

    assert!(stamps.windows(2).all(|w| w[1] > w[0]), "{:?}", stamps);
}

#[test]
fn timestamp_tracks_the_wall_clock() {
    let before = chrono::Utc::now().timestamp_millis();
    let stamp = timestamp_of(&api().build_gif_url(&MediaRequest::empty()));

    assert!(stamp >= before);
}

#[test]
fn reserved_characters_in_caption_are_escaped() {
    let url = api().build_gif_url(&MediaRequest::new("", "a/b?c#d&e%f"));

    assert_eq!(url.path(), "/cat/gif/says/a%2Fb%3Fc%23d%26e%25f");
    assert!(url.fragment().is_none());
}

#[test]
fn normalize_handles_mixed_entries() {
    let raw = vec![
        json!("  zebra "),
        json!(""),
        json!("Apple"),
        json!("   "),
        json!(null),
        json!("banana"),
        json!(42),
        json!("banana"),
    ];

    let tags = normalize_tags(raw);

    assert_eq!(tags, vec!["42", "Apple", "banana", "banana", "zebra"]);
}

#[test]
fn tags_differing_only_in_case_put_lowercase_first() {
    let tags = normalize_tags(vec![json!("Cute"), json!("cute"), json!("CUTE"), json!("angry")]);

    assert_eq!(tags, vec!["angry", "cute", "Cute", "CUTE"]);
}

#[test]
fn accented_tags_are_not_folded() {
    let tags = normalize_tags(vec![json!("émo"), json!("zebra"), json!("emo")]);

    assert_eq!(tags, vec!["emo", "zebra", "émo"]);
}

#[test]
fn normalize_of_nothing_is_empty() {
    assert!(normalize_tags(Vec::new()).is_empty());
}

proptest! {
    #[test]
    fn caption_round_trips_through_the_path(caption in "\\PC{0,30}") {
        prop_assume!(!matches!(caption.trim(), "." | ".."));
        let api = api();
        let request = MediaRequest::new("", &caption);
        let url = api.build_gif_url(&request);

        match request.caption() {
            Some(expected) => {
                let encoded = url.path().strip_prefix("/cat/gif/says/").expect("caption path");
                let decoded = percent_decode_str(encoded).decode_utf8().expect("utf8");
                prop_assert_eq!(&*decoded, expected);
                prop_assert_eq!(expected, caption.trim());
            }
            None => {
                prop_assert_eq!(url.path(), "/cat/gif");
            }
        }
    }

    #[test]
    fn normalized_tags_are_sorted_and_non_empty(raw in proptest::collection::vec("[ a-zA-Z]{0,8}", 0..40)) {
        let values: Vec<Value> = raw.iter().map(|s| Value::String(s.clone())).collect();
        let tags = normalize_tags(values);

        prop_assert!(tags.iter().all(|t| !t.is_empty() && t.trim() == t));
        prop_assert!(is_sorted(&tags));
        let expected = raw.iter().filter(|s| !s.trim().is_empty()).count();
        prop_assert_eq!(tags.len(), expected);
    }
}

#[tokio::test]
async fn list_tags_fetches_and_sorts() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let body = br#"["sleepy", " cute ", "", "Angry", "cute"]"#.to_vec();
    let (base_url, request) = serve_once("200 OK", "application/json", body).await?;

    let api = CatApi::with_client(reqwest::Client::new(), &base_url)?;
    let tags = api.list_tags().await?;

    assert_eq!(tags, vec!["Angry", "cute", "cute", "sleepy"]);

    let request = request.await?.to_ascii_lowercase();
    assert!(request.starts_with("get /api/tags "), "{}", request);
    assert!(request.contains("cache-control: no-store"), "{}", request);
    Ok(())
}

#[tokio::test]
async fn list_tags_treats_null_as_empty() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (base_url, _request) = serve_once("200 OK", "application/json", b"null".to_vec()).await?;

    let api = CatApi::with_client(reqwest::Client::new(), &base_url)?;

    assert!(api.list_tags().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn list_tags_fails_on_error_status() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (base_url, _request) =
        serve_once("503 Service Unavailable", "text/plain", b"down".to_vec()).await?;

    let api = CatApi::with_client(reqwest::Client::new(), &base_url)?;

    match api.list_tags().await {
        Err(ViewerError::Fetch { status }) => assert_eq!(status, 503),
        other => panic!("expected fetch error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn list_tags_rejects_malformed_json() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (base_url, _request) =
        serve_once("200 OK", "application/json", b"<html>".to_vec()).await?;

    let api = CatApi::with_client(reqwest::Client::new(), &base_url)?;

    assert!(matches!(api.list_tags().await, Err(ViewerError::Serialization(_))));
    Ok(())
}

#[test]
fn dot_segment_captions_fall_back_to_plain_path() {
    assert_eq!(api().build_gif_url(&MediaRequest::new("", "..")).path(), "/cat/gif");
    assert_eq!(api().build_gif_url(&MediaRequest::new("", "...")).path(), "/cat/gif/says/...");
}

#[test]
fn rejects_unusable_base_url() {
    assert!(matches!(
        CatApi::with_client(reqwest::Client::new(), "not a url"),
        Err(ViewerError::InvalidUrl(_))
    ));
    assert!(matches!(
        CatApi::with_client(reqwest::Client::new(), "mailto:cats@example.com"),
        Err(ViewerError::General(_))
    ));
}
