mod common;

use axum::http::StatusCode;
use common::{from_peer, get, post_json, send, test_app, FakeGenerator};
use serde_json::json;
use std::sync::Arc;
use story_server::config::Settings;
use story_server::generator::ImageModel;

#[tokio::test]
async fn image_generation_wraps_url_in_html() {
    let generator = Arc::new(FakeGenerator::default());
    let (app, _) = test_app(Settings::default(), generator.clone());
    let body = json!({ "prompt": "a happy <rainbow> cat", "size": "512x512", "lang": "fr" });
    let (status, _, json) = send(&app, post_json("/generate", body)).await;
    assert_eq!(status, StatusCode::OK);

    let code = json["code"].as_str().unwrap();
    assert!(code.starts_with("<!-- Respond in French -->"));
    assert!(code.contains("https://images.example/cat.png"));
    assert!(code.contains("a happy &lt;rainbow&gt; cat"));
    assert_eq!(json["metadata"]["model"], "dall-e-2");
    assert_eq!(json["metadata"]["size"], "256x256");
    assert_eq!(json["metadata"]["language"], "fr");

    let sent = generator.last_image.lock().clone().unwrap();
    assert_eq!((sent.model, sent.size), (ImageModel::DallE2, "256x256"));
}

#[tokio::test]
async fn default_size_uses_detailed_model() {
    let generator = Arc::new(FakeGenerator::default());
    let (app, _) = test_app(Settings::default(), generator.clone());
    let (status, _, json) = send(&app, post_json("/generate", json!({ "prompt": "a magical castle in the clouds" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["metadata"]["model"], "dall-e-3");
    assert_eq!(json["metadata"]["language"], "en");
    assert!(!json["code"].as_str().unwrap().starts_with("<!--"));
}

#[tokio::test]
async fn invalid_requests_never_reach_the_generator() {
    let generator = Arc::new(FakeGenerator::default());
    let (app, _) = test_app(Settings::default(), generator.clone());
    let long = "a".repeat(1001);
    let bodies = [
        json!({}),
        json!({ "prompt": 42 }),
        json!({ "prompt": "   " }),
        json!({ "prompt": long }),
        json!({ "prompt": "a scary ghost" }),
        json!({ "prompt": "a cat", "size": "64x64" }),
        json!({ "prompt": "a cat", "lang": "de" }),
    ];
    for body in bodies {
        let (status, _, json) = send(&app, post_json("/generate", body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(json["code"].is_string(), "{body}");
        assert!(json.get("error").is_none(), "{body}");
    }
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn upstream_errors_become_friendly_html() {
    let (app, _) = test_app(Settings::default(), Arc::new(FakeGenerator::failing("insufficient_quota")));
    let (status, _, json) = send(&app, post_json("/generate", json!({ "prompt": "a sunny meadow" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["type"], "insufficient_quota");
    assert!(json["error"]["processingTime"].is_u64());
    assert!(json["code"].as_str().unwrap().contains("temporarily unavailable"));
}

#[tokio::test]
async fn code_generation_strips_fences() {
    let generator = Arc::new(FakeGenerator::replying("```html\n<button>Hi!</button>\n```"));
    let (app, _) = test_app(Settings::default(), generator.clone());
    let (status, _, json) = send(&app, post_json("/generate/code", json!({ "prompt": "a button that says hi", "lang": "es" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["code"], "<button>Hi!</button>");
    assert_eq!(json["metadata"]["model"], "gpt-4o-mini");
    assert!(generator.last_system.lock().as_deref().unwrap().contains("Respond in Spanish"));
}

#[tokio::test]
async fn generated_story_is_stored_and_searchable() {
    let reply = "# The Whale Who Sang\n\nWilma the whale sang to the moon.\n\nThe fish danced along.";
    let (app, state) = test_app(Settings::default(), Arc::new(FakeGenerator::replying(reply)));
    let (status, _, json) = send(&app, post_json("/stories", json!({ "prompt": "a kind whale", "theme": "ocean" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["story"]["title"], "The Whale Who Sang");
    assert_eq!(json["story"]["tags"], json!(["ocean", "en"]));
    assert!(json["code"].as_str().unwrap().contains("Wilma the whale"));
    assert_eq!(state.store.read().len(), 1);

    let (_, _, json) = send(&app, get("/stories/search?q=whale")).await;
    assert_eq!(json["results"][0]["story"]["title"], "The Whale Who Sang");

    let (status, _, _) = send(&app, post_json("/stories", json!({ "prompt": "a kind whale" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generation_is_rate_limited_per_peer() {
    let settings = Settings { rate_limit_max: 1, ..Settings::default() };
    let (app, _) = test_app(settings, Arc::new(FakeGenerator::default()));
    let request = |peer: &str, forwarded: &str| {
        let mut req = post_json("/generate", json!({ "prompt": "a sunny meadow" }));
        req.headers_mut().insert("x-forwarded-for", forwarded.parse().unwrap());
        from_peer(req, peer)
    };
    assert_eq!(send(&app, request("192.0.2.10:5000", "203.0.113.1")).await.0, StatusCode::OK);
    // A fresh X-Forwarded-For value does not buy a fresh quota.
    let (status, headers, json) = send(&app, request("192.0.2.10:5001", "203.0.113.2")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(headers.contains_key("retry-after"));
    assert!(json["code"].as_str().unwrap().contains("15 minutes"));
    assert_eq!(send(&app, request("192.0.2.11:5000", "203.0.113.1")).await.0, StatusCode::OK);

    // Reads are not limited.
    let search = from_peer(get("/stories/search?q=meadow"), "192.0.2.10:5002");
    assert_eq!(send(&app, search).await.0, StatusCode::OK);
}

#[tokio::test]
async fn trusted_proxy_limits_by_forwarded_client() {
    let settings = Settings { rate_limit_max: 1, trust_proxy: true, ..Settings::default() };
    let (app, _) = test_app(settings, Arc::new(FakeGenerator::default()));
    let request = |forwarded: &str| {
        let mut req = post_json("/generate", json!({ "prompt": "a sunny meadow" }));
        req.headers_mut().insert("x-forwarded-for", forwarded.parse().unwrap());
        from_peer(req, "10.0.0.1:443")
    };
    assert_eq!(send(&app, request("203.0.113.7")).await.0, StatusCode::OK);
    assert_eq!(send(&app, request("203.0.113.7, 10.0.0.1")).await.0, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(send(&app, request("203.0.113.8")).await.0, StatusCode::OK);
}
