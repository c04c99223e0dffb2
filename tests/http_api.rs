//! End-to-end tests over the HTTP surface with a canned text generator and
//! the keyless image provider. No external network is touched: the keyed
//! providers fail fast without keys and Pollinations builds its URL locally.

use std::sync::Arc;

use ootd_engine::client::CannedGenerator;
use ootd_engine::config::Config;
use ootd_engine::http::{AppState, build_router};
use serde_json::{Value, json};

async fn serve(state: AppState) -> String {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn state_with(responses: Vec<String>) -> AppState {
    let config = Config::default();
    let generator = Arc::new(CannedGenerator::new(responses));
    AppState::with_generator(config, generator).unwrap()
}

fn profile_json() -> Value {
    json!({
        "gender": "female",
        "religion": "hindu",
        "occasion": "wedding",
        "timeOfDay": "evening"
    })
}

fn valid_report_json() -> Value {
    json!({
        "upperWear": "Teal silk lehenga blouse",
        "lowerWear": "Embroidered teal lehenga skirt",
        "footwear": "Gold juttis",
        "accessories": ["Maang tikka", "Gold bangles", "Clutch"],
        "colors": ["Teal", "Gold"],
        "stylingTips": ["Keep the dupatta pinned"],
        "cultural": ["Lehenga suits a Hindu wedding"],
        "budget": {"premium": "INR 60,000+", "moderate": "INR 20,000", "budget": "INR 9,000"}
    })
}

#[tokio::test]
async fn questions_route_serves_sample_set_on_provider_garbage() {
    let base = serve(state_with(vec!["no json here".into()])).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/questions", base))
        .json(&profile_json())
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["source"], "sample");
    assert_eq!(body["questions"].as_array().unwrap().len(), 5);
    assert_eq!(body["questions"][0]["id"], "weather");
}

#[tokio::test]
async fn report_route_memoizes_until_regenerate() {
    let base = serve(state_with(vec![valid_report_json().to_string()])).await;
    let client = reqwest::Client::new();

    let mut form = profile_json();
    form["dynamicQuestions"] = json!([]);
    form["dynamicResponses"] = json!({});

    let first: Value = client
        .post(format!("{}/api/report", base))
        .json(&form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["cached"], false);
    assert_eq!(first["source"], "model");
    assert_eq!(first["report"]["upperWear"], "Teal silk lehenga blouse");

    let second: Value = client
        .post(format!("{}/api/report", base))
        .json(&form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["cached"], true);

    let mut regen = form.clone();
    regen["regenerate"] = json!(true);
    let third: Value = client
        .post(format!("{}/api/report", base))
        .json(&regen)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(third["cached"], false);
}

#[tokio::test]
async fn generate_route_is_a_passthrough() {
    let base = serve(state_with(vec!["A linen kurta works well in summer.".into()])).await;

    let body: Value = reqwest::Client::new()
        .post(format!("{}/api/generate", base))
        .json(&json!({"model": "llama3", "prompt": "Suggest a fabric", "stream": false}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["response"], "A linen kurta works well in summer.");
}

#[tokio::test]
async fn generate_route_rejects_missing_prompt() {
    let base = serve(state_with(vec!["unused".into()])).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/generate", base))
        .json(&json!({"prompt": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn image_route_falls_back_to_keyless_provider() {
    let base = serve(state_with(vec!["unused".into()])).await;

    let body: Value = reqwest::Client::new()
        .post(format!("{}/api/generate-image", base))
        .json(&json!({"report": valid_report_json(), "profile": profile_json()}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["service"], "Pollinations.ai");
    assert!(body["imageUrl"]
        .as_str()
        .unwrap()
        .starts_with("https://pollinations.ai/p/"));
    assert!(body["fallbackUrl"].as_str().unwrap().contains("model=turbo"));
}

#[tokio::test]
async fn bearer_token_guards_api_but_not_health() {
    let mut config = Config::default();
    config.runtime.bearer_token = Some("sekrit".to_string());
    let state =
        AppState::with_generator(config, Arc::new(CannedGenerator::single("x"))).unwrap();
    let base = serve(state).await;
    let client = reqwest::Client::new();

    let health = client.get(format!("{}/health", base)).send().await.unwrap();
    assert!(health.status().is_success());

    let denied = client
        .post(format!("{}/api/questions", base))
        .json(&profile_json())
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), 401);

    let allowed = client
        .post(format!("{}/api/questions", base))
        .bearer_auth("sekrit")
        .json(&profile_json())
        .send()
        .await
        .unwrap();
    assert!(allowed.status().is_success());
}

#[tokio::test]
async fn metrics_route_counts_api_traffic() {
    let base = serve(state_with(vec!["hello".into()])).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/api/generate", base))
        .json(&json!({"prompt": "hi"}))
        .send()
        .await
        .unwrap();

    let metrics: Value = client
        .get(format!("{}/metrics", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(metrics["total_requests"], 1);
}
