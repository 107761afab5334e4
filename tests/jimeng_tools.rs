//! Generation client and tool surface against a mocked Jimeng API.

use serde_json::{json, Value};
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use jimeng_bridge::{
    BridgeError, ErrorKind, GenerationRequest, ImageClient, ImageModel, ImageTools,
    JimengConfig,
};

fn config_for(server: &MockServer) -> JimengConfig {
    JimengConfig::new()
        .with_api_base(server.uri())
        .with_session_id("session-abc")
}

fn tools_for(server: &MockServer) -> ImageTools {
    ImageTools::new(ImageClient::new(config_for(server)).unwrap())
}

fn parse(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn test_generate_sends_bearer_session_and_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .and(header("authorization", "Bearer session-abc"))
        .and(body_partial_json(json!({
            "model": "jimeng-2.1",
            "prompt": "a red fox in snow",
            "negativePrompt": "blurry",
            "width": 768,
            "height": 512,
            "sample_strength": 0.7,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "created": 1718000000,
            "data": [
                { "url": "https://cdn.example.com/1.png" },
                { "url": "https://cdn.example.com/2.png" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = tools_for(&server)
        .call(
            "generate_images",
            json!({
                "prompt": "a red fox in snow",
                "model": "jimeng-2.1",
                "negative_prompt": "blurry",
                "width": 768,
                "height": 512,
                "sample_strength": 0.7
            }),
        )
        .await
        .unwrap();

    assert!(!output.is_error);
    let doc = parse(&output.text);
    assert_eq!(doc["success"], true);
    assert_eq!(doc["generated_at"], 1718000000);
    assert_eq!(doc["model_used"], "jimeng-2.1");
    assert_eq!(doc["image_count"], 2);
    assert_eq!(doc["images"][0]["index"], 1);
    assert_eq!(doc["images"][1]["url"], "https://cdn.example.com/2.png");
    assert_eq!(
        doc["images"][1]["description"],
        "Image #2 generated from prompt 'a red fox in snow'"
    );
    server.verify().await;
}

#[tokio::test]
async fn test_defaults_fill_omitted_arguments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "model": "jimeng-3.0",
            "width": 1024,
            "height": 1024,
            "sample_strength": 0.5,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "url": "https://cdn.example.com/only.png" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = tools_for(&server)
        .generate_images(serde_json::from_value(json!({ "prompt": "city at dusk" })).unwrap())
        .await;

    assert!(response.success);
    assert_eq!(response.image_count, 1);
    assert!(response.generated_at.is_none());
    server.verify().await;
}

#[tokio::test]
async fn test_remote_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let client = ImageClient::new(config_for(&server)).unwrap();
    let request = GenerationRequest::new("a bridge", ImageModel::Jimeng30, "", 512, 512, 0.5).unwrap();
    let error = client.generate(&request).await.unwrap_err();
    match &error {
        BridgeError::RemoteStatus { status, body } => {
            assert_eq!(*status, 500);
            assert!(body.contains("upstream exploded"));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let output = tools_for(&server)
        .call("generate_images", json!({ "prompt": "a bridge" }))
        .await
        .unwrap();
    assert!(output.is_error);
    let doc = parse(&output.text);
    assert_eq!(doc["success"], false);
    assert_eq!(doc["error"]["kind"], "remote_status");
    assert_eq!(doc["error"]["details"]["status"], 500);
    assert_eq!(doc["prompt_used"], "a bridge");
}

#[tokio::test]
async fn test_empty_data_is_an_empty_result_with_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "created": 1718000001,
            "data": []
        })))
        .mount(&server)
        .await;

    let output = tools_for(&server)
        .call("generate_images", json!({ "prompt": "nothing comes back" }))
        .await
        .unwrap();

    assert!(output.is_error);
    let doc = parse(&output.text);
    assert_eq!(doc["error"]["kind"], "empty_result");
    assert_eq!(doc["error"]["details"]["raw_response"]["created"], 1718000001);
    assert_eq!(doc["image_count"], 0);
}

#[tokio::test]
async fn test_slow_api_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": [{ "url": "late" }] }))
                .set_delay(std::time::Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;

    let client = ImageClient::new(config_for(&server).with_request_timeout_ms(200)).unwrap();
    let request = GenerationRequest::new("slow", ImageModel::Jimeng30, "", 512, 512, 0.5).unwrap();
    let error = client.generate(&request).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn test_invalid_arguments_never_reach_the_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let tools = tools_for(&server);

    let output = tools
        .call("generate_images", json!({ "prompt": "x", "model": "midjourney-7" }))
        .await
        .unwrap();
    assert!(output.is_error);
    let doc = parse(&output.text);
    assert_eq!(doc["error"]["kind"], "validation");
    let available = doc["error"]["details"]["available_models"].as_array().unwrap();
    assert_eq!(available.len(), ImageModel::ALL.len());

    for args in [
        json!({ "prompt": "x", "sample_strength": 1.5 }),
        json!({ "prompt": "x", "width": 0 }),
        json!({ "prompt": "   " }),
        json!({ "prompt": 42 }),
    ] {
        let output = tools.call("generate_images", args).await.unwrap();
        assert!(output.is_error);
        assert_eq!(parse(&output.text)["error"]["kind"], "validation");
    }

    server.verify().await;
}

#[tokio::test]
async fn test_catalog_and_tips_need_no_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let tools = ImageTools::new(
        ImageClient::new(config_for(&server).with_default_model(ImageModel::Jimeng21)).unwrap(),
    );

    let catalog = parse(&tools.list_available_models());
    assert_eq!(catalog["default_model"], "jimeng-2.1");
    let defaults: Vec<&Value> = catalog["available_models"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| m["is_default"] == true)
        .collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0]["name"], "jimeng-2.1");

    let tips = parse(&tools.get_generation_tips());
    assert!(tips.is_object());

    assert!(tools.call("upscale_image", json!({})).await.is_err());
    server.verify().await;
}
