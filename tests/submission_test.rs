mod helpers;

use cloudsight::services::transport::RequestBody;
use cloudsight::{ClientConfig, CloudSightClient, Params, Position};
use helpers::{ScriptedTransport, TEST_BASE_URL};
use serde_json::json;

const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

#[tokio::test]
async fn test_upload_sniffs_image_type() {
    let transport = ScriptedTransport::new();
    let client = helpers::scripted_client(&transport);
    transport.push_json(200, json!({ "token": "abc", "status": "not completed" }));

    client
        .image_request(PNG_HEADER.to_vec(), "label.png", None)
        .await
        .unwrap();

    let calls = transport.calls();
    assert_eq!(calls[0].url, format!("{TEST_BASE_URL}/image_requests"));
    match &calls[0].body {
        RequestBody::Multipart {
            field,
            filename,
            content_type,
            data,
            fields,
        } => {
            assert_eq!(field, "image_request[image]");
            assert_eq!(filename, "label.png");
            assert_eq!(content_type, "image/png");
            assert_eq!(data.as_slice(), PNG_HEADER);
            assert!(fields.contains(&("image_request[locale]".to_string(), "en-US".to_string())));
        }
        other => panic!("expected multipart body, got {other:?}"),
    }
}

#[tokio::test]
async fn test_remote_request_keeps_caller_params() {
    let transport = ScriptedTransport::new();
    let client = helpers::scripted_client(&transport);
    transport.push_json(200, json!({ "token": "abc", "status": "not completed" }));

    let mut params = Params::new();
    params
        .set_position(Position {
            latitude: 50.0,
            longitude: 19.0,
            altitude: 0.0,
        })
        .unwrap();
    params.set_language("pl");

    client
        .remote_image_request("http://example.com/cat.jpg", Some(params))
        .await
        .unwrap();

    let RequestBody::Form(fields) = &transport.calls()[0].body else {
        panic!("expected form body");
    };
    let get = |key: &str| {
        fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };
    assert_eq!(get("image_request[remote_image_url]"), Some("http://example.com/cat.jpg"));
    assert_eq!(get("image_request[latitude]"), Some("50"));
    assert_eq!(get("image_request[language]"), Some("pl"));
    assert_eq!(get("image_request[locale]"), Some("en-US"));
    assert!(fields.iter().all(|(k, _)| !k.starts_with("oauth_")));
}

#[tokio::test]
async fn test_oauth_signed_submission() {
    let transport = ScriptedTransport::new();
    let config = ClientConfig::oauth("key", "secret").with_base_url(TEST_BASE_URL);
    let client = CloudSightClient::with_transport(&config, transport.clone()).unwrap();

    transport
        .push_json(200, json!({ "token": "abc", "status": "not completed" }))
        .push_json(200, json!({ "token": "def", "status": "not completed" }));

    client
        .remote_image_request("http://example.com/cat.jpg", None)
        .await
        .unwrap();
    client
        .remote_image_request("http://example.com/cat.jpg", None)
        .await
        .unwrap();

    let calls = transport.calls();
    for call in &calls {
        assert!(call.authorization.starts_with("OAuth oauth_consumer_key=\"key\", oauth_nonce=\""));
        assert!(call.authorization.contains("oauth_signature_method=\"HMAC-SHA1\""));
    }
    assert_ne!(calls[0].authorization, calls[1].authorization);
}
