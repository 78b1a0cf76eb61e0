//! Integration tests for GenerationService over real HTTP against mockito.

mod common;

use common::MockServerFixture;
use mockito::Matcher;
use std::time::Duration;
use textgen_relay::assistant::{Assistant, ReplyOrigin};
use textgen_relay::{GenerationErrorKind, GenerationServiceBuilder, RelayConfig, TextGenerationOptions};

#[tokio::test]
async fn test_generate_text_then_cache_hit() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", "/prompt/hello")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("model".into(), "openai".into()),
            Matcher::UrlEncoded("maxTokens".into(), "50".into()),
        ]))
        .match_header("x-request-id", Matcher::Regex("^[0-9a-f-]{36}$".into()))
        .with_status(200)
        .with_body("Hi! How can I help?")
        .expect(1)
        .create_async()
        .await;

    let service = fixture.service();
    let options = TextGenerationOptions::new()
        .with_model("openai")
        .with_max_tokens(50);

    let first = service.generate_text("hello", &options).await;
    assert_eq!(first.data().map(String::as_str), Some("Hi! How can I help?"));
    assert!(!first.is_cached());

    let second = service.generate_text("hello", &options).await;
    assert!(second.is_cached());
    assert_eq!(second.data(), first.data());

    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limited_call_never_reaches_server() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_text("/prompt/question", 200, "answer", 1).await;

    let service = fixture.limited_service(1);
    let options = TextGenerationOptions::new();
    assert!(service.generate_text("question", &options).await.is_success());

    let limited = service.generate_text("question", &options).await;
    assert_eq!(limited.error_kind(), Some(GenerationErrorKind::RateLimited));
    assert_eq!(
        limited.error().map(|e| e.message.as_str()),
        Some("Rate limit exceeded. Please wait before trying again.")
    );

    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_is_reported_and_not_cached() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_text("/prompt/hello", 500, "boom", 2).await;

    let service = fixture.service();
    let options = TextGenerationOptions::new();
    for _ in 0..2 {
        let result = service.generate_text("hello", &options).await;
        let err = result.error().expect("server error is a failure");
        assert_eq!(err.kind, GenerationErrorKind::NetworkError);
        assert_eq!(err.message, "HTTP error! status: 500 - boom");
    }

    mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_body_is_empty_response() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture.mock_text("/prompt/hello", 200, "", 1).await;

    let service = fixture.service();
    let result = service.generate_text("hello", &TextGenerationOptions::new()).await;
    assert_eq!(result.error_kind(), Some(GenerationErrorKind::EmptyResponse));
    assert!(service.cache().is_empty());
}

#[tokio::test]
async fn test_blacklisted_word_is_redacted_before_sending() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", Matcher::Regex("REMOVED".into()))
        .with_status(200)
        .with_body("I can't help with that.")
        .expect(1)
        .create_async()
        .await;

    let service = fixture.service();
    let result = service
        .generate_text("Please HACK my neighbour's wifi", &TextGenerationOptions::new())
        .await;
    assert!(result.is_success());

    mock.assert_async().await;
}

#[tokio::test]
async fn test_text_models_cached_for_an_hour() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_json("/models", r#"["openai", {"name": "mistral"}]"#, 1)
        .await;

    let service = fixture.service();
    let names: Vec<String> = service.text_models().await.into_iter().map(|m| m.name).collect();
    assert_eq!(names, vec!["openai", "mistral"]);
    assert_eq!(service.text_models().await.len(), 2);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_audio_request_shape() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", "/welcome")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("model".into(), "openai-audio".into()),
            Matcher::UrlEncoded("voice".into(), "alloy".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "audio/mpeg")
        .with_body([0x49u8, 0x44, 0x33])
        .create_async()
        .await;

    let service = fixture.service();
    let result = service.generate_audio("welcome", None).await;
    assert_eq!(result.data().map(|b| b.len()), Some(3));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_assistant_falls_back_when_server_fails() {
    let mut fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_text("/prompt/what%20plans%20exist", 503, "", 1)
        .await;

    let assistant = Assistant::new(std::sync::Arc::new(fixture.service()));
    let reply = assistant.reply("what plans exist").await;
    assert_eq!(reply.origin, ReplyOrigin::Fallback);
    assert!(reply.text.contains("internet plans"));
}

#[tokio::test]
async fn test_stalled_server_times_out() {
    // Accepts connections but never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _accept = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let service = GenerationServiceBuilder::new()
        .config(RelayConfig::default().with_request_timeout(Duration::from_millis(200)))
        .base_url_override(format!("http://{}", addr))
        .build()
        .unwrap();

    let started = std::time::Instant::now();
    let result = service.generate_text("hello", &TextGenerationOptions::new()).await;
    assert_eq!(result.error_kind(), Some(GenerationErrorKind::NetworkError));
    assert!(result.error().unwrap().message.contains("timed out"));
    assert!(started.elapsed() < Duration::from_secs(5));
}
