use crate::helpers;

use helpers::fixtures::STORYTELLER_VOICE;
use helpers::mock_backend::MockSynthesisBackend;
use helpers::TestContext;
use hyper::StatusCode;
use narration_backend::domain::narration::{CacheKey, LanguageCode, OwnerScope};
use pretty_assertions::assert_eq;
use serde_json::json;
use test_context::test_context;
use uuid::Uuid;

const DRAGON_STORY: &str = "Once upon a time. There was a small dragon who could not fly.";

fn dragon_chunks() -> Vec<String> {
    vec![
        "Once upon a time.".to_string(),
        "There was a small dragon who could not".to_string(),
        "fly.".to_string(),
    ]
}

fn concatenated_audio(chunks: &[String]) -> Vec<u8> {
    chunks
        .iter()
        .flat_map(|chunk| MockSynthesisBackend::audio_for(chunk))
        .collect()
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_stream_every_chunk_in_order(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/stream_audio", &json!({ "story": DRAGON_STORY }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::OK)
        .assert_header("content-type", "audio/mpeg")
        .assert_header("x-chunk-count", "3")
        .assert_header("x-language", "en")
        .assert_header("x-voice-profile", STORYTELLER_VOICE);

    assert!(response.body_error.is_none());
    assert_eq!(response.body_bytes, concatenated_audio(&dragon_chunks()));
    assert_eq!(ctx.backend.texts(), dragon_chunks());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_send_voice_reference_and_params_to_the_backend(ctx: &TestContext) {
    ctx.client
        .post(
            "/stream_audio",
            &json!({ "story": "A short tale.", "speed": 1.5 }),
        )
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    let calls = ctx.backend.calls();
    assert_eq!(calls.len(), 1);

    let payload = &calls[0].payload;
    assert_eq!(calls[0].engine, "f5tts");
    assert_eq!(payload["text_to_generate"], "A short tale.");
    assert_eq!(payload["ref_text"], helpers::fixtures::STORYTELLER_TRANSCRIPT);
    assert_eq!(payload["speed"], 1.5);
    assert_eq!(payload["nfe_step"], 32);
    assert_eq!(payload["remove_silence"], true);
    assert!(payload["ref_audio"]
        .as_str()
        .unwrap()
        .ends_with("storyteller.wav"));
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_clean_decorations_before_synthesis(ctx: &TestContext) {
    ctx.client
        .post(
            "/stream_audio",
            &json!({ "story": "**The** [brave] knight said \"hi\"." }),
        )
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    assert_eq!(ctx.backend.texts(), vec!["The brave knight said hi."]);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_serve_repeated_narration_from_cache(ctx: &TestContext) {
    let first = ctx
        .client
        .post("/stream_audio", &json!({ "story": DRAGON_STORY }))
        .await
        .unwrap();
    first.assert_status(StatusCode::OK);
    assert_eq!(ctx.backend.call_count(), 3);

    let second = ctx
        .client
        .post("/stream_audio", &json!({ "story": DRAGON_STORY }))
        .await
        .unwrap();
    second.assert_status(StatusCode::OK);

    assert_eq!(ctx.backend.call_count(), 3, "second narration must not synthesize");
    assert_eq!(second.body_bytes, first.body_bytes);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_keep_user_cache_entries_private(ctx: &TestContext) {
    let story = json!({ "story": "The moon was bright tonight." });
    let alice = ctx.token_for(&Uuid::new_v4());
    let bob = ctx.token_for(&Uuid::new_v4());

    ctx.client
        .post_with_auth("/stream_audio", &story, &alice)
        .await
        .unwrap()
        .assert_status(StatusCode::OK);
    ctx.client
        .post_with_auth("/stream_audio", &story, &alice)
        .await
        .unwrap()
        .assert_status(StatusCode::OK);
    assert_eq!(ctx.backend.call_count(), 1);

    // Alice's entry is hers alone
    ctx.client
        .post_with_auth("/stream_audio", &story, &bob)
        .await
        .unwrap()
        .assert_status(StatusCode::OK);
    assert_eq!(ctx.backend.call_count(), 2);

    ctx.client
        .post("/stream_audio", &story)
        .await
        .unwrap()
        .assert_status(StatusCode::OK);
    assert_eq!(ctx.backend.call_count(), 3);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_let_users_reuse_shared_entries(ctx: &TestContext) {
    let story = json!({ "story": "Stars fell like rain." });

    // Anonymous narration lands in the shared scope
    ctx.client
        .post("/stream_audio", &story)
        .await
        .unwrap()
        .assert_status(StatusCode::OK);
    assert_eq!(ctx.backend.call_count(), 1);

    let shared_key = CacheKey::new(
        "Stars fell like rain.",
        STORYTELLER_VOICE,
        LanguageCode::English,
        OwnerScope::Shared,
    );
    assert!(ctx.cache.peek(&shared_key).await.is_some());

    let token = ctx.token_for(&Uuid::new_v4());
    ctx.client
        .post_with_auth("/stream_audio", &story, &token)
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    assert_eq!(ctx.backend.call_count(), 1);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_return_json_error_when_first_chunk_fails(ctx: &TestContext) {
    let response = ctx
        .client
        .post(
            "/stream_audio",
            &json!({ "story": "FAIL at the very beginning. Then more." }),
        )
        .await
        .unwrap();

    response
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_error_message("chunk 0");
    assert_eq!(ctx.backend.call_count(), 1);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_cut_the_stream_when_a_later_chunk_fails(ctx: &TestContext) {
    let first = "The first part of the story is fine.";
    let failing = "But FAIL happens right here now.";
    let never = "The ending nobody will ever hear.";
    let story = format!("{} {} {}", first, failing, never);

    let response = ctx
        .client
        .post("/stream_audio", &json!({ "story": story }))
        .await
        .unwrap();

    // Headers were already committed when the failure happened
    response
        .assert_status(StatusCode::OK)
        .assert_header("x-chunk-count", "3");
    assert!(
        response.body_error.is_some(),
        "a failed stream must not end cleanly"
    );

    let first_audio = MockSynthesisBackend::audio_for(first);
    assert!(response.body_bytes.len() <= first_audio.len());
    assert!(first_audio.starts_with(&response.body_bytes));

    assert_eq!(ctx.backend.texts(), vec![first, failing]);

    let failed_key = CacheKey::new(
        failing,
        STORYTELLER_VOICE,
        LanguageCode::English,
        OwnerScope::Shared,
    );
    assert!(ctx.cache.peek(&failed_key).await.is_none());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_empty_backend_audio(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/stream_audio", &json!({ "story": "EMPTY words here." }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_error_message("no audio");
    assert_eq!(ctx.cache.puts(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_narrate_with_google_tts(ctx: &TestContext) {
    let response = ctx
        .client
        .post(
            "/stream_audio",
            &json!({ "story": DRAGON_STORY, "tts_service": "gtts" }),
        )
        .await
        .unwrap();

    // Google's chunk limit fits the whole story
    response
        .assert_status(StatusCode::OK)
        .assert_header("x-chunk-count", "1")
        .assert_header("x-voice-profile", "gtts-en");

    let calls = ctx.backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].engine, "gtts");
    assert_eq!(calls[0].text, DRAGON_STORY);
    assert_eq!(calls[0].payload["tl"], "en");
    assert_eq!(calls[0].payload["client"], "tw-ob");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_unknown_tts_service(ctx: &TestContext) {
    let response = ctx
        .client
        .post(
            "/stream_audio",
            &json!({ "story": DRAGON_STORY, "tts_service": "polly" }),
        )
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("Invalid TTS service");
    assert_eq!(ctx.backend.call_count(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_blank_story(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/stream_audio", &json!({ "story": "  **  " }))
        .await
        .unwrap();

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(ctx.backend.call_count(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_out_of_range_speed(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/stream_audio", &json!({ "story": DRAGON_STORY, "speed": 0 }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("speed");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_return_not_found_for_unknown_voice_profile(ctx: &TestContext) {
    let response = ctx
        .client
        .post(
            "/stream_audio",
            &json!({ "story": DRAGON_STORY, "voice_profile": "ghost" }),
        )
        .await
        .unwrap();

    response
        .assert_status(StatusCode::NOT_FOUND)
        .assert_error_message("ghost");
    assert_eq!(ctx.backend.call_count(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_language_without_voice_profile(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/stream_audio", &json!({ "story": "小龙飞上了天空。" }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("no voice profile");
    assert_eq!(ctx.backend.call_count(), 0);
    assert_eq!(ctx.cache.gets(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_invalid_bearer_token(ctx: &TestContext) {
    let response = ctx
        .client
        .post_with_auth(
            "/stream_audio",
            &json!({ "story": DRAGON_STORY }),
            "not-a-jwt",
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(ctx.backend.call_count(), 0);
}
