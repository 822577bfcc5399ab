use crate::helpers;

use helpers::mock_backend::MockSynthesisBackend;
use helpers::TestContext;
use hyper::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Cursor;
use test_context::test_context;
use uuid::Uuid;

const MORNING_STORY: &str = "The dragon woke up early. It flew over the hills.";
const MORNING_CHUNKS: [&str; 2] = ["The dragon woke up early.", "It flew over the hills."];

fn wav_reader(bytes: &[u8]) -> hound::WavReader<Cursor<Vec<u8>>> {
    hound::WavReader::new(Cursor::new(bytes.to_vec())).expect("download should be a WAV file")
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_download_story_as_single_wav(ctx: &TestContext) {
    let user_id = Uuid::new_v4();
    let story_id = ctx.stories.add(user_id, "The Brave Dragon!", MORNING_STORY);

    let response = ctx
        .client
        .get_with_auth(
            &format!("/download_audio?story_id={}", story_id),
            &ctx.token_for(&user_id),
        )
        .await
        .unwrap();

    response
        .assert_status(StatusCode::OK)
        .assert_header("content-type", "audio/wav")
        .assert_header_exists("x-duration-seconds");

    let disposition = response.header("content-disposition").unwrap();
    let expected_name = format!("The_Brave_Dragon_story_{}.wav", story_id);
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains(&format!("filename=\"{}\"", expected_name)));

    let reader = wav_reader(&response.body_bytes);
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, MockSynthesisBackend::sample_rate());
    assert_eq!(spec.channels, 1);

    let expected_frames: usize = MORNING_CHUNKS
        .iter()
        .map(|chunk| MockSynthesisBackend::frames_for(chunk))
        .sum();
    assert_eq!(reader.duration() as usize, expected_frames);

    let expected_seconds = format!(
        "{:.3}",
        expected_frames as f64 / MockSynthesisBackend::sample_rate() as f64
    );
    assert_eq!(response.header("x-duration-seconds"), Some(&expected_seconds));

    assert_eq!(ctx.backend.texts(), MORNING_CHUNKS.to_vec());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reuse_cached_chunks_for_the_same_user(ctx: &TestContext) {
    let user_id = Uuid::new_v4();
    let token = ctx.token_for(&user_id);
    let story_id = ctx.stories.add(user_id, "Morning", MORNING_STORY);
    let path = format!("/download_audio?story_id={}", story_id);

    let first = ctx.client.get_with_auth(&path, &token).await.unwrap();
    first.assert_status(StatusCode::OK);
    assert_eq!(ctx.backend.call_count(), 2);

    let second = ctx.client.get_with_auth(&path, &token).await.unwrap();
    second.assert_status(StatusCode::OK);
    assert_eq!(ctx.backend.call_count(), 2);
    assert_eq!(second.body_bytes, first.body_bytes);

    // Streaming the same text as the same user hits the same entries
    ctx.client
        .post_with_auth("/stream_audio", &json!({ "story": MORNING_STORY }), &token)
        .await
        .unwrap()
        .assert_status(StatusCode::OK);
    assert_eq!(ctx.backend.call_count(), 2);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_download_chinese_story_with_google_tts(ctx: &TestContext) {
    let user_id = Uuid::new_v4();
    let content = "小龙飞上了天空。";
    let story_id = ctx.stories.add(user_id, "小龙的故事", content);

    let response = ctx
        .client
        .get_with_auth(
            &format!("/download_audio?story_id={}&tts_service=gtts", story_id),
            &ctx.token_for(&user_id),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);

    let disposition = response.header("content-disposition").unwrap();
    assert!(disposition.contains(&format!("filename=\"story_{}.wav\"", story_id)));
    assert!(disposition.contains("filename*=UTF-8''%E5%B0%8F%E9%BE%99"));

    let calls = ctx.backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].engine, "gtts");
    assert_eq!(calls[0].text, content);
    assert_eq!(calls[0].payload["tl"], "zh-CN");

    let reader = wav_reader(&response.body_bytes);
    assert_eq!(
        reader.duration() as usize,
        MockSynthesisBackend::frames_for(content)
    );
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_language_without_voice_before_any_work(ctx: &TestContext) {
    let user_id = Uuid::new_v4();
    let story_id = ctx.stories.add(user_id, "小龙", "小龙飞上了天空。它很开心。");

    let response = ctx
        .client
        .get_with_auth(
            &format!("/download_audio?story_id={}", story_id),
            &ctx.token_for(&user_id),
        )
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("no voice profile available for language 'zh'");
    assert_eq!(ctx.backend.call_count(), 0);
    assert_eq!(ctx.cache.gets(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_require_authentication(ctx: &TestContext) {
    let response = ctx.client.get("/download_audio?story_id=1").await.unwrap();

    response
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_error_message("Missing authorization header");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_validate_story_id(ctx: &TestContext) {
    let token = ctx.token_for(&Uuid::new_v4());

    ctx.client
        .get_with_auth("/download_audio", &token)
        .await
        .unwrap()
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("Missing story_id");

    ctx.client
        .get_with_auth("/download_audio?story_id=abc", &token)
        .await
        .unwrap()
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("Invalid story_id");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_not_download_another_users_story(ctx: &TestContext) {
    let story_id = ctx.stories.add(Uuid::new_v4(), "Private", MORNING_STORY);

    let response = ctx
        .client
        .get_with_auth(
            &format!("/download_audio?story_id={}", story_id),
            &ctx.token_for(&Uuid::new_v4()),
        )
        .await
        .unwrap();

    response
        .assert_status(StatusCode::NOT_FOUND)
        .assert_error_message("Story not found");
    assert_eq!(ctx.backend.call_count(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_fail_download_when_synthesis_fails(ctx: &TestContext) {
    let user_id = Uuid::new_v4();
    let story_id = ctx.stories.add(user_id, "Broken", "Everything will FAIL here.");

    let response = ctx
        .client
        .get_with_auth(
            &format!("/download_audio?story_id={}", story_id),
            &ctx.token_for(&user_id),
        )
        .await
        .unwrap();

    response
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_error_message("synthesis failed for chunk 0");
    assert_eq!(ctx.cache.puts(), 0);
}
