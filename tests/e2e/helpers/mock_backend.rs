use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use tokio::net::TcpListener;

const SAMPLE_RATE: u32 = 16_000;
const FRAMES_PER_CHAR: usize = 160;

/// One request received by the fake synthesis service
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub engine: &'static str,
    pub text: String,
    pub payload: Value,
}

#[derive(Clone, Default)]
struct BackendState {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

/// Stands in for both the F5 service (`POST /tts`) and Google Translate TTS
/// (`GET /translate_tts`).
///
/// Text containing `FAIL` is answered with a 500 and text containing `EMPTY`
/// with an empty 200. Anything else gets a mono WAV whose length depends on
/// the text, so every chunk's audio is distinguishable.
pub struct MockSynthesisBackend {
    pub base_url: String,
    state: BackendState,
}

impl MockSynthesisBackend {
    pub async fn start() -> Self {
        let state = BackendState::default();
        let app = Router::new()
            .route("/tts", post(f5_tts))
            .route("/translate_tts", get(google_tts))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock synthesis backend");
        let addr = listener.local_addr().expect("Failed to get local address");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock synthesis backend failed");
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn f5_url(&self) -> String {
        format!("{}/tts", self.base_url)
    }

    pub fn google_url(&self) -> String {
        format!("{}/translate_tts", self.base_url)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.lock().clone()
    }

    /// Synthesized texts in arrival order
    pub fn texts(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.text).collect()
    }

    pub fn call_count(&self) -> usize {
        self.state.calls.lock().len()
    }

    /// The exact bytes returned for `text`
    pub fn audio_for(text: &str) -> Vec<u8> {
        wav(Self::frames_for(text))
    }

    pub fn frames_for(text: &str) -> usize {
        text.chars().count() * FRAMES_PER_CHAR
    }

    pub fn sample_rate() -> u32 {
        SAMPLE_RATE
    }
}

async fn f5_tts(State(state): State<BackendState>, Json(payload): Json<Value>) -> Response {
    let text = payload
        .get("text_to_generate")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    state.calls.lock().push(RecordedCall {
        engine: "f5tts",
        text: text.clone(),
        payload,
    });

    respond(&text)
}

async fn google_tts(
    State(state): State<BackendState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let text = query.get("q").cloned().unwrap_or_default();

    state.calls.lock().push(RecordedCall {
        engine: "gtts",
        text: text.clone(),
        payload: serde_json::to_value(&query).unwrap_or_default(),
    });

    respond(&text)
}

fn respond(text: &str) -> Response {
    if text.contains("FAIL") {
        (StatusCode::INTERNAL_SERVER_ERROR, "synthesis exploded").into_response()
    } else if text.contains("EMPTY") {
        (StatusCode::OK, Vec::<u8>::new()).into_response()
    } else {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "audio/wav")],
            MockSynthesisBackend::audio_for(text),
        )
            .into_response()
    }
}

fn wav(frames: usize) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
        for i in 0..frames {
            writer
                .write_sample(((i % 200) as i16 - 100) * 50)
                .expect("wav sample");
        }
        writer.finalize().expect("wav finalize");
    }
    cursor.into_inner()
}
