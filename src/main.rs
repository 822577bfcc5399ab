use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use narration_backend::controllers::narration::NarrationController;
use narration_backend::domain::auth::JwtManager;
use narration_backend::domain::narration::NarrationService;
use narration_backend::infrastructure::config::{CacheBackend, Config, LogFormat};
use narration_backend::infrastructure::db::{check_connection, create_pool, run_migrations};
use narration_backend::infrastructure::http::{build_router, start_http_server};
use narration_backend::infrastructure::repositories::{
    spawn_retention_sweep, AudioCacheRepository, DirectoryVoiceProfileRepository,
    F5SynthesisRepository, GoogleSynthesisRepository, MemoryAudioCacheRepository,
    PgAudioCacheRepository, PgStoryRepository, PgVoiceProfileRepository, SynthesisRepository,
    VoiceProfileRepository,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting narration backend on {}:{}",
        config.host,
        config.port
    );

    // Create database connection pool
    let pool = create_pool(&config.database_url).await?;
    tracing::info!("Database connection pool created");

    // Verify database connection
    check_connection(&pool).await?;
    tracing::info!("Database connection verified");

    run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    let pool = Arc::new(pool);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Instantiate repositories (inject db pool)
    tracing::info!("Instantiating repositories...");
    let audio_cache: Arc<dyn AudioCacheRepository> = match config.audio_cache_backend {
        CacheBackend::Postgres => Arc::new(PgAudioCacheRepository::new(pool.clone())),
        CacheBackend::Memory => Arc::new(MemoryAudioCacheRepository::new(
            config.memory_cache_max_entries,
        )),
    };
    let voice_repo: Arc<dyn VoiceProfileRepository> = match &config.voice_profiles_dir {
        Some(dir) => Arc::new(DirectoryVoiceProfileRepository::load(dir).await?),
        None => Arc::new(PgVoiceProfileRepository::new(pool.clone())),
    };
    let story_repo = Arc::new(PgStoryRepository::new(pool.clone()));

    // 2. Instantiate synthesis clients
    tracing::info!(
        f5tts_url = %config.f5tts_url,
        timeout_secs = config.synthesis_timeout_secs,
        reference_audio = ?config.reference_audio_transport,
        "Instantiating synthesis clients..."
    );
    let http_client = reqwest::Client::builder()
        .timeout(config.synthesis_timeout())
        .build()?;
    let synthesizers: Vec<Arc<dyn SynthesisRepository>> = vec![
        Arc::new(F5SynthesisRepository::new(
            http_client.clone(),
            config.f5tts_url.clone(),
            config.reference_audio_transport,
            config.max_chunk_length,
        )
        .with_response_type(config.f5_response_type)),
        Arc::new(GoogleSynthesisRepository::new(
            http_client,
            config.google_tts_url.clone(),
        )),
    ];

    // 3. Instantiate services
    tracing::info!(
        cache_backend = ?config.audio_cache_backend,
        write_scope = ?config.audio_cache_write_scope,
        "Instantiating services..."
    );
    let narration_service = Arc::new(NarrationService::new(
        voice_repo,
        story_repo,
        audio_cache.clone(),
        synthesizers,
        config.audio_cache_write_scope,
    ));

    if let Some(days) = config.audio_cache_retention_days {
        tracing::info!(retention_days = days, "Audio cache retention sweep enabled");
        spawn_retention_sweep(audio_cache, days);
    }

    // 4. Instantiate controllers (inject services)
    tracing::info!("Instantiating controllers...");
    let narration_controller = Arc::new(NarrationController::new(narration_service));
    let jwt_manager = Arc::new(JwtManager::new(&config.jwt_secret));

    // Start HTTP server with all routes
    let app = build_router(Some(pool), jwt_manager, narration_controller);
    start_http_server(&config, app).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    let default_filter = if config.is_development() {
        "narration_backend=debug,tower_http=debug"
    } else {
        "narration_backend=info,tower_http=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
