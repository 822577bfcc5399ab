pub mod audio_cache_repository;
pub mod directory_voice_profile_repository;
pub mod f5_synthesis_repository;
pub mod google_synthesis_repository;
pub mod memory_audio_cache_repository;
pub mod pg_audio_cache_repository;
pub mod story_repository;
pub mod synthesis_repository;
pub mod voice_profile_repository;

pub use audio_cache_repository::{spawn_retention_sweep, AudioCacheRepository, CacheError};
pub use directory_voice_profile_repository::DirectoryVoiceProfileRepository;
pub use f5_synthesis_repository::{F5SynthesisRepository, ResponseType};
pub use google_synthesis_repository::GoogleSynthesisRepository;
pub use memory_audio_cache_repository::MemoryAudioCacheRepository;
pub use pg_audio_cache_repository::PgAudioCacheRepository;
pub use story_repository::{PgStoryRepository, StoryRepository};
pub use synthesis_repository::{SynthesisError, SynthesisRepository, SynthesisRequest};
pub use voice_profile_repository::{PgVoiceProfileRepository, VoiceProfileRepository};
