pub mod model;

pub use model::{ReferenceAudio, VoiceProfile, VoiceProfileSummary};
