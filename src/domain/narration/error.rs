use super::assembler::AssemblyError;
use super::language::LanguageCode;
use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum NarrationServiceError {
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("no voice profile available for language '{0}'")]
    NoVoiceProfile(LanguageCode),
    #[error("voice profile '{0}' not found")]
    VoiceNotFound(String),
    #[error("synthesis failed for chunk {chunk_index}: {message}")]
    Backend { chunk_index: usize, message: String },
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error("dependency error: {0}")]
    Dependency(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<AppError> for NarrationServiceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::BadRequest(msg) => NarrationServiceError::Invalid(msg),
            AppError::NotFound(msg) => NarrationServiceError::NotFound(msg),
            _ => NarrationServiceError::Dependency(err.to_string()),
        }
    }
}

impl From<NarrationServiceError> for AppError {
    fn from(err: NarrationServiceError) -> Self {
        match err {
            NarrationServiceError::Invalid(msg) => AppError::BadRequest(msg),
            NarrationServiceError::NoVoiceProfile(_) => AppError::BadRequest(err.to_string()),
            NarrationServiceError::NotFound(msg) => AppError::NotFound(msg),
            NarrationServiceError::VoiceNotFound(_) => AppError::NotFound(err.to_string()),
            NarrationServiceError::Backend { .. } => AppError::ExternalService(err.to_string()),
            NarrationServiceError::Assembly(e) => AppError::Internal(e.to_string()),
            NarrationServiceError::Dependency(msg) => AppError::Internal(msg),
            NarrationServiceError::Other(e) => AppError::Internal(e.to_string()),
        }
    }
}
