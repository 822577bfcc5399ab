pub mod auth;
pub mod narration;
pub mod story;
pub mod voice;
