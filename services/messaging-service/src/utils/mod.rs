// Utility modules untuk Messaging Service
pub mod media;
