// Modul domain untuk Messaging Service
pub mod conversation;
pub mod events;
pub mod message;
pub mod user;

// Export publik untuk semua modul
pub use conversation::*;
pub use events::*;
pub use message::*;
pub use user::*;
