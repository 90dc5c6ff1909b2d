// Realtime layer: presence, delivery best-effort, sinkronisasi seen
pub mod delivery;
pub mod presence;
pub mod seen;

pub use delivery::{DeliveryGateway, DeliveryOutcome};
pub use presence::{ConnectionHandle, PresenceRegistry};
pub use seen::SeenSynchronizer;
