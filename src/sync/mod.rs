// Synchronization between the in-memory document, the local cache, and the
// remote store.

pub mod gateway;
pub mod reconciler;
pub mod subscriber;
