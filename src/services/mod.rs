pub mod api;
pub mod cache;
pub mod clock;
pub mod events;
pub mod guides;
pub mod identity;
pub mod poller;
pub mod store;
