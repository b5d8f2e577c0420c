pub mod event_processor;
pub mod sync_dispatch;
pub mod trip_lifecycle;
