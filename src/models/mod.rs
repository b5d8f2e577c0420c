pub mod compliance;
pub mod event;
pub mod ping;
pub mod record;
pub mod sync;
pub mod trip;
