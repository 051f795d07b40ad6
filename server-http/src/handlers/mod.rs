pub mod events;
pub mod flush;
pub mod health;

pub use events::stream_events;
pub use flush::{flush_default, flush_namespace};
pub use health::health_check;
