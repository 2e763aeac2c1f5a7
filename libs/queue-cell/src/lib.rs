pub mod error;
pub mod handlers;
pub mod locks;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use error::*;
pub use handlers::EngineState;
pub use locks::EngineLocks;
pub use models::*;
pub use router::create_queue_router;
pub use services::*;
pub use store::*;
