pub mod advisor;
pub mod delay;
pub mod lifecycle;
pub mod position;
pub mod resequence;
pub mod token;

pub use advisor::SchedulingAdvisor;
pub use delay::DelayDetector;
pub use lifecycle::LifecycleService;
pub use position::PositionEstimator;
pub use resequence::ResequenceService;
pub use token::TokenAllocator;
