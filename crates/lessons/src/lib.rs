//! Lessons - MoSCoW-prioritized lesson generation pipeline
//!
//! Turns a learner profile and a lesson request into a generated lesson:
//! priorities are extracted and normalized, a deterministic fingerprint is
//! derived, the expiring lesson cache is consulted, and only on a miss is the
//! hosted generation service called. Stores and generation clients are
//! injected so every stage can run against in-memory fakes.

pub mod cache;
pub mod clock;
pub mod content;
pub mod errors;
pub mod fallback;
pub mod fingerprint;
pub mod generation;
pub mod input;
pub mod model;
pub mod orchestrator;
pub mod priorities;
pub mod prompt;
pub mod response;
pub mod simulation;
pub mod store;

pub use cache::{CacheEntry, LessonCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use content::GeneratedLesson;
pub use errors::{classify, LessonError, Recovery};
pub use fallback::FallbackLayer;
pub use fingerprint::{derive_key, Fingerprint};
pub use generation::{GenerationError, GenerationOutput, GenerationParams, GenerationService};
pub use input::{InputError, LessonEnvelope};
pub use model::{LearnerProfile, LessonRequest};
pub use orchestrator::{LessonOrchestrator, LessonOutcome, OrchestratorConfig, Stage};
pub use priorities::{PriorityProfile, RawPriorities, TimeAllocation};
pub use response::{ErrorCode, ErrorResponse, LessonResponse};
pub use store::{FileLessonStore, LessonStore, MemoryLessonStore, StoreError, StoreStats};
