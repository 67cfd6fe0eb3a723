//! Application use cases / business logic

pub mod fanout;
pub mod publish;

pub use fanout::PublishTarget;
pub use publish::{PublishError, PublishOrchestrator, PublishPhase, normalize_preview_url};
