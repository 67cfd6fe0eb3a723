//! Content preprocessors run before platform dispatch

mod markdown;
mod picgo;

pub use markdown::PulldownRenderer;
pub use picgo::{DEFAULT_PICGO_URL, NoopImageRehoster, PicgoImageRehoster};
