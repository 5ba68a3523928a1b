//! # FVI Query Router
//!
//! The only external caller of the scoring aggregator and the context fusion
//! engine. Requests arrive as [`fvi_protocol`] types; failures leave as
//! [`ErrorEnvelope`](fvi_protocol::ErrorEnvelope)s.
//!
//! ```text
//! ScoreRequest ───> handle_score ───> ScoringAggregator
//! ContextRequest ─> handle_context ─> persona/entity detection
//!                                      └─> ContextFusionEngine::fuse_with_timeout
//!                  answer ──────────> Prompt ─> Generator
//! ```

mod detect;
mod error;
mod generator;
mod prompt;
mod router;
mod view;

pub use detect::{detect_persona, EntityDetector};
pub use error::{Result, RouterError};
pub use generator::{ExtractiveGenerator, Generator};
pub use prompt::{render_context, Prompt, SYSTEM_PROMPT};
pub use router::QueryRouter;
