//! Core engine for the elimination party game: persistent store, ring-based
//! contract assignment, game lifecycle, and the two-phase death pipeline.
//!
//! Everything stateful funnels through [`engine::GameEngine`], which owns the
//! SQLite-backed [`store::GameStore`]. The engine is deliberately synchronous;
//! embedders wrap it in whatever serialization their runtime calls for.

pub mod engine;
pub mod notify;
pub mod report;
pub mod ring;
pub mod store;

pub use engine::{
    DeathOutcome, EngineConfig, FinalOutcome, GameEngine, GameOverview, PendingConfirmation,
    PoolUpdate, PoolsView, StartSummary,
};
pub use notify::{BufferSink, NotificationSink, NotifySendError, NullSink, SentMessage};
pub use store::{GameStore, StoreError, StoreTx};
