/// Burrow Core: background filesystem operations and path classification.
///
/// This crate contains the whole engine with zero UI or transport
/// dependencies. Any front end (RPC bridge, WebSocket dispatcher, CLI) drives
/// it through the [`Engine`] facade: start an operation, poll it once per UI
/// tick, and let the registry dispose of it once it reports `end`.
///
/// # Modules
///
/// - [`classify`]: Ordered suffix rule tables and the memoising classifier.
/// - [`model`]: [`PathEntry`] snapshots, entry kinds, size formatting.
/// - [`ops`]: The four background operations (list, find, size, delete).
/// - [`registry`]: Key-addressed table of running operations.
/// - [`engine`]: The facade exposed to the RPC collaborator.
/// - [`store`]: Small persisted key/value mapping used by collaborators.
/// - [`config`]: Engine tuning knobs.
/// - [`error`]: [`EngineError`] and the [`EngineResult`] alias.
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod ops;
pub mod registry;
pub mod store;

pub use classify::{Classifier, TypeTag};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use model::{EntryKind, PathEntry};
pub use registry::OperationRegistry;
pub use store::LocalStore;
