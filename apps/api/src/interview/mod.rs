// Career Intelligence interview: a five-turn adaptive conversation.
// Question bank and prompt templates are static data; the controller owns
// all session state; the engine drives it against a `ModelBackend`.

pub mod controller;
pub mod engine;
pub mod handlers;
pub mod prompts;
pub mod questions;
pub mod replies;
pub mod session;

pub use controller::{EngineError, EngineSettings, Phase};
pub use engine::{Engine, Snapshot};
