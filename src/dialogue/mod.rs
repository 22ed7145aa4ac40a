//! The guided-conversation core: typed chat events in, prompts out, one
//! persistence call per completed flow.

pub mod backend;
pub mod engine;
pub mod event;
pub mod flows;
pub mod session;

pub use backend::{Backend, BackendError, StoreBackend};
pub use engine::DialogueEngine;
pub use event::{Button, CallbackToken, ChatEvent, Command, Reply};
pub use session::{Session, SessionStore};
