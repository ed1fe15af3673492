//! Recording session lifecycle.

mod controller;
mod error;
mod events;
mod status;
mod timer;

pub use controller::{SaveLocationPrompt, AcceptDefaultPrompt, SessionController, StopOutcome};
pub use error::SessionError;
pub use events::{EventBus, EventSubscription, SessionEvent};
pub use status::{SessionPhase, SessionState, SessionStatusHandle};
pub use timer::{format_elapsed, SessionTimer};
