//! Message-level surface over the engine for a UI host.
//!
//! A host owns one [`SessionState`], decodes each incoming message into a
//! [`UiToEngine`] and sends back the [`EngineToUi`] that [`dispatch`] returns.

pub mod dispatch;
pub mod messages;
pub mod session;

pub use dispatch::{dispatch, process_message};
pub use messages::{EngineToUi, ModelView, UiToEngine};
pub use session::{BridgeError, SessionState};
