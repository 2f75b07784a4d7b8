//! Realtime chat: wire frames, the socket session, conversation bootstrap
//! and the transcript state the front-ends render.

pub mod bootstrap;
pub mod controller;
pub mod frame;
pub mod session;
pub mod state;
pub mod transport;

pub use controller::ChatController;
pub use frame::{InboundFrame, OutboundFrame, ProductOption};
pub use session::{ConnectionState, ConversationHandle, SessionEvent, SessionHandle};
pub use state::{ChatState, Message};
pub use transport::{Connector, WsConnector};
