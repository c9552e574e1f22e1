/// Command gating and routing to the generation flows
pub mod dispatcher;
/// Telegram sends and edits with retry
pub mod resilient;
/// Telegram implementations of the chat seams
pub mod transport;

pub use dispatcher::{CommandDispatcher, InboundMessage};
pub use transport::{ChatChannel, TelegramChannel};
