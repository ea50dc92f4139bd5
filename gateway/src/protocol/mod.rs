pub mod codec;
mod message;
mod templates;

pub use codec::{decode, encode, read_message, write_message};
pub use message::{Message, MessageType};
pub use templates::Template;
