//! HTTP Handlers

mod cache;
mod guild;
mod music;
mod ping;
mod stream;
mod websocket;

pub use cache::*;
pub use guild::*;
pub use music::*;
pub use ping::*;
pub use stream::*;
pub use websocket::*;
