mod feed;
mod websocket;

pub use feed::{PixelEvent, PixelFeed};
pub use websocket::router;
