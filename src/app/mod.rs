// Application layer: HTTP surface and terminal chat on top of the core service.

pub mod chat;
pub mod render;
pub mod server;
