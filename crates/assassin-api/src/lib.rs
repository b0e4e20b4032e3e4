//! HTTP facade over the game engine: JSON routes for the operator and player
//! surfaces, plus a websocket fan-out of outbound game notifications.

mod server;

pub use server::{serve, ServerError};
