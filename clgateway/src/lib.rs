//! Component I: the realtime gateway. Central event router between
//! websocket connections and the per-lobby state machines in `cllobby`,
//! plus the background song/cover caching it kicks off on `queue:add`.

mod gateway;
mod protocol;
mod socket;

pub use gateway::Gateway;
pub use socket::ws_handler;
