// Interface adapters: the remote console wire layer, external clients and
// the consumer-facing HTTP/WS edge.

pub mod clients;
pub mod http;
pub mod net;
pub mod rcon;
pub mod state;
