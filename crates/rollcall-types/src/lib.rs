mod record;
mod rpc;

pub use record::*;
pub use rpc::*;

pub const DEFAULT_BIND: &str = "127.0.0.1:4000";
