//! Fleet management: proxy identity, the sync protocol, and the registry
//! service that backs it.

pub mod identity;
pub mod proxy;
pub mod registry;
pub mod sync;

pub use identity::{resolve_register_decision, RegisterDecision};
pub use proxy::{LogLine, Proxy, ProxySample};
pub use registry::FleetRegistryService;
pub use sync::{
    AckRequest, LogLineDto, LogsRequest, PollConfigPayload, PollResponse, RegisterRequest,
    RegisterResponse, StatsRequest,
};
