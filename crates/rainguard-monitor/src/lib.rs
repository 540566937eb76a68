pub mod config;
pub mod feed;
pub mod logging;
pub mod snapshot;
pub mod store;
pub mod transport;

pub use store::DashboardStore;
pub use transport::{spawn_transport, ConnectionPhase, TransportConfig, TransportHandle};
