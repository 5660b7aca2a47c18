//! Connection-activity scaler: a TCP proxy that keeps a single-replica
//! workload at zero replicas while nobody is connected.

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod orchestrator;
pub mod proxy;
pub mod scaling;

pub use config::schema::ScalerConfig;
pub use lifecycle::Shutdown;
pub use proxy::ProxyServer;
pub use scaling::ScaleController;
