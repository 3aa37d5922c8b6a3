//! Batch tracker engine: event-stream connection, snapshot API and the
//! effect-executing monitor loop.
mod api;
mod connection;
mod monitor;
mod presenter;
mod transport;

pub use api::{ApiError, ApiSettings, ReqwestSnapshotApi, SnapshotApi};
pub use connection::{ConnectionHandle, ConnectionManager, ConnectionSettings, ReconnectState};
pub use monitor::{BatchMonitor, MonitorSettings};
pub use presenter::StatusPresenter;
pub use transport::{Connector, Link, TransportError, WsConnector};
