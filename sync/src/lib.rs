//! # LiftLog Sync
//!
//! The async runtime around [`liftlog_engine`]: scheduling, transport,
//! and the push loop. The engine decides *what* to send; this crate
//! decides *when* and moves the bytes.
//!
//! A [`SyncOrchestrator`] owns a shared [`DeviceStore`] behind a tokio
//! mutex and a [`SyncTransport`] implementation, and runs cycles either
//! on demand ([`SyncOrchestrator::sync_once`]) or on a fixed interval
//! ([`SyncOrchestrator::run`]) until a [`CancelToken`] fires.
//!
//! [`DeviceStore`]: liftlog_engine::DeviceStore

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod transport;

pub use config::{ConfigError, SyncConfig};
pub use error::{Result, SyncError};
pub use orchestrator::{CancelToken, SyncOrchestrator, SyncReport};
pub use transport::{InMemoryTransport, PushAck, SyncTransport, TransportError};
