//! Optica Capture Engine
//!
//! Applies negotiated capture settings to a device transactionally and runs
//! the recording lifecycle on top of it.
//!
//! # Architecture
//!
//! ```text
//!  SessionHandle ──mpsc──▶ SessionWorker
//!       ▲                    └─ ConfigurationManager
//!       │ watch<SessionState>      └─ Transaction ─▶ CaptureDevice, OutputSink
//!       │                                (ConfigurationLock per mutation)
//!  RecordingLifecycle ─▶ OutputSink ─▶ completion ─▶ PersistenceSink
//!       │
//!       └─ mpsc<RecordingEvent>
//!
//!  EventBus: broadcast<ErrorEvent> from every component
//! ```

pub mod backend;
pub mod events;
pub mod library;
pub mod lock;
pub mod manager;
pub mod recorder;
pub mod service;
pub mod transaction;
pub mod worker;

pub use backend::{CaptureDevice, OutputSink, PersistenceSink};
pub use events::EventBus;
pub use library::{DestinationAllocator, LibraryDirectory};
pub use manager::ConfigurationManager;
pub use recorder::{RecordingEvent, RecordingLifecycle};
pub use service::CaptureService;
pub use worker::{SessionCommand, SessionHandle};
