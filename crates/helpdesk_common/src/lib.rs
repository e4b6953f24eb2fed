//! Helpdesk Common - bulk ticket generation core.
//!
//! Spreadsheet rows become tickets: `ingest` reads a sheet into a
//! `RowStore`, a backend keeps it between the upload and the submit step,
//! `template` expands `<A>`-style placeholders per row, and `orchestrator`
//! creates one ticket per selected row through a `TicketingClient`.

pub mod backend;
pub mod config;
pub mod error;
pub mod ingest;
pub mod orchestrator;
pub mod row_store;
pub mod session;
pub mod template;
pub mod ticketing;

pub use backend::{FileRowStore, RowStoreBackend};
pub use config::Config;
pub use error::{ConfigError, IngestError, RunError, StoreError, StoreFormatError, TicketingError};
pub use ingest::{ingest_into, SheetSource};
pub use orchestrator::{
    select_ordinals, BulkOrchestrator, BulkRequest, Preview, PreviewItem, PreviewRequest,
    ProcessingResult, RowDetail, Selection, DEFAULT_PREVIEW_COUNT,
};
pub use row_store::{Row, RowStore};
pub use session::{SessionCache, SessionId, SessionSlot};
pub use template::{resolve, PlaceholderWarning, Resolution};
pub use ticketing::{
    is_valid_email, HttpTicketingClient, RecordingTicketingClient, TicketDraft, TicketReceipt,
    TicketingClient,
};

/// Crate version, reported by the daemon and the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
