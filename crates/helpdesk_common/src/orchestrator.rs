//! Bulk ticket orchestration.
//!
//! Selects rows from the row store, expands the title and description
//! templates against each one and creates one ticket per row, strictly in
//! ascending row order and one call at a time. A failing row is recorded and
//! the run moves on; only an unusable store or an empty selection stops a run
//! before the first ticket.
//!
//! With `skip_header` the smallest stored row is always dropped as the header,
//! even when it holds data.

use crate::backend::RowStoreBackend;
use crate::error::{RunError, TicketingError};
use crate::row_store::RowStore;
use crate::template::{self, PlaceholderWarning};
use crate::ticketing::{TicketDraft, TicketingClient};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default per-ticket bound, matching the HTTP client's timeout.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

fn default_start() -> u32 {
    1
}

fn default_skip_header() -> bool {
    true
}

/// Rows shown by a preview that names no count.
pub const DEFAULT_PREVIEW_COUNT: usize = 5;

/// Parameters of a bulk submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkRequest {
    pub title: String,
    pub description: String,
    /// Maximum number of rows to submit
    pub count: usize,
    /// Lowest row number considered
    #[serde(default = "default_start")]
    pub start: u32,
    /// Drop the smallest row as a header
    #[serde(default = "default_skip_header")]
    pub skip_header: bool,
}

impl BulkRequest {
    pub fn new(title: impl Into<String>, description: impl Into<String>, count: usize) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            count,
            start: default_start(),
            skip_header: default_skip_header(),
        }
    }
}

/// Parameters of a preview. Selection rules are those of [`BulkRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRequest {
    pub title: String,
    pub description: String,
    /// Rows to show; [`DEFAULT_PREVIEW_COUNT`] when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default = "default_start")]
    pub start: u32,
    #[serde(default = "default_skip_header")]
    pub skip_header: bool,
}

/// Outcome of one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowDetail {
    /// Sheet row number; 0 when the run aborted before selecting rows
    pub row: u32,
    pub success: bool,
    pub message: String,
    /// Resolved title, when the row could be resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PlaceholderWarning>,
}

/// Aggregate of one bulk run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub total_processed: usize,
    pub successes: usize,
    pub errors: usize,
    pub details: Vec<RowDetail>,
}

impl ProcessingResult {
    /// Result of a run that stopped before any row was attempted.
    pub fn aborted(row: u32, reason: &RunError) -> Self {
        Self {
            total_processed: 0,
            successes: 0,
            errors: 1,
            details: vec![RowDetail {
                row,
                success: false,
                message: reason.to_string(),
                title: None,
                warnings: Vec::new(),
            }],
        }
    }

    /// Fold one row outcome into the totals.
    pub fn record(&mut self, detail: RowDetail) {
        if detail.success {
            self.successes += 1;
        } else {
            self.errors += 1;
        }
        self.details.push(detail);
    }

    /// Human summary, e.g. "8 ticket(s) created. 2 failed."
    pub fn summary(&self) -> String {
        let mut text = format!("{} ticket(s) created.", self.successes);
        if self.errors > 0 {
            text.push_str(&format!(" {} failed.", self.errors));
        }
        text
    }
}

/// One previewed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewItem {
    pub row: u32,
    pub title: String,
    pub description: String,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PlaceholderWarning>,
}

/// What a submission with the same parameters would send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    /// Rows eligible after header skip and start filter
    pub total_rows_available: usize,
    pub items: Vec<PreviewItem>,
}

/// Rows chosen for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Eligible rows before the count cap
    pub available: usize,
    /// Rows to process, ascending
    pub ordinals: Vec<u32>,
}

/// Header skip, start filter and count cap over the stored rows.
pub fn select_ordinals(store: &RowStore, skip_header: bool, start: u32, count: usize) -> Selection {
    let header = if skip_header {
        store.ordinals().next()
    } else {
        None
    };
    let eligible: Vec<u32> = store
        .ordinals()
        .filter(|o| Some(*o) != header)
        .filter(|o| *o >= start)
        .collect();
    let available = eligible.len();
    let ordinals = eligible.into_iter().take(count).collect();
    Selection {
        available,
        ordinals,
    }
}

/// A row with both templates expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedRow {
    pub title: String,
    pub description: String,
    pub warnings: Vec<PlaceholderWarning>,
}

/// Expand both templates for `ordinal`, or `None` when the row is absent.
pub(crate) fn resolve_row(
    store: &RowStore,
    ordinal: u32,
    title: &str,
    description: &str,
) -> Option<ResolvedRow> {
    let row = store.get(ordinal)?;
    let title = template::resolve(title, row);
    let description = template::resolve(description, row);
    let mut warnings = title.warnings;
    for w in description.warnings {
        if !warnings.contains(&w) {
            warnings.push(w);
        }
    }
    Some(ResolvedRow {
        title: title.text,
        description: description.text,
        warnings,
    })
}

fn row_missing(ordinal: u32) -> String {
    format!("row {} not found", ordinal)
}

/// Drives previews and bulk submissions against one row store backend.
pub struct BulkOrchestrator {
    backend: Arc<dyn RowStoreBackend>,
    client: Arc<dyn TicketingClient>,
    call_timeout: Duration,
}

impl BulkOrchestrator {
    pub fn new(backend: Arc<dyn RowStoreBackend>, client: Arc<dyn TicketingClient>) -> Self {
        Self {
            backend,
            client,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Bound on each ticketing call; exceeding it fails that row only.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    async fn load(&self) -> Result<RowStore, RunError> {
        match self.backend.load().await {
            Ok(Some(store)) if !store.is_empty() => {
                debug!("Row store loaded: {} row(s)", store.len());
                Ok(store)
            }
            Ok(_) => {
                warn!("Row store is empty or missing");
                Err(RunError::StoreUnavailable)
            }
            Err(e) => {
                error!("Failed to load row store: {}", e);
                Err(RunError::StoreUnavailable)
            }
        }
    }

    /// Resolve the selected rows without creating tickets.
    pub async fn preview(&self, req: &PreviewRequest) -> Result<Preview, RunError> {
        let store = self.load().await?;
        let count = req.count.unwrap_or(DEFAULT_PREVIEW_COUNT);
        let selection = select_ordinals(&store, req.skip_header, req.start, count);
        if selection.ordinals.is_empty() {
            return Err(RunError::NoRowsSelected { start: req.start });
        }

        let items = selection
            .ordinals
            .iter()
            .map(|&ordinal| {
                match resolve_row(&store, ordinal, &req.title, &req.description) {
                    Some(resolved) => PreviewItem {
                        row: ordinal,
                        title: resolved.title,
                        description: resolved.description,
                        error: None,
                        warnings: resolved.warnings,
                    },
                    None => PreviewItem {
                        row: ordinal,
                        title: req.title.clone(),
                        description: req.description.clone(),
                        error: Some(row_missing(ordinal)),
                        warnings: Vec::new(),
                    },
                }
            })
            .collect();

        Ok(Preview {
            total_rows_available: selection.available,
            items,
        })
    }

    /// Create one ticket per selected row.
    pub async fn run(&self, requester: &str, req: &BulkRequest) -> ProcessingResult {
        let store = match self.load().await {
            Ok(store) => store,
            Err(e) => return ProcessingResult::aborted(0, &e),
        };

        let selection = select_ordinals(&store, req.skip_header, req.start, req.count);
        if selection.ordinals.is_empty() {
            let e = RunError::NoRowsSelected { start: req.start };
            warn!("{}", e);
            return ProcessingResult::aborted(req.start, &e);
        }

        info!(
            "Creating {} ticket(s) starting at row {}",
            selection.ordinals.len(),
            req.start
        );

        let mut result = ProcessingResult {
            total_processed: selection.ordinals.len(),
            ..ProcessingResult::default()
        };

        for &ordinal in &selection.ordinals {
            let detail = self.process_row(&store, ordinal, requester, req).await;
            result.record(detail);
        }

        info!(
            "Bulk run finished: {} success(es), {} error(s)",
            result.successes, result.errors
        );
        result
    }

    /// [`run`](Self::run), then clear the row store whatever the outcome.
    pub async fn submit(&self, requester: &str, req: &BulkRequest) -> ProcessingResult {
        let result = self.run(requester, req).await;
        if let Err(e) = self.backend.clear().await {
            warn!("Failed to clear row store after submission: {}", e);
        }
        result
    }

    async fn process_row(
        &self,
        store: &RowStore,
        ordinal: u32,
        requester: &str,
        req: &BulkRequest,
    ) -> RowDetail {
        let Some(resolved) = resolve_row(store, ordinal, &req.title, &req.description) else {
            warn!("Row {}: not found", ordinal);
            return RowDetail {
                row: ordinal,
                success: false,
                message: row_missing(ordinal),
                title: None,
                warnings: Vec::new(),
            };
        };

        let draft = TicketDraft::new(requester, &resolved.title, &resolved.description);
        let call = self.client.create_ticket(&draft);
        let outcome = tokio::time::timeout(self.call_timeout, call)
            .await
            .unwrap_or(Err(TicketingError::Timeout(self.call_timeout.as_secs())));

        match outcome {
            Ok(_) => {
                debug!("Row {}: ticket created", ordinal);
                RowDetail {
                    row: ordinal,
                    success: true,
                    message: "ticket created".to_string(),
                    title: Some(resolved.title),
                    warnings: resolved.warnings,
                }
            }
            Err(e) => {
                warn!("Row {}: {}", ordinal, e);
                RowDetail {
                    row: ordinal,
                    success: false,
                    message: format!("failed to create ticket: {}", e),
                    title: Some(resolved.title),
                    warnings: resolved.warnings,
                }
            }
        }
    }
}
