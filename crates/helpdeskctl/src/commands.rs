//! Command handlers for helpdeskctl.
//!
//! Every handler works on a [`FileRowStore`], so `ingest`, `preview` and
//! `submit` can run as separate invocations against the same file.

use anyhow::{bail, Context, Result};
use helpdesk_common::{
    ingest_into, is_valid_email, BulkOrchestrator, BulkRequest, FileRowStore, Preview,
    PreviewRequest, ProcessingResult, SheetSource, TicketDraft, TicketReceipt, TicketingClient,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Orchestrator over the on-disk row store.
pub fn orchestrator(
    store: &FileRowStore,
    client: Arc<dyn TicketingClient>,
    call_timeout: Duration,
) -> BulkOrchestrator {
    BulkOrchestrator::new(Arc::new(store.clone()), client).with_call_timeout(call_timeout)
}

/// Replace the store's rows with the first worksheet of `sheet`.
pub async fn ingest(store: &FileRowStore, sheet: &Path) -> Result<usize> {
    let rows = ingest_into(store, SheetSource::Path(sheet.to_path_buf()))
        .await
        .with_context(|| format!("Failed to ingest {}", sheet.display()))?;
    info!("{} row(s) written to {}", rows, store.path().display());
    Ok(rows)
}

pub async fn preview(orchestrator: &BulkOrchestrator, req: &PreviewRequest) -> Result<Preview> {
    Ok(orchestrator.preview(req).await?)
}

/// Create one ticket per selected row.
///
/// A dry run resolves and "sends" through whatever client it was given but
/// leaves the row store in place; a real submission clears it.
pub async fn submit(
    orchestrator: &BulkOrchestrator,
    requester: &str,
    req: &BulkRequest,
    dry_run: bool,
) -> Result<ProcessingResult> {
    check_requester(requester)?;
    let result = if dry_run {
        orchestrator.run(requester, req).await
    } else {
        orchestrator.submit(requester, req).await
    };
    Ok(result)
}

/// Create a single ticket without touching the row store.
pub async fn ticket(client: &dyn TicketingClient, draft: &TicketDraft) -> Result<TicketReceipt> {
    check_requester(&draft.requester)?;
    client
        .create_ticket(draft)
        .await
        .context("Failed to create ticket")
}

fn check_requester(requester: &str) -> Result<()> {
    if !is_valid_email(requester) {
        bail!("Invalid requester e-mail '{}'", requester);
    }
    Ok(())
}
