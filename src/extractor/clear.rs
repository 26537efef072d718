//! Bulk removal of every document in the metadata collection.

use crate::gcp::{GcpError, MetadataStore};
use std::collections::HashSet;

/// Documents fetched and deleted per pass.
pub const DEFAULT_CLEAR_BATCH_SIZE: usize = 100;

/// Delete every document in the collection, one page at a time.
///
/// Stops after the first page holding fewer than `batch_size` documents, so an empty
/// collection costs a single list call. A page made only of documents already deleted in
/// this run also ends the loop. Returns the number of documents deleted.
pub async fn clear_collection(
    store: &dyn MetadataStore,
    batch_size: usize,
) -> Result<usize, GcpError> {
    let batch_size = batch_size.max(1);
    let mut deleted: HashSet<String> = HashSet::new();

    loop {
        let page = store.list_page(batch_size).await?;
        let page_len = page.len();
        let mut progressed = false;

        for document in page {
            if deleted.contains(&document.id) {
                continue;
            }
            tracing::info!(document_id = %document.id, fields = ?document.fields, "Deleting document");
            store.delete(&document.id).await?;
            deleted.insert(document.id);
            progressed = true;
        }

        if page_len < batch_size || !progressed {
            break;
        }
    }

    tracing::info!(deleted = deleted.len(), "Metadata collection cleared");
    Ok(deleted.len())
}
