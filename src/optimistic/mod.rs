//! Optimistic read-modify-write protocol for versioned documents.
//!
//! Used by the cluster-properties store and the config overlay to mutate
//! shared documents without a lock: read the current bytes and version,
//! apply the mutation, and write conditionally on the version still being
//! current. Conflicting writers each retry with a fresh read, so contention
//! resolves without coordination.


use tracing::error;
use tracing::warn;

use crate::CoordinationClient;
use crate::CoordinationError;
use crate::Error;
use crate::Result;

/// Apply `mutate` to the document at `path` until the write sticks.
///
/// `mutate` receives the current document bytes (`None` when the document
/// does not exist) and returns the full new content, or `None` when the
/// mutation changes nothing — a semantic no-op skips the write entirely,
/// regardless of how the current document happens to be formatted. Output
/// byte-equal to the current content is skipped too, avoiding needless
/// version churn. Version conflicts and concurrent creates restart the
/// loop with a fresh read; there is no retry bound, as conflicts are
/// expected to be rare and self-resolving. Any other coordination error is
/// wrapped and surfaced as fatal.
pub async fn update_document<C, F>(client: &C, path: &str, mutate: F) -> Result<()>
where
    C: CoordinationClient + ?Sized,
    F: Fn(Option<&[u8]>) -> Result<Option<Vec<u8>>>,
{
    loop {
        let current = match client.get_data(path, false).await {
            Ok(versioned) => Some(versioned),
            Err(Error::Coordination(CoordinationError::NotFound(_))) => None,
            Err(e) => return Err(fatal(path, e)),
        };

        let new_data = match mutate(current.as_ref().map(|c| c.data.as_slice()))? {
            Some(data) => data,
            None => return Ok(()),
        };

        match current {
            Some(versioned) => {
                if new_data == versioned.data {
                    // Don't touch the remote document unless necessary.
                    return Ok(());
                }
                match client.set_data(path, new_data, Some(versioned.version)).await {
                    Ok(_) => return Ok(()),
                    Err(Error::Coordination(e)) if e.is_conflict() => {
                        warn!(path, version = versioned.version, "lost optimistic write race, retrying");
                        continue;
                    }
                    Err(e) => return Err(fatal(path, e)),
                }
            }
            None => match client.create(path, new_data, true).await {
                Ok(()) => return Ok(()),
                Err(Error::Coordination(e)) if e.is_conflict() => {
                    warn!(path, "document created concurrently, retrying");
                    continue;
                }
                Err(e) => return Err(fatal(path, e)),
            },
        }
    }
}

fn fatal(path: &str, e: Error) -> Error {
    error!(path, error = %e, "error updating document");
    Error::Fatal(format!("Error updating document {path}: {e}"))
}
