// src/batch.rs

//! Sequential batch driver.
//!
//! Several callers need "act on each item, stop on the first hard failure"
//! with strict ordering, e.g. the per-service resource-affinity lookups that
//! must not race each other.

use std::future::Future;

/// Invoke `action` on each item strictly in input order, awaiting each call
/// before starting the next.
///
/// Stops and propagates immediately on the first error, leaving later items
/// untouched. Callers that want partial-failure tolerance catch inside
/// `action` itself.
pub async fn for_each_sequential<I, T, F, Fut, E>(items: I, mut action: F) -> Result<(), E>
where
    I: IntoIterator<Item = T>,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    for item in items {
        action(item).await?;
    }
    Ok(())
}
