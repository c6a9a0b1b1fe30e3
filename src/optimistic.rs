use crate::errors::{AppError, AppResult};
use crate::models::Entity;
use std::future::Future;

pub trait SnapshotCell<T> {
    fn get_by_id(&self, id: &str) -> Option<T>;

    /// Returns false when no record with `id` is present.
    fn replace(&self, id: &str, value: T) -> bool;
}

/// Pending mutation: snapshot, apply locally, then commit or revert.
///
/// `commit` is only polled once the optimistic value is visible in `cell`. A missing record
/// fails with `NotFound` before `commit` is ever polled.
pub async fn apply_optimistic<T, C, M, F>(cell: &C, id: &str, mutate: M, commit: F) -> AppResult<T>
where
    T: Entity,
    C: SnapshotCell<T> + ?Sized,
    M: FnOnce(&T) -> T,
    F: Future<Output = AppResult<T>>,
{
    let original = cell
        .get_by_id(id)
        .ok_or_else(|| AppError::NotFound(format!("{} {} not found", T::KIND, id)))?;
    cell.replace(id, mutate(&original));

    match commit.await {
        Ok(authoritative) => {
            cell.replace(id, authoritative.clone());
            Ok(authoritative)
        }
        Err(error) => {
            cell.replace(id, original);
            Err(error)
        }
    }
}
