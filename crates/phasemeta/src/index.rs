//! Derives [`Phase`] keyed maps from the cached records.

use std::collections::HashMap;

use crate::cell::LazyFetchCell;
use crate::error::FetchError;
use crate::records::{Phase, RawMetadataRecord};
use crate::sources::MetadataSource;

/// A map from every known [`Phase`] to a value of type `T`.
pub type PhaseIndex<T> = HashMap<Phase, T>;

/// Maps each record to its [`Phase`], with a value produced by `default_value`.
///
/// Records are processed in order. As phases are equal by `phase_id` alone, a later record with
/// an already seen `phase_id` replaces the earlier entry, *including* the `phase_type` and
/// `product_letter` stored in its key. The value is not derived from the record in any way.
pub fn index_records<T, F>(records: &[RawMetadataRecord], mut default_value: F) -> PhaseIndex<T>
where
    F: FnMut() -> T,
{
    let mut index = HashMap::with_capacity(records.len());

    for record in records {
        let phase = Phase::from(record);
        // `insert` alone would keep the old key, so the old entry has to go first.
        index.remove(&phase);
        index.insert(phase, default_value());
    }

    index
}

/// Builds [`PhaseIndex`]es from the records memoized in a [`LazyFetchCell`].
///
/// Every index built by the same builder shares the one underlying fetch; the value type of the
/// index has no influence on fetching.
#[derive(Debug, Clone)]
pub struct PhaseIndexBuilder<S> {
    cell: LazyFetchCell<S>,
}

impl<S: MetadataSource> PhaseIndexBuilder<S> {
    pub fn new(cell: LazyFetchCell<S>) -> Self {
        Self { cell }
    }

    /// The cell the records are read from.
    pub fn cell(&self) -> &LazyFetchCell<S> {
        &self.cell
    }

    /// Builds a map from every phase to a value produced by `default_value`.
    ///
    /// See [`index_records`] for how records sharing a `phase_id` are collapsed.
    ///
    /// # Errors
    ///
    /// Fails with the unchanged fetch error if the records could not be fetched. A partial
    /// index is never returned.
    pub async fn build_index<T, F>(&self, default_value: F) -> Result<PhaseIndex<T>, FetchError>
    where
        F: FnMut() -> T,
    {
        let records = self.cell.get_or_fetch().await?;
        Ok(index_records(&records, default_value))
    }

    /// Builds a map from every phase to `T::default()`.
    pub async fn build_default_index<T: Default>(&self) -> Result<PhaseIndex<T>, FetchError> {
        self.build_index(T::default).await
    }
}
