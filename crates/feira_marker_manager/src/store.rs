use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use feira_marker_models::Marker;
use miette::{bail, Result};
use tracing::{debug, trace};

use crate::form::FormOutcome;

/// Marker list shared by every part of the screen.
/// Cloning the store clones the handle, all clones see the same list.
/// There is no validation here: whoever holds a handle may rewrite the whole list.
#[derive(Clone, Default)]
pub struct MarkerStore {
    markers: Arc<RwLock<Vec<Marker>>>,
    generation: Arc<AtomicU64>,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn from_markers(markers: Vec<Marker>) -> Self {
        Self {
            markers: Arc::new(RwLock::new(markers)),
            generation: Default::default(),
        }
    }

    // a writer that panicked mid-update leaves a Vec that is still valid, so poisoning is ignored
    fn read(&self) -> RwLockReadGuard<'_, Vec<Marker>> {
        self.markers.read().unwrap_or_else(|e| e.into_inner())
    }
    fn write(&self) -> RwLockWriteGuard<'_, Vec<Marker>> {
        self.markers.write().unwrap_or_else(|e| e.into_inner())
    }
    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    /// Bumped on every mutation that changed the list, failed ones leave it alone.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Vec<Marker> {
        self.read().clone()
    }
    pub fn len(&self) -> usize {
        self.read().len()
    }
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
    pub fn get(&self, index: usize) -> Option<Marker> {
        self.read().get(index).cloned()
    }

    pub fn replace_all(&self, markers: Vec<Marker>) {
        debug!("replacing all markers with {} new ones", markers.len());
        *self.write() = markers;
        self.bump();
    }

    pub fn push(&self, marker: Marker) -> usize {
        let mut markers = self.write();
        markers.push(marker);
        self.bump();
        markers.len() - 1
    }

    pub fn extend(&self, new_markers: Vec<Marker>) -> usize {
        let nb = new_markers.len();
        self.write().extend(new_markers);
        self.bump();
        debug!("appended {nb} markers");
        nb
    }

    pub fn update(&self, index: usize, marker: Marker) -> Result<()> {
        let mut markers = self.write();
        let len = markers.len();
        match markers.get_mut(index) {
            Some(slot) => {
                *slot = marker;
                self.bump();
                Ok(())
            }
            None => bail!("cannot update marker {index}, there are only {len} markers"),
        }
    }

    /// Markers after `index` move down by one.
    pub fn remove(&self, index: usize) -> Result<Marker> {
        let mut markers = self.write();
        if index >= markers.len() {
            bail!(
                "cannot delete marker {index}, there are only {} markers",
                markers.len()
            );
        }
        let removed = markers.remove(index);
        self.bump();
        Ok(removed)
    }

    pub fn apply(&self, outcome: FormOutcome, index: Option<usize>) -> Result<()> {
        trace!(?outcome, ?index, "applying form outcome");
        match (outcome, index) {
            (FormOutcome::Save(marker), Some(index)) => self.update(index, marker),
            (FormOutcome::Save(marker), None) => {
                self.push(marker);
                Ok(())
            }
            (FormOutcome::Delete, Some(index)) => self.remove(index).map(|_| ()),
            (FormOutcome::Delete, None) | (FormOutcome::Cancel, _) => Ok(()),
        }
    }
}
