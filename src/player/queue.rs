use crate::domain::MediaRecord;
use rand::{Rng, seq::SliceRandom};
use std::sync::Arc;

/// Working order plus the order the queue was opened with, so shuffling
/// can be undone without going back to the catalog.
#[derive(Debug, Default, Clone)]
pub struct PlaybackQueue {
    original: Vec<Arc<MediaRecord>>,
    working: Vec<Arc<MediaRecord>>,
    position: Option<usize>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue. When `shuffle` is set the start item is moved to
    /// the front of a shuffled working order and the cursor is reset to 0.
    pub fn open<R: Rng + ?Sized>(
        &mut self,
        records: Vec<Arc<MediaRecord>>,
        start: usize,
        shuffle: bool,
        rng: &mut R,
    ) {
        self.original = records.clone();
        self.working = records;

        match shuffle {
            true => {
                Self::shuffle_keeping_first(&mut self.working, start, rng);
                self.position = Some(0);
            }
            false => self.position = Some(start),
        }
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let current = self.position.unwrap_or(0);
        Self::shuffle_keeping_first(&mut self.working, current, rng);
        if self.position.is_some() {
            self.position = Some(0);
        }
    }

    /// Restore the original order and follow the current item to its index
    /// there.
    pub fn unshuffle(&mut self) {
        let current = self.current();
        self.working = self.original.clone();

        self.position = match current {
            Some(current) => self
                .working
                .iter()
                .position(|r| r.is_same_item(&current))
                .or(Some(0)),
            None => None,
        };
    }

    fn shuffle_keeping_first<R: Rng + ?Sized>(
        list: &mut Vec<Arc<MediaRecord>>,
        keep: usize,
        rng: &mut R,
    ) {
        if keep < list.len() {
            let first = list.remove(keep);
            list.shuffle(rng);
            list.insert(0, first);
        } else {
            list.shuffle(rng);
        }
    }

    pub fn add(&mut self, record: Arc<MediaRecord>) {
        self.original.push(Arc::clone(&record));
        self.working.push(record);
    }

    pub fn clear(&mut self) {
        self.original.clear();
        self.working.clear();
        self.position = None;
    }

    pub fn set_position(&mut self, position: usize) {
        if position < self.working.len() {
            self.position = Some(position);
        }
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn current(&self) -> Option<Arc<MediaRecord>> {
        self.position.and_then(|p| self.get(p))
    }

    pub fn get(&self, index: usize) -> Option<Arc<MediaRecord>> {
        self.working.get(index).cloned()
    }

    pub fn is_last(&self) -> bool {
        match self.position {
            Some(p) => p + 1 >= self.working.len(),
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.working.len()
    }

    pub fn is_empty(&self) -> bool {
        self.working.is_empty()
    }

    pub fn records(&self) -> &[Arc<MediaRecord>] {
        &self.working
    }

    pub fn original(&self) -> &[Arc<MediaRecord>] {
        &self.original
    }
}
