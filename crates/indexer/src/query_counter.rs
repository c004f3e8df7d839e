use std::collections::HashMap;

/// Per-word query counts accumulated since the last drain.
#[derive(Debug, Default)]
pub struct QueryCounter {
    counts: HashMap<String, u64>,
}

impl QueryCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, word: &str) {
        match self.counts.get_mut(word) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(word.to_string(), 1);
            }
        }
    }

    /// Hands out the whole mapping and leaves an empty one behind.
    pub fn drain_all(&mut self) -> HashMap<String, u64> {
        std::mem::take(&mut self.counts)
    }

    /// Distinct words counted since the last drain.
    pub fn size(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn count(&self, word: &str) -> u64 {
        self.counts.get(word).copied().unwrap_or(0)
    }
}
