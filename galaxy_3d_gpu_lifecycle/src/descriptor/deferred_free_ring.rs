/// One bin of pending-free slot indices per frame in flight
#[derive(Debug, Clone)]
pub struct DeferredFreeRing {
    bins: Vec<Vec<u32>>,
}

impl DeferredFreeRing {
    /// Create `frame_count` empty bins
    pub fn new(frame_count: u32) -> Self {
        Self {
            bins: vec![Vec::new(); frame_count as usize],
        }
    }

    /// Number of bins
    pub fn frame_count(&self) -> u32 {
        self.bins.len() as u32
    }

    /// Queue `index` for release once `frame` retires
    ///
    /// Returns `false` if `frame` has no bin.
    pub fn push(&mut self, frame: u32, index: u32) -> bool {
        match self.bins.get_mut(frame as usize) {
            Some(bin) => {
                bin.push(index);
                true
            }
            None => false,
        }
    }

    /// Empty the bin of `frame`, returning its indices in free order
    pub fn drain(&mut self, frame: u32) -> Vec<u32> {
        self.bins.get_mut(frame as usize).map(std::mem::take).unwrap_or_default()
    }

    /// Number of indices waiting in the bin of `frame`
    pub fn len(&self, frame: u32) -> usize {
        self.bins.get(frame as usize).map_or(0, Vec::len)
    }

    /// Number of indices waiting in all bins
    pub fn total_len(&self) -> usize {
        self.bins.iter().map(Vec::len).sum()
    }

    /// Whether every bin is empty
    pub fn is_empty(&self) -> bool {
        self.bins.iter().all(Vec::is_empty)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "deferred_free_ring_tests.rs"]
mod tests;
