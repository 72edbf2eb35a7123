use std::{collections::VecDeque, sync::Mutex};

use hashlink::LinkedHashMap;
use log::trace;

use crate::{
    config::{FrameId, ReplacerOptions},
    error::ReplacerError,
};

/// Kind of access that touched a frame. Carried for bookkeeping only, the
/// eviction policy does not look at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessType {
    #[default]
    Unknown,
    Lookup,
    Scan,
    Index,
}

pub trait Replacer {
    fn record_access(&self, frame_id: FrameId, access_type: AccessType);
    fn set_evictable(&self, frame_id: FrameId, evictable: bool);
    fn remove(&self, frame_id: FrameId) -> Result<(), ReplacerError>;
    fn evict(&self) -> Option<FrameId>;
    fn size(&self) -> usize;
}

#[derive(Debug)]
struct LRUKNode {
    // Oldest timestamp at the front, at most k entries
    history: VecDeque<usize>,
    is_evictable: bool,
}

impl LRUKNode {
    fn new(k: usize) -> Self {
        LRUKNode {
            history: VecDeque::with_capacity(k),
            is_evictable: false,
        }
    }

    fn push_timestamp(&mut self, timestamp: usize, k: usize) {
        if self.history.len() == k {
            self.history.pop_front();
        }
        self.history.push_back(timestamp);
    }

    fn oldest(&self) -> usize {
        // A node is only created together with its first access.
        self.history.front().copied().unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct ReplacerState {
    node_store: LinkedHashMap<FrameId, LRUKNode>,
    current_timestamp: usize,
    evictable_size: usize,
}

impl ReplacerState {
    fn remove_evictable(&mut self, frame_id: FrameId) -> Result<(), ReplacerError> {
        let Some(node) = self.node_store.get(&frame_id) else {
            return Ok(());
        };
        if !node.is_evictable {
            return Err(ReplacerError::NotEvictable { frame_id });
        }

        self.node_store.remove(&frame_id);
        self.evictable_size -= 1;
        Ok(())
    }

    // Frames short of k accesses have an infinite backward distance and always
    // win; among them the earliest first access goes. Otherwise the largest
    // distance to the k-th most recent access goes.
    fn pick_victim(&self, k: usize) -> Option<FrameId> {
        let mut infinite: Option<(FrameId, usize)> = None;
        let mut finite: Option<(FrameId, usize)> = None;

        for (&frame_id, node) in self.node_store.iter() {
            if !node.is_evictable {
                continue;
            }

            let oldest = node.oldest();
            if node.history.len() < k {
                if infinite.map_or(true, |(_, best)| oldest < best) {
                    infinite = Some((frame_id, oldest));
                }
            } else {
                let distance = self.current_timestamp - oldest;
                if finite.map_or(true, |(_, best)| distance > best) {
                    finite = Some((frame_id, distance));
                }
            }
        }

        infinite.or(finite).map(|(frame_id, _)| frame_id)
    }
}

/// LRU-K page replacement. Every operation runs under one latch covering the
/// access histories, the logical clock and the evictable count.
pub struct LRUKReplacer {
    state: Mutex<ReplacerState>,
    replacer_size: usize,
    k: usize,
}

impl LRUKReplacer {
    pub fn new(num_frames: usize, k: usize) -> Self {
        assert!(num_frames > 0, "replacer needs at least one frame");
        assert!(k > 0, "k must be at least 1");

        LRUKReplacer {
            state: Mutex::new(ReplacerState::default()),
            replacer_size: num_frames,
            k,
        }
    }

    pub fn with_options(options: ReplacerOptions) -> Self {
        Self::new(options.num_frames, options.k)
    }

    pub fn capacity(&self) -> usize {
        self.replacer_size
    }

    pub fn k(&self) -> usize {
        self.k
    }

    #[cfg(test)]
    pub(crate) fn history(&self, frame_id: FrameId) -> Option<Vec<usize>> {
        let state = self.state.lock().unwrap();
        state
            .node_store
            .get(&frame_id)
            .map(|node| node.history.iter().copied().collect())
    }
}

impl Replacer for LRUKReplacer {
    fn record_access(&self, frame_id: FrameId, _access_type: AccessType) {
        assert!(
            (frame_id as usize) < self.replacer_size,
            "frame id {} out of range for replacer of {} frames",
            frame_id,
            self.replacer_size
        );

        let mut state = self.state.lock().unwrap();
        let timestamp = state.current_timestamp;
        let k = self.k;

        state
            .node_store
            .entry(frame_id)
            .or_insert_with(|| LRUKNode::new(k))
            .push_timestamp(timestamp, k);

        state.current_timestamp += 1;
    }

    fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        let mut state = self.state.lock().unwrap();

        let Some(node) = state.node_store.get_mut(&frame_id) else {
            return;
        };
        if node.is_evictable == evictable {
            return;
        }
        node.is_evictable = evictable;

        if evictable {
            state.evictable_size += 1;
        } else {
            state.evictable_size -= 1;
        }
    }

    fn remove(&self, frame_id: FrameId) -> Result<(), ReplacerError> {
        self.state.lock().unwrap().remove_evictable(frame_id)
    }

    fn evict(&self) -> Option<FrameId> {
        let mut state = self.state.lock().unwrap();
        if state.evictable_size == 0 {
            return None;
        }

        let victim = state.pick_victim(self.k)?;
        state.remove_evictable(victim).ok()?;

        trace!("evicted frame {}", victim);
        Some(victim)
    }

    fn size(&self) -> usize {
        self.state.lock().unwrap().evictable_size
    }
}

#[cfg(test)]
pub mod test {
    use super::{AccessType, LRUKReplacer, Replacer};

    #[test]
    fn pinned_pages_outlive_a_scan() {
        let replacer = LRUKReplacer::new(6, 2);

        // Index pages 0 and 1 are hot and stay pinned while 2..6 are scanned once.
        for _ in 0..2 {
            replacer.record_access(0, AccessType::Index);
            replacer.record_access(1, AccessType::Index);
        }
        for frame_id in 2..6 {
            replacer.record_access(frame_id, AccessType::Scan);
            replacer.set_evictable(frame_id, true);
        }
        assert_eq!(4, replacer.size());

        // Scanned frames go in scan order.
        assert_eq!(Some(2), replacer.evict());
        assert_eq!(Some(3), replacer.evict());

        // Unpinned, the hot frames have full windows and lose to the
        // remaining scan frames.
        replacer.set_evictable(0, true);
        replacer.set_evictable(1, true);
        assert_eq!(4, replacer.size());
        assert_eq!(Some(4), replacer.evict());
        assert_eq!(Some(5), replacer.evict());

        // Frame 0's window [0, 2] is older than frame 1's [1, 3].
        assert_eq!(Some(0), replacer.evict());

        replacer.set_evictable(1, false);
        assert_eq!(None, replacer.evict());
        assert_eq!(0, replacer.size());
        assert_eq!(Some(vec![1, 3]), replacer.history(1));
    }
}
