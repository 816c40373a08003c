use indexmap::IndexMap;

use super::surface::BufferId;
use crate::display::FramebufferId;

pub const FRAMEBUFFER_CACHE_CAP: usize = 4;

/// Buffer identity -> controller framebuffer. Insertion order doubles as
/// eviction order. The framebuffer currently on screen is never evicted.
#[derive(Debug)]
pub struct FramebufferCache {
    entries: IndexMap<BufferId, FramebufferId>,
    cap: usize,
}

impl Default for FramebufferCache {
    fn default() -> Self {
        Self::with_cap(FRAMEBUFFER_CACHE_CAP)
    }
}

impl FramebufferCache {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            cap: cap.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, buffer: BufferId) -> Option<FramebufferId> {
        self.entries.get(&buffer).copied()
    }

    pub fn contains_framebuffer(&self, framebuffer: FramebufferId) -> bool {
        self.entries.values().any(|fb| *fb == framebuffer)
    }

    /// Inserts a new entry, first evicting so the cache never exceeds its
    /// cap. Returns the framebuffers that must be destroyed.
    pub fn insert(
        &mut self,
        buffer: BufferId,
        framebuffer: FramebufferId,
        current: Option<FramebufferId>,
    ) -> Vec<FramebufferId> {
        let evicted = self.evict_to(self.cap - 1, current);
        self.entries.insert(buffer, framebuffer);
        evicted
    }

    /// Evicts oldest-first until at most `cap` entries remain.
    pub fn evict_over_cap(
        &mut self,
        current: Option<FramebufferId>,
    ) -> Vec<FramebufferId> {
        self.evict_to(self.cap, current)
    }

    pub fn drain_except(
        &mut self,
        current: Option<FramebufferId>,
    ) -> Vec<FramebufferId> {
        self.evict_to(0, current)
    }

    pub fn drain_all(&mut self) -> Vec<FramebufferId> {
        self.entries.drain(..).map(|(_, fb)| fb).collect()
    }

    fn evict_to(
        &mut self,
        keep: usize,
        current: Option<FramebufferId>,
    ) -> Vec<FramebufferId> {
        let mut evicted = Vec::new();
        let mut index = 0;

        while self.entries.len() > keep && index < self.entries.len() {
            let is_current = self
                .entries
                .get_index(index)
                .is_some_and(|(_, fb)| Some(*fb) == current);

            if is_current {
                index += 1;
                continue;
            }

            if let Some((_, fb)) = self.entries.shift_remove_index(index) {
                evicted.push(fb);
            }
        }

        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(cache: &mut FramebufferCache, n: u64) {
        for i in 0..n {
            cache.insert(BufferId(i), FramebufferId(i as u32 + 100), None);
        }
    }

    #[test]
    fn insert_never_exceeds_cap() {
        let mut cache = FramebufferCache::default();
        fill(&mut cache, 4);
        assert_eq!(cache.len(), 4);

        let evicted =
            cache.insert(BufferId(9), FramebufferId(109), None);
        assert_eq!(evicted, vec![FramebufferId(100)]);
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn eviction_skips_current_framebuffer() {
        let mut cache = FramebufferCache::default();
        fill(&mut cache, 4);

        let evicted = cache.insert(
            BufferId(9),
            FramebufferId(109),
            Some(FramebufferId(100)),
        );
        assert_eq!(evicted, vec![FramebufferId(101)]);
        assert!(cache.contains_framebuffer(FramebufferId(100)));
    }

    #[test]
    fn drain_except_keeps_only_current() {
        let mut cache = FramebufferCache::default();
        fill(&mut cache, 4);

        let evicted = cache.drain_except(Some(FramebufferId(102)));
        assert_eq!(evicted.len(), 3);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(BufferId(2)), Some(FramebufferId(102)));
    }
}
