/// Old-to-new index table used when elements are moved or compacted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRemap {
    map: Vec<Option<u32>>,
    len: u32,
}

impl IndexRemap {
    /// Empty table over `n` old indices, none of which are mapped yet.
    pub fn new(n: usize) -> Self {
        Self {
            map: vec![None; n],
            len: 0,
        }
    }

    /// Keeps the old indices for which `keep` holds, preserving their relative order.
    pub fn compacting<I: IntoIterator<Item = bool>>(keep: I) -> Self {
        let mut len = 0;
        let map = keep
            .into_iter()
            .map(|k| {
                k.then(|| {
                    len += 1;
                    len - 1
                })
            })
            .collect();
        Self { map, len }
    }

    /// Maps `old` to the next free new index unless it already has one.
    pub fn assign(&mut self, old: u32) -> u32 {
        match self.map[old as usize] {
            Some(new) => new,
            None => {
                self.map[old as usize] = Some(self.len);
                self.len += 1;
                self.len - 1
            }
        }
    }

    #[inline]
    pub fn get(&self, old: u32) -> Option<u32> {
        self.map.get(old as usize).copied().flatten()
    }

    /// Number of new indices handed out.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Old indices ordered by their new index.
    pub fn inverse(&self) -> Vec<u32> {
        let mut inv = vec![0; self.len as usize];
        for (old, new) in self.map.iter().enumerate() {
            if let Some(new) = new {
                inv[*new as usize] = old as u32;
            }
        }
        inv
    }

    /// Rewrites every reference in `refs`, dropping the ones whose target has no new index.
    pub fn apply(&self, refs: &mut [Option<u32>]) {
        for r in refs.iter_mut() {
            *r = r.and_then(|old| self.get(old));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compaction_preserves_order() {
        let remap = IndexRemap::compacting([true, false, false, true, true]);
        assert_eq!(remap.len(), 3);
        assert_eq!(remap.get(0), Some(0));
        assert_eq!(remap.get(1), None);
        assert_eq!(remap.get(3), Some(1));
        assert_eq!(remap.get(4), Some(2));
        assert_eq!(remap.inverse(), vec![0, 3, 4]);
    }

    #[test]
    fn assignment_is_stable_and_refs_follow() {
        let mut remap = IndexRemap::new(6);
        assert_eq!(remap.assign(5), 0);
        assert_eq!(remap.assign(2), 1);
        assert_eq!(remap.assign(5), 0);
        let mut refs = [Some(2), None, Some(4), Some(5)];
        remap.apply(&mut refs);
        assert_eq!(refs, [Some(1), None, None, Some(0)]);
    }
}
