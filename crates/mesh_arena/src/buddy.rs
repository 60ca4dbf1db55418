//! Binary buddy allocation over fixed-capacity slabs.
//!
//! Capacities are counted in elements (vertices or indices), not bytes.
//! Level 0 sectors hold `MIN_SECTOR_ELEMS`; each level doubles; a slab is
//! exactly one top-level sector and new slabs are appended on demand, so
//! allocation never fails.

use std::collections::BTreeSet;

/// Elements in a level-0 sector: one triangle's indices rounded up to a
/// power of two.
pub const MIN_SECTOR_ELEMS: u32 = 4;

/// A power-of-two span of one slab, identified by (slab, offset, level).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SectorRef {
    pub slab: u32,
    pub offset: u32,
    pub level: u8,
}

/// Elements covered by a sector at `level`.
#[inline]
pub fn level_elems(level: u8) -> u32 {
    MIN_SECTOR_ELEMS << level
}

/// Smallest level whose sector holds `elems` elements.
pub fn level_for(elems: u32) -> u8 {
    let mut level = 0u8;
    while level_elems(level) < elems {
        level += 1;
    }
    level
}

/// Per-slab free sets, one ordered set of offsets per level. The buddy
/// invariant holds at all times: two sibling sectors of one parent are
/// never both present at the same level (they get merged on free).
struct Slab {
    free: Vec<BTreeSet<u32>>,
}

impl Slab {
    fn new(top_level: u8) -> Self {
        let mut free = vec![BTreeSet::new(); top_level as usize + 1];
        free[top_level as usize].insert(0);
        Self { free }
    }
}

/// Buddy allocator for one element kind across a growing set of slabs.
pub struct SectorAlloc {
    top_level: u8,
    slabs: Vec<Slab>,
}

impl SectorAlloc {
    pub fn new(top_level: u8) -> Self {
        Self {
            top_level,
            slabs: Vec::new(),
        }
    }

    #[inline]
    pub fn top_level(&self) -> u8 {
        self.top_level
    }

    /// Elements per slab (one top-level sector).
    #[inline]
    pub fn slab_capacity(&self) -> u32 {
        level_elems(self.top_level)
    }

    #[inline]
    pub fn slab_count(&self) -> usize {
        self.slabs.len()
    }

    /// Free sectors currently recorded for `slab` at `level`.
    pub fn free_count(&self, slab: u32, level: u8) -> usize {
        self.slabs[slab as usize].free[level as usize].len()
    }

    /// Allocate the smallest-offset free sector at `level`, splitting a
    /// larger sector down or appending a fresh slab when nothing fits.
    pub fn alloc(&mut self, level: u8) -> SectorRef {
        assert!(
            level <= self.top_level,
            "sector level {level} exceeds top level {}",
            self.top_level
        );
        for slab in 0..self.slabs.len() as u32 {
            if let Some(sector) = self.alloc_in_slab(slab, level) {
                return sector;
            }
        }
        let slab = self.slabs.len() as u32;
        self.slabs.push(Slab::new(self.top_level));
        log::info!("mesh arena: grew to {} slab(s)", self.slabs.len());
        self.alloc_in_slab(slab, level)
            .expect("fresh slab must satisfy any level")
    }

    fn alloc_in_slab(&mut self, slab: u32, level: u8) -> Option<SectorRef> {
        let free = &mut self.slabs[slab as usize].free;
        // Smallest free sector that still fits, lowest offset first.
        let mut from = (level..=self.top_level).find(|&l| !free[l as usize].is_empty())?;
        let mut offset = *free[from as usize].iter().next().expect("level just probed");
        free[from as usize].remove(&offset);
        // Halve down to the requested level, registering each sibling.
        while from > level {
            from -= 1;
            let sibling = offset + level_elems(from);
            free[from as usize].insert(sibling);
        }
        Some(SectorRef {
            slab,
            offset,
            level,
        })
    }

    /// Return a sector and coalesce with its buddy as far as possible.
    pub fn free(&mut self, sector: SectorRef) {
        let SectorRef {
            slab,
            mut offset,
            mut level,
        } = sector;
        let free = &mut self.slabs[slab as usize].free;
        while level < self.top_level {
            let buddy = offset ^ level_elems(level);
            if !free[level as usize].remove(&buddy) {
                break;
            }
            offset = offset.min(buddy);
            level += 1;
        }
        let inserted = free[level as usize].insert(offset);
        assert!(
            inserted,
            "double free of sector (slab {slab}, offset {offset}, level {level})"
        );
    }
}
