use viral_abm_common::LatticeShape;

/// Axial offsets of the six hexagonal neighbors stored in a rectangular array.
pub const HEX_OFFSETS: [(isize, isize); 6] = [(-1, 0), (1, 0), (0, -1), (0, 1), (-1, 1), (1, -1)];

/// Row/column position in the square index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPos {
    pub row: usize,
    pub col: usize,
}

impl GridPos {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Radius-bounded hexagonal lattice in offset coordinates.
///
/// Positions outside the radius are permanently inactive. Adjacency is fixed at
/// construction and stored compactly: `neighbor_starts[idx]..+neighbor_counts[idx]`
/// indexes into `neighbor_indices`.
#[derive(Debug, Clone)]
pub struct HexLattice {
    size: usize,
    active: Vec<bool>,
    active_indices: Vec<usize>,
    neighbor_starts: Vec<u32>,
    neighbor_counts: Vec<u32>,
    neighbor_indices: Vec<u32>,
}

impl HexLattice {
    /// Builds the lattice for `layers` rings (center included). `layers` must be at least 1.
    pub fn new(layers: u32, shape: LatticeShape) -> Self {
        let size = (2 * layers as usize).saturating_sub(1);
        let radius = layers.saturating_sub(1) as isize;
        let center = (size / 2) as isize;

        let mut active = vec![false; size * size];
        for row in 0..size {
            for col in 0..size {
                let di = row as isize - center;
                let dj = col as isize - center;
                active[row * size + col] = within_radius(di, dj, radius, shape);
            }
        }
        let active_indices: Vec<usize> = (0..size * size).filter(|&idx| active[idx]).collect();

        // Build the compact neighbor table once; topology never changes afterwards.
        let mut neighbor_starts = vec![0u32; size * size];
        let mut neighbor_counts = vec![0u32; size * size];
        let mut neighbor_indices = Vec::with_capacity(active_indices.len() * HEX_OFFSETS.len());
        for idx in 0..size * size {
            neighbor_starts[idx] = neighbor_indices.len() as u32;
            if !active[idx] {
                continue;
            }
            let (row, col) = ((idx / size) as isize, (idx % size) as isize);
            for (dr, dc) in HEX_OFFSETS {
                let (nr, nc) = (row + dr, col + dc);
                if nr < 0 || nc < 0 || nr >= size as isize || nc >= size as isize {
                    continue;
                }
                let n_idx = nr as usize * size + nc as usize;
                if active[n_idx] {
                    neighbor_indices.push(n_idx as u32);
                    neighbor_counts[idx] += 1;
                }
            }
        }

        Self {
            size,
            active,
            active_indices,
            neighbor_starts,
            neighbor_counts,
            neighbor_indices,
        }
    }

    /// Side length of the square index space (`2 * layers - 1`).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Total positions in the index space, active or not.
    pub fn len(&self) -> usize {
        self.size * self.size
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn num_active(&self) -> usize {
        self.active_indices.len()
    }

    /// Flat indices of every active position, row-major.
    pub fn active_indices(&self) -> &[usize] {
        &self.active_indices
    }

    #[inline(always)]
    pub fn is_active(&self, idx: usize) -> bool {
        self.active.get(idx).copied().unwrap_or(false)
    }

    #[inline(always)]
    pub fn index_of(&self, pos: GridPos) -> Option<usize> {
        if pos.row < self.size && pos.col < self.size {
            Some(pos.row * self.size + pos.col)
        } else {
            None
        }
    }

    #[inline(always)]
    pub fn position_of(&self, idx: usize) -> GridPos {
        GridPos::new(idx / self.size, idx % self.size)
    }

    /// Active neighbors of `idx` (at most six). Empty for inactive or out-of-range indices.
    #[inline(always)]
    pub fn neighbors(&self, idx: usize) -> &[u32] {
        if idx >= self.neighbor_starts.len() {
            return &[];
        }
        let start = self.neighbor_starts[idx] as usize;
        let end = start + self.neighbor_counts[idx] as usize;
        &self.neighbor_indices[start..end]
    }

    /// Active neighbors of a position, as positions.
    pub fn neighbor_positions(&self, pos: GridPos) -> Vec<GridPos> {
        match self.index_of(pos) {
            Some(idx) => self.neighbors(idx).iter().map(|&n| self.position_of(n as usize)).collect(),
            None => Vec::new(),
        }
    }

    /// Calls `f` for each active neighbor of `idx`; stops early when `f` returns `false`.
    #[inline(always)]
    pub fn for_each_neighbor<F>(&self, idx: usize, mut f: F)
    where
        F: FnMut(usize) -> bool,
    {
        for &n_idx in self.neighbors(idx) {
            if !f(n_idx as usize) {
                return;
            }
        }
    }

    /// Returns the first active neighbor of `idx` for which `f` returns `true`.
    #[inline(always)]
    pub fn find_first_neighbor<F>(&self, idx: usize, mut f: F) -> Option<usize>
    where
        F: FnMut(usize) -> bool,
    {
        self.neighbors(idx).iter().map(|&n| n as usize).find(|&n| f(n))
    }
}

#[inline(always)]
fn within_radius(di: isize, dj: isize, radius: isize, shape: LatticeShape) -> bool {
    match shape {
        // Axial distance; matches the (-1,+1)/(+1,-1) diagonal in HEX_OFFSETS.
        LatticeShape::Hexagon => di.abs().max(dj.abs()).max((di + dj).abs()) <= radius,
        LatticeShape::Disk => di * di + dj * dj <= radius * radius,
    }
}
