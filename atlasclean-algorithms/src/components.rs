//! Connected component labeling of 3D binary masks.
//!
//! Run-length based union-find labeling:
//! - Foreground runs are extracted per x-row (rows are independent, so this
//!   phase runs in parallel for large grids)
//! - Runs are merged serially, in scan order, with the runs of the already
//!   scanned neighbour rows
//! - Components are renumbered 1..K by descending voxel count in one serial
//!   pass; equal sizes keep scan order (the component whose first voxel has
//!   the lower linear index gets the lower id)

use atlasclean_core::{ensure_dims, BinaryMask, ComponentGrid, Connectivity, Dims, Result, VoxelGrid, BACKGROUND};
use rayon::prelude::*;

/// Voxel count above which runs are extracted and written in parallel.
const PARALLEL_LABELING_THRESHOLD: usize = 1 << 16;

/// Already scanned rows (dy, dz) that can touch the current row under FACE connectivity.
const FACE_PREVIOUS_ROWS: [(isize, isize); 2] = [(-1, 0), (0, -1)];

/// Already scanned rows (dy, dz) that can touch the current row under FULL connectivity.
const FULL_PREVIOUS_ROWS: [(isize, isize); 4] = [(-1, 0), (-1, -1), (0, -1), (1, -1)];

/// A horizontal run of foreground voxels.
#[derive(Debug, Clone, Copy)]
struct Run {
    start: u32, // inclusive
    end: u32,   // exclusive
    label: u32, // provisional label
}

/// Result of labeling one binary mask
#[derive(Debug, Clone)]
pub struct ComponentLabeling {
    grid: ComponentGrid,
    /// Voxel indices of component `id` at `voxels[id - 1]`, ascending
    voxels: Vec<Vec<usize>>,
}

impl ComponentLabeling {
    /// Component id grid: 0 is background, 1 is the largest component
    pub fn grid(&self) -> &ComponentGrid {
        &self.grid
    }

    /// Number of components, excluding background
    pub fn num_components(&self) -> usize {
        self.voxels.len()
    }

    /// Voxel count of component `id`; 0 for background or unknown ids
    pub fn size(&self, id: u32) -> usize {
        self.voxels(id).len()
    }

    /// Sorted voxel indices of component `id`
    pub fn voxels(&self, id: u32) -> &[usize] {
        match id {
            0 => &[],
            _ => self.voxels.get(id as usize - 1).map(Vec::as_slice).unwrap_or(&[]),
        }
    }

    /// Component sizes, index 0 holding component 1
    pub fn sizes(&self) -> Vec<usize> {
        self.voxels.iter().map(Vec::len).collect()
    }

    /// Component ids from the smallest component to the largest
    pub fn ids_smallest_first(&self) -> impl Iterator<Item = u32> {
        (1..=self.voxels.len() as u32).rev()
    }
}

/// Label the connected components of a binary mask.
///
/// # Arguments
/// * `mask` - Binary mask, any non-background value is foreground
/// * `expected` - Dimensions the mask must have
/// * `connectivity` - FACE (6) or FULL (26) neighbourhood
///
/// # Returns
/// * `Result<ComponentLabeling>` - Components numbered 1..K by descending size,
///   or `InvalidGeometry` if the mask dimensions differ from `expected`
pub fn label_components(
    mask: &BinaryMask,
    expected: Dims,
    connectivity: Connectivity,
) -> Result<ComponentLabeling> {
    ensure_dims(expected, mask.dims())?;

    let dims = mask.dims();
    let mut grid = VoxelGrid::filled(*mask.geometry(), 0u32);
    if dims.is_empty() {
        return Ok(ComponentLabeling { grid, voxels: Vec::new() });
    }

    let parallel = dims.len() >= PARALLEL_LABELING_THRESHOLD;

    // Phase 1: run extraction, one row at a time
    let mut row_runs: Vec<Vec<Run>> = if parallel {
        mask.as_slice().par_chunks(dims.nx).map(extract_runs).collect()
    } else {
        mask.as_slice().chunks(dims.nx).map(extract_runs).collect()
    };

    // Phase 2: provisional labels merged with previous rows
    let mut uf = UnionFind::new();
    let previous_rows: &[(isize, isize)] = match connectivity {
        Connectivity::Face => &FACE_PREVIOUS_ROWS,
        Connectivity::Full => &FULL_PREVIOUS_ROWS,
    };
    let tolerance = match connectivity {
        Connectivity::Face => 0,
        Connectivity::Full => 1,
    };

    let mut assigned: Vec<Option<u32>> = Vec::new();
    for row in 0..row_runs.len() {
        let (scanned, rest) = row_runs.split_at_mut(row);
        let current = &mut rest[0];
        if current.is_empty() {
            continue;
        }

        let (y, z) = ((row % dims.ny) as isize, (row / dims.ny) as isize);
        assigned.clear();
        assigned.resize(current.len(), None);

        for &(dy, dz) in previous_rows {
            let (py, pz) = (y + dy, z + dz);
            if py < 0 || pz < 0 || py >= dims.ny as isize {
                continue;
            }
            let previous = &scanned[pz as usize * dims.ny + py as usize];
            merge_with_row(current, previous, tolerance, &mut assigned, &mut uf);
        }

        for (run, label) in current.iter_mut().zip(assigned.iter()) {
            run.label = label.unwrap_or_else(|| uf.make_set());
        }
    }

    // Phase 3: deterministic renumbering by descending size
    let final_labels = uf.final_labels(&row_runs);

    // Phase 4: write the component grid and gather voxel lists
    let nx = dims.nx;
    if parallel {
        grid.as_mut_slice()
            .par_chunks_mut(nx)
            .zip(row_runs.par_iter())
            .for_each(|(row, runs)| write_row(row, runs, &final_labels));
    } else {
        for (row, runs) in grid.as_mut_slice().chunks_mut(nx).zip(row_runs.iter()) {
            write_row(row, runs, &final_labels);
        }
    }

    let num_components = final_labels.iter().copied().max().unwrap_or(0) as usize;
    let mut voxels: Vec<Vec<usize>> = vec![Vec::new(); num_components];
    for (row, runs) in row_runs.iter().enumerate() {
        let row_start = row * nx;
        for run in runs {
            let id = final_labels[run.label as usize];
            voxels[id as usize - 1].extend(row_start + run.start as usize..row_start + run.end as usize);
        }
    }

    Ok(ComponentLabeling { grid, voxels })
}

/// Extract foreground runs of one x-row
fn extract_runs(row: &[u8]) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;

    for (x, &value) in row.iter().enumerate() {
        match (value != BACKGROUND, start) {
            (true, None) => start = Some(x),
            (false, Some(s)) => {
                runs.push(Run { start: s as u32, end: x as u32, label: 0 });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push(Run { start: s as u32, end: row.len() as u32, label: 0 });
    }

    runs
}

#[inline]
fn runs_connected(previous: &Run, current: &Run, tolerance: u32) -> bool {
    previous.start < current.end + tolerance && previous.end + tolerance > current.start
}

/// Merge the current row's runs with one previously scanned row.
///
/// Both rows are sorted by x, so a single forward sweep over `previous` suffices.
fn merge_with_row(
    current: &[Run],
    previous: &[Run],
    tolerance: u32,
    assigned: &mut [Option<u32>],
    uf: &mut UnionFind,
) {
    let mut prev_idx = 0;
    for (run, slot) in current.iter().zip(assigned.iter_mut()) {
        while prev_idx < previous.len() && previous[prev_idx].end + tolerance <= run.start {
            prev_idx += 1;
        }

        let mut check_idx = prev_idx;
        while check_idx < previous.len() && previous[check_idx].start < run.end + tolerance {
            let prev_run = &previous[check_idx];
            if runs_connected(prev_run, run, tolerance) {
                match *slot {
                    Some(label) if label != prev_run.label => uf.union(label, prev_run.label),
                    None => *slot = Some(prev_run.label),
                    _ => {}
                }
            }
            check_idx += 1;
        }
    }
}

fn write_row(row: &mut [u32], runs: &[Run], final_labels: &[u32]) {
    for run in runs {
        let id = final_labels[run.label as usize];
        row[run.start as usize..run.end as usize].fill(id);
    }
}

/// Union-find over provisional labels 1..n; the smaller root always wins,
/// so every root is the first-created label of its component.
#[derive(Debug)]
struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    fn new() -> Self {
        Self { parent: Vec::with_capacity(256) }
    }

    fn make_set(&mut self) -> u32 {
        let label = self.parent.len() as u32 + 1;
        self.parent.push(label);
        label
    }

    fn find(&mut self, label: u32) -> u32 {
        let mut root = label;
        while self.parent[(root - 1) as usize] != root {
            root = self.parent[(root - 1) as usize];
        }

        let mut current = label;
        while current != root {
            let next = self.parent[(current - 1) as usize];
            self.parent[(current - 1) as usize] = root;
            current = next;
        }

        root
    }

    fn union(&mut self, a: u32, b: u32) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            let (smaller, larger) = if root_a < root_b { (root_a, root_b) } else { (root_b, root_a) };
            self.parent[(larger - 1) as usize] = smaller;
        }
    }

    /// Map every provisional label (index) to its final component id.
    ///
    /// Roots ascend in scan order of their first voxel; a stable sort by
    /// descending size therefore keeps scan order among equal sizes.
    fn final_labels(&mut self, row_runs: &[Vec<Run>]) -> Vec<u32> {
        let n = self.parent.len();
        let mut root_rank = vec![u32::MAX; n + 1];
        let mut roots: Vec<u32> = Vec::new();
        for label in 1..=n as u32 {
            let root = self.find(label);
            if root == label {
                root_rank[label as usize] = roots.len() as u32;
                roots.push(label);
            }
        }

        let mut sizes = vec![0usize; roots.len()];
        for runs in row_runs {
            for run in runs {
                let root = self.find(run.label);
                sizes[root_rank[root as usize] as usize] += (run.end - run.start) as usize;
            }
        }

        let mut order: Vec<usize> = (0..roots.len()).collect();
        order.sort_by(|&a, &b| sizes[b].cmp(&sizes[a]));

        let mut id_of_rank = vec![0u32; roots.len()];
        for (position, &rank) in order.iter().enumerate() {
            id_of_rank[rank] = position as u32 + 1;
        }

        let mut final_labels = vec![0u32; n + 1];
        for label in 1..=n as u32 {
            let root = self.find(label);
            final_labels[label as usize] = id_of_rank[root_rank[root as usize] as usize];
        }
        final_labels
    }
}
