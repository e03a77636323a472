use ndarray::Array2;

use super::config::Connectivity;

/// Connected-component label map: 0 is background, 1..=count are regions
/// numbered in raster order of their first pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelMap {
    labels: Array2<u32>,
    count: u32,
}

impl LabelMap {
    pub fn labels(&self) -> &Array2<u32> {
        &self.labels
    }

    /// Number of regions.
    pub fn count(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Region ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = u32> {
        1..=self.count
    }

    /// Pixel count per region, indexed by `id - 1`.
    pub fn areas(&self) -> Vec<usize> {
        let mut areas = vec![0usize; self.count()];
        for &l in self.labels.iter().filter(|&&l| l > 0) {
            areas[l as usize - 1] += 1;
        }
        areas
    }
}

/// Label connected foreground regions using two-pass union-find.
pub fn label_components(mask: &Array2<bool>, connectivity: Connectivity) -> LabelMap {
    let (h, w) = mask.dim();
    let mut labels = Array2::<u32>::zeros((h, w));
    // Index 0 unused; provisional labels start at 1.
    let mut parent: Vec<u32> = vec![0];

    // Pass 1: provisional labels from already-visited neighbours.
    for row in 0..h {
        for col in 0..w {
            if !mask[[row, col]] {
                continue;
            }

            let mut neighbours = [0u32; 4];
            if col > 0 {
                neighbours[0] = labels[[row, col - 1]];
            }
            if row > 0 {
                neighbours[1] = labels[[row - 1, col]];
                if connectivity == Connectivity::Eight {
                    if col > 0 {
                        neighbours[2] = labels[[row - 1, col - 1]];
                    }
                    if col + 1 < w {
                        neighbours[3] = labels[[row - 1, col + 1]];
                    }
                }
            }

            let smallest = neighbours.iter().copied().filter(|&l| l > 0).min();
            match smallest {
                None => {
                    let next = parent.len() as u32;
                    parent.push(next);
                    labels[[row, col]] = next;
                }
                Some(smallest) => {
                    labels[[row, col]] = smallest;
                    for &n in neighbours.iter().filter(|&&l| l > smallest) {
                        union(&mut parent, smallest, n);
                    }
                }
            }
        }
    }

    // Roots are the smallest provisional label of each set, which is the one
    // created at the set's first raster pixel; numbering roots in ascending
    // order therefore gives raster discovery order.
    let mut final_id = vec![0u32; parent.len()];
    let mut count = 0u32;
    for provisional in 1..parent.len() {
        let root = find(&mut parent, provisional as u32) as usize;
        if root == provisional {
            count += 1;
            final_id[provisional] = count;
        } else {
            final_id[provisional] = final_id[root];
        }
    }

    // Pass 2: resolve provisional labels.
    labels.mapv_inplace(|l| final_id[l as usize]);

    LabelMap { labels, count }
}

/// Drop connected regions smaller than `min_area` pixels.
pub fn remove_small_components(
    mask: &Array2<bool>,
    min_area: usize,
    connectivity: Connectivity,
) -> Array2<bool> {
    let labeled = label_components(mask, connectivity);
    let areas = labeled.areas();
    labeled
        .labels()
        .mapv(|l| l > 0 && areas[l as usize - 1] >= min_area)
}

/// Root of `x`'s set, halving the path on the way up.
fn find(parent: &mut [u32], mut x: u32) -> u32 {
    while parent[x as usize] != x {
        let grandparent = parent[parent[x as usize] as usize];
        parent[x as usize] = grandparent;
        x = grandparent;
    }
    x
}

fn union(parent: &mut [u32], a: u32, b: u32) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        // The smaller root survives so every root is its set's minimum.
        let (small, big) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[big as usize] = small;
    }
}
