use std::collections::VecDeque;

use ndarray::{Array2, Zip};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Flat structuring element stored as one horizontal span per row offset.
#[derive(Clone, Debug)]
pub struct Footprint {
    /// (row offset, half width of the span on that row)
    spans: Vec<(isize, usize)>,
}

impl Footprint {
    /// Disk of all offsets with dy^2 + dx^2 <= radius^2.
    pub fn disk(radius: usize) -> Self {
        let r = radius as isize;
        let spans = (-r..=r)
            .map(|dy| {
                let half = ((r * r - dy * dy) as f64).sqrt().floor() as usize;
                (dy, half)
            })
            .collect();
        Self { spans }
    }

    /// Number of offsets covered by the footprint.
    pub fn area(&self) -> usize {
        self.spans.iter().map(|&(_, half)| 2 * half + 1).sum()
    }
}

/// Per-row prefix counts of foreground pixels; `prefix[[r, c]]` counts
/// columns `0..c` of row `r`.
struct RowCounts {
    prefix: Array2<u32>,
}

impl RowCounts {
    fn new(mask: &Array2<bool>) -> Self {
        let (h, w) = mask.dim();
        let mut prefix = Array2::<u32>::zeros((h, w + 1));
        for row in 0..h {
            for col in 0..w {
                prefix[[row, col + 1]] = prefix[[row, col]] + mask[[row, col]] as u32;
            }
        }
        Self { prefix }
    }

    /// Foreground count in columns `c0..=c1` of `row`.
    fn count(&self, row: usize, c0: usize, c1: usize) -> u32 {
        self.prefix[[row, c1 + 1]] - self.prefix[[row, c0]]
    }
}

/// Visit the in-image part of every footprint span centred on (row, col);
/// stops early when `visit` returns false. Returns whether all visits passed.
fn all_spans<F>(fp: &Footprint, h: usize, w: usize, row: usize, col: usize, mut visit: F) -> bool
where
    F: FnMut(usize, usize, usize) -> bool,
{
    for &(dy, half) in &fp.spans {
        let r = row as isize + dy;
        if r < 0 || r >= h as isize {
            continue;
        }
        let c0 = col.saturating_sub(half);
        let c1 = (col + half).min(w - 1);
        if !visit(r as usize, c0, c1) {
            return false;
        }
    }
    true
}

fn apply<F>(mask: &Array2<bool>, op: F) -> Array2<bool>
where
    F: Fn((usize, usize)) -> bool + Sync,
{
    let mut result = Array2::from_elem(mask.dim(), false);
    if mask.len() >= PARALLEL_PIXEL_THRESHOLD {
        Zip::indexed(&mut result).par_for_each(|idx, out| *out = op(idx));
    } else {
        Zip::indexed(&mut result).for_each(|idx, out| *out = op(idx));
    }
    result
}

/// Binary erosion: a pixel stays true only if every in-image pixel under the
/// footprint is true. Out-of-image neighbours are ignored.
pub fn erode(mask: &Array2<bool>, fp: &Footprint) -> Array2<bool> {
    let (h, w) = mask.dim();
    let counts = RowCounts::new(mask);
    apply(mask, |(row, col)| {
        mask[[row, col]]
            && all_spans(fp, h, w, row, col, |r, c0, c1| {
                counts.count(r, c0, c1) as usize == c1 - c0 + 1
            })
    })
}

/// Binary dilation: a pixel becomes true if any pixel under the footprint is true.
pub fn dilate(mask: &Array2<bool>, fp: &Footprint) -> Array2<bool> {
    let (h, w) = mask.dim();
    let counts = RowCounts::new(mask);
    apply(mask, |(row, col)| {
        !all_spans(fp, h, w, row, col, |r, c0, c1| counts.count(r, c0, c1) == 0)
    })
}

/// Dilation followed by erosion: fills gaps narrower than the footprint.
pub fn closing(mask: &Array2<bool>, fp: &Footprint) -> Array2<bool> {
    erode(&dilate(mask, fp), fp)
}

/// Erosion followed by dilation: removes blobs and bridges thinner than the footprint.
pub fn opening(mask: &Array2<bool>, fp: &Footprint) -> Array2<bool> {
    dilate(&erode(mask, fp), fp)
}

/// Fill background areas not 4-connected to the image border.
pub fn fill_holes(mask: &Array2<bool>) -> Array2<bool> {
    let (h, w) = mask.dim();
    let mut outside = Array2::from_elem((h, w), false);
    let mut queue = VecDeque::new();

    let mut seed = |row: usize, col: usize, outside: &mut Array2<bool>| {
        if !mask[[row, col]] && !outside[[row, col]] {
            outside[[row, col]] = true;
            queue.push_back((row, col));
        }
    };
    for row in 0..h {
        seed(row, 0, &mut outside);
        if w > 1 {
            seed(row, w - 1, &mut outside);
        }
    }
    for col in 0..w {
        seed(0, col, &mut outside);
        if h > 1 {
            seed(h - 1, col, &mut outside);
        }
    }

    while let Some((row, col)) = queue.pop_front() {
        let neighbours = [
            (row.wrapping_sub(1), col),
            (row + 1, col),
            (row, col.wrapping_sub(1)),
            (row, col + 1),
        ];
        for (nr, nc) in neighbours {
            if nr < h && nc < w && !mask[[nr, nc]] && !outside[[nr, nc]] {
                outside[[nr, nc]] = true;
                queue.push_back((nr, nc));
            }
        }
    }

    outside.mapv(|o| !o)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_area() {
        // disk(1) is a plus shape, disk(2) has 13 pixels.
        assert_eq!(Footprint::disk(0).area(), 1);
        assert_eq!(Footprint::disk(1).area(), 5);
        assert_eq!(Footprint::disk(2).area(), 13);
    }

    #[test]
    fn test_fill_holes_ring() {
        let mut mask = Array2::from_elem((5, 5), false);
        for i in 1..4 {
            mask[[1, i]] = true;
            mask[[3, i]] = true;
            mask[[i, 1]] = true;
            mask[[i, 3]] = true;
        }
        let filled = fill_holes(&mask);
        assert!(filled[[2, 2]]);
        assert!(!filled[[0, 0]]);
        assert_eq!(filled.iter().filter(|&&v| v).count(), 9);
    }
}
