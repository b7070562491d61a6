//! Grid dimensions and node indexing.
//!
//! All nodal arrays are flattened row-major over (r, θ, z) with z fastest.
//! The GPU kernel embeds [`WGSL_NODE_INDEX`], which spells the same
//! arithmetic as [`GridDims::index`].

use serde::{Deserialize, Serialize};

use crate::error::{MeshError, MeshResult};

/// WGSL twin of [`GridDims::index`]. Expects a `params` uniform carrying
/// `ntheta` and `nz`.
pub const WGSL_NODE_INDEX: &str = r#"
fn node_index(i: u32, j: u32, k: u32) -> u32 {
    return (i * params.ntheta + j) * params.nz + k;
}
"#;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDims {
    pub nr: usize,
    pub ntheta: usize,
    pub nz: usize,
}

impl GridDims {
    /// Validated dimensions. Transport needs at least one interior shell and
    /// one interior level, so `nr` and `nz` must be ≥ 3.
    pub fn new(nr: usize, ntheta: usize, nz: usize) -> MeshResult<Self> {
        if nr == 0 || ntheta == 0 || nz == 0 {
            return Err(MeshError::InvalidDimensions {
                what: format!("node counts must be nonzero (nr={nr}, ntheta={ntheta}, nz={nz})"),
            });
        }
        if nr < 3 || nz < 3 {
            return Err(MeshError::InvalidDimensions {
                what: format!("nr and nz must be at least 3 (nr={nr}, nz={nz})"),
            });
        }
        Ok(Self { nr, ntheta, nz })
    }

    #[inline]
    pub const fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.ntheta + j) * self.nz + k
    }

    /// Inverse of [`GridDims::index`].
    #[inline]
    pub const fn coords(&self, idx: usize) -> (usize, usize, usize) {
        let k = idx % self.nz;
        let rest = idx / self.nz;
        (rest / self.ntheta, rest % self.ntheta, k)
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.nr * self.ntheta * self.nz
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Angular neighbour in the +θ direction; the last node wraps to 0.
    #[inline]
    pub const fn theta_next(&self, j: usize) -> usize {
        if j + 1 == self.ntheta { 0 } else { j + 1 }
    }

    /// Angular neighbour in the −θ direction; node 0 wraps to the last.
    #[inline]
    pub const fn theta_prev(&self, j: usize) -> usize {
        if j == 0 { self.ntheta - 1 } else { j - 1 }
    }

    /// Interior nodes exclude the centerline shell, the outer shell, and the
    /// top and bottom levels. Every angle is interior.
    #[inline]
    pub const fn is_interior(&self, i: usize, k: usize) -> bool {
        i >= 1 && i + 1 < self.nr && k >= 1 && k + 1 < self.nz
    }

    pub const fn interior_count(&self) -> usize {
        (self.nr - 2) * self.ntheta * (self.nz - 2)
    }

    /// Coordinates of the `n`-th interior node, z fastest.
    #[inline]
    pub const fn interior_coords(&self, n: usize) -> (usize, usize, usize) {
        let inz = self.nz - 2;
        let k = n % inz + 1;
        let rest = n / inz;
        (rest / self.ntheta + 1, rest % self.ntheta, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_counts_rejected() {
        assert!(GridDims::new(0, 4, 5).is_err());
        assert!(GridDims::new(5, 0, 5).is_err());
        assert!(GridDims::new(5, 4, 0).is_err());
        assert!(GridDims::new(2, 4, 5).is_err());
        assert!(GridDims::new(3, 1, 3).is_ok());
    }

    #[test]
    fn index_round_trip() {
        let dims = GridDims::new(5, 4, 6).unwrap();
        for idx in 0..dims.len() {
            let (i, j, k) = dims.coords(idx);
            assert_eq!(dims.index(i, j, k), idx);
        }
    }

    #[test]
    fn angular_neighbours_wrap() {
        let dims = GridDims::new(3, 8, 3).unwrap();
        assert_eq!(dims.theta_next(7), 0);
        assert_eq!(dims.theta_prev(0), 7);
        assert_eq!(dims.theta_next(3), 4);
        assert_eq!(dims.theta_prev(3), 2);
    }

    #[test]
    fn interior_enumeration_covers_interior_exactly_once() {
        let dims = GridDims::new(5, 4, 5).unwrap();
        let mut seen = vec![false; dims.len()];
        for n in 0..dims.interior_count() {
            let (i, j, k) = dims.interior_coords(n);
            assert!(dims.is_interior(i, k));
            let idx = dims.index(i, j, k);
            assert!(!seen[idx]);
            seen[idx] = true;
        }
        let interior = (0..dims.len())
            .filter(|&idx| {
                let (i, _, k) = dims.coords(idx);
                dims.is_interior(i, k)
            })
            .count();
        assert_eq!(interior, dims.interior_count());
    }

    #[test]
    fn wgsl_index_matches_layout() {
        assert!(WGSL_NODE_INDEX.contains("(i * params.ntheta + j) * params.nz + k"));
    }
}
