//! GF(2) solver for the dense part of the two-core.
//!
//! The two-core gives a `d x rm` matrix `M` of dense masks. Gauss-Jordan
//! elimination picks, row by row, the lowest column still set as pivot. The
//! pivot columns `C` index an invertible `d x d` sub-matrix `M[:, C]`, and the
//! accumulated row operations `T` satisfy: row `r` of `T * M[:, C]` is the
//! unit vector of column `C[r]`. Solving `M[:, C] x = y` is then `x = T y`.

use crate::bitstring::BitString;
use crate::error::{OkvsError, Result};
use crate::utils::xor_u8s_inplace;

/// Pivot structure of a full-row-rank dense system.
#[derive(Clone, Debug)]
pub struct DenseSystem {
    width: usize,
    columns: Vec<usize>,
    transform: Vec<BitString>,
}

impl DenseSystem {
    /// Eliminate `rows`, each `width` bits.
    ///
    /// Fails with [`OkvsError::CoreTooLarge`] if there are more rows than
    /// columns and with [`OkvsError::RankDeficient`] if the rows are
    /// linearly dependent.
    pub fn eliminate(rows: &[&BitString], width: usize) -> Result<Self> {
        let d = rows.len();
        if d > width {
            return Err(OkvsError::CoreTooLarge { core: d, rm: width });
        }
        let mut matrix: Vec<BitString> = rows.iter().map(|row| (*row).clone()).collect();
        let mut transform: Vec<BitString> = (0..d)
            .map(|r| {
                let mut unit = BitString::new_zeros(d);
                unit.set(r, true);
                unit
            })
            .collect();
        let mut columns = Vec::with_capacity(d);

        for r in 0..d {
            assert_eq!(matrix[r].len(), width, "row {} has the wrong width", r);
            let column = match matrix[r].first_one_index() {
                Some(column) => column,
                // dependent on earlier rows; keep going to report the rank
                None => continue,
            };
            columns.push(column);
            let pivot_row = matrix[r].clone();
            let pivot_transform = transform[r].clone();
            for j in 0..d {
                if j != r && matrix[j].get(column) {
                    matrix[j] ^= &pivot_row;
                    transform[j] ^= &pivot_transform;
                }
            }
        }

        if columns.len() < d {
            return Err(OkvsError::RankDeficient { core: d, rank: columns.len() });
        }
        Ok(Self { width, columns, transform })
    }

    /// Number of unknowns, equal to the number of rows.
    pub fn size(&self) -> usize {
        self.columns.len()
    }

    /// Pivot columns; `columns()[r]` is solved by row `r`.
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    /// Membership mask of the pivot columns over the full width.
    pub fn column_mask(&self) -> BitString {
        let mut mask = BitString::new_zeros(self.width);
        for c in &self.columns {
            mask.set(*c, true);
        }
        mask
    }

    /// Solve `M[:, C] x = rhs`; entry `r` of the result is the value of
    /// column `columns()[r]`.
    pub fn solve(&self, rhs: &[Vec<u8>]) -> Vec<Vec<u8>> {
        assert_eq!(rhs.len(), self.size(), "one right-hand side per row");
        let byte_l = rhs.first().map_or(0, |y| y.len());
        self.transform
            .iter()
            .map(|t| {
                let mut x = vec![0u8; byte_l];
                for j in t.iter_ones() {
                    xor_u8s_inplace(&mut x, &rhs[j]);
                }
                x
            })
            .collect()
    }
}
