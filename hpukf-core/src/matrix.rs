//! Matrix Kernel
//!
//! Dense linear algebra for the small matrices the filter needs (n ≤ 8,
//! m ≤ 4) without heap allocation. Storage is fixed at compile time through
//! const generics; the *active* dimension is passed explicitly because the
//! state dimension is chosen at configuration time and the measurement
//! dimension changes from tick to tick.
//!
//! Entries outside the active block are ignored on input and left untouched
//! on output unless stated otherwise.
//!
//! ## Operations
//!
//! ```text
//! multiply          C = A × B
//! matvec            y = A × x
//! transpose         B = Aᵀ
//! cholesky          A = L × Lᵀ
//! solve_cholesky    x = A⁻¹ × b   (given L)
//! repair_covariance A ← V × clamp(Λ) × Vᵀ
//! ```

use crate::{
    constants::filter::{
        CHOLESKY_PIVOT_EPSILON, COVARIANCE_INFLATION,
        JACOBI_MAX_SWEEPS, JACOBI_TOLERANCE,
    },
    errors::{FilterError, FilterResult},
};

/// Matrix type using const generics
pub type Matrix<const R: usize, const C: usize> = [[f64; C]; R];

/// Square matrix type
pub type SquareMatrix<const N: usize> = Matrix<N, N>;

/// Vector type
pub type Vector<const N: usize> = [f64; N];

/// Matrix multiplication: C = A × B
///
/// Active dimensions: A[rows×inner] × B[inner×cols] = C[rows×cols]
pub fn multiply<const R: usize, const K: usize, const C: usize>(
    a: &Matrix<R, K>,
    b: &Matrix<K, C>,
    rows: usize,
    inner: usize,
    cols: usize,
    result: &mut Matrix<R, C>,
) {
    for i in 0..rows {
        for j in 0..cols {
            let mut sum = 0.0;
            for k in 0..inner {
                sum += a[i][k] * b[k][j];
            }
            result[i][j] = sum;
        }
    }
}

/// Matrix-vector multiplication: y = A × x
pub fn matvec<const R: usize, const C: usize>(
    matrix: &Matrix<R, C>,
    vector: &Vector<C>,
    rows: usize,
    cols: usize,
    result: &mut Vector<R>,
) {
    for i in 0..rows {
        let mut sum = 0.0;
        for j in 0..cols {
            sum += matrix[i][j] * vector[j];
        }
        result[i] = sum;
    }
}

/// Matrix transpose: B = Aᵀ
pub fn transpose<const R: usize, const C: usize>(
    a: &Matrix<R, C>,
    rows: usize,
    cols: usize,
    result: &mut Matrix<C, R>,
) {
    for i in 0..rows {
        for j in 0..cols {
            result[j][i] = a[i][j];
        }
    }
}

/// Make matrix symmetric: A = (A + Aᵀ) / 2
pub fn make_symmetric<const N: usize>(matrix: &mut SquareMatrix<N>, dim: usize) {
    for i in 0..dim {
        for j in i + 1..dim {
            let avg = (matrix[i][j] + matrix[j][i]) * 0.5;
            matrix[i][j] = avg;
            matrix[j][i] = avg;
        }
    }
}

/// Add `value` to every active diagonal entry
pub fn add_diagonal<const N: usize>(matrix: &mut SquareMatrix<N>, dim: usize, value: f64) {
    for i in 0..dim {
        matrix[i][i] += value;
    }
}

/// Sum of the active diagonal
pub fn trace<const N: usize>(matrix: &SquareMatrix<N>, dim: usize) -> f64 {
    (0..dim).map(|i| matrix[i][i]).sum()
}

/// True when every active entry is finite
pub fn all_finite<const N: usize>(matrix: &SquareMatrix<N>, dim: usize) -> bool {
    matrix[..dim]
        .iter()
        .all(|row| row[..dim].iter().all(|v| v.is_finite()))
}

/// Cholesky decomposition: A = L × Lᵀ
///
/// ## Algorithm
///
/// For each column j:
/// - Diagonal: L[j,j] = sqrt(A[j,j] - Σ(L[j,k]²))
/// - Below diagonal: L[i,j] = (A[i,j] - Σ(L[i,k]×L[j,k])) / L[j,j]
///
/// Only the lower triangle of `a` is read. The whole of `l` is overwritten.
/// Fails with `NotPositiveDefinite` when a pivot is at or below
/// [`CHOLESKY_PIVOT_EPSILON`] (NaN pivots fail too).
pub fn cholesky<const N: usize>(
    a: &SquareMatrix<N>,
    dim: usize,
    l: &mut SquareMatrix<N>,
) -> FilterResult<()> {
    debug_assert!(dim <= N);

    for row in l.iter_mut() {
        row.fill(0.0);
    }

    for j in 0..dim {
        let mut sum = 0.0;
        for k in 0..j {
            sum += l[j][k] * l[j][k];
        }

        let pivot = a[j][j] - sum;
        if !(pivot > CHOLESKY_PIVOT_EPSILON) {
            return Err(FilterError::NotPositiveDefinite { row: j, pivot });
        }
        l[j][j] = libm::sqrt(pivot);

        for i in (j + 1)..dim {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[i][k] * l[j][k];
            }
            l[i][j] = (a[i][j] - sum) / l[j][j];
        }
    }

    Ok(())
}

/// Cholesky with a single regularised retry
///
/// On failure the diagonal of `a` is inflated by [`COVARIANCE_INFLATION`]
/// in place and factorisation is attempted once more. Returns `Ok(true)`
/// when the retry was needed; the inflated matrix is what `l` factorises.
pub fn cholesky_inflated<const N: usize>(
    a: &mut SquareMatrix<N>,
    dim: usize,
    l: &mut SquareMatrix<N>,
) -> FilterResult<bool> {
    match cholesky(a, dim, l) {
        Ok(()) => Ok(false),
        Err(_err) => {
            log_debug!("cholesky failed ({}), inflating diagonal by {}", _err, COVARIANCE_INFLATION);
            add_diagonal(a, dim, COVARIANCE_INFLATION);
            cholesky(a, dim, l).map(|()| true)
        }
    }
}

/// Solve A×x = b by forward/back substitution
///
/// More numerically stable than computing A⁻¹×b.
/// Assumes A is already decomposed using Cholesky: A = L×Lᵀ
pub fn solve_cholesky<const N: usize>(
    l: &SquareMatrix<N>,
    dim: usize,
    b: &Vector<N>,
    x: &mut Vector<N>,
) {
    // Forward substitution: L×y = b
    let mut y = [0.0; N];
    for i in 0..dim {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[i][j] * y[j];
        }
        y[i] = (b[i] - sum) / l[i][i];
    }

    // Back substitution: Lᵀ×x = y
    for i in (0..dim).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..dim {
            sum += l[j][i] * x[j];
        }
        x[i] = (y[i] - sum) / l[i][i];
    }
}

/// Symmetrise and clamp the spectrum of a covariance matrix
///
/// Runs cyclic Jacobi rotations to obtain A = V×Λ×Vᵀ, clamps every
/// eigenvalue into `[floor, ceiling]`, and rebuilds A. Used after the
/// posterior update, where subtracting K×Pzz×Kᵀ can leave tiny negative
/// eigenvalues behind.
pub fn repair_covariance<const N: usize>(
    matrix: &mut SquareMatrix<N>,
    dim: usize,
    floor: f64,
    ceiling: f64,
) {
    make_symmetric(matrix, dim);

    let mut a = *matrix;
    let mut v = [[0.0; N]; N];
    for i in 0..dim {
        v[i][i] = 1.0;
    }

    for _ in 0..JACOBI_MAX_SWEEPS {
        let mut off = 0.0;
        for i in 0..dim {
            for j in 0..dim {
                if i != j {
                    off += a[i][j] * a[i][j];
                }
            }
        }
        if off < JACOBI_TOLERANCE {
            break;
        }

        for p in 0..dim {
            for q in (p + 1)..dim {
                if a[p][q] == 0.0 {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = libm::copysign(1.0, theta) / (libm::fabs(theta) + libm::sqrt(theta * theta + 1.0));
                let c = 1.0 / libm::sqrt(t * t + 1.0);
                let s = t * c;

                for k in 0..dim {
                    let (akp, akq) = (a[k][p], a[k][q]);
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..dim {
                    let (apk, aqk) = (a[p][k], a[q][k]);
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for k in 0..dim {
                    let (vkp, vkq) = (v[k][p], v[k][q]);
                    v[k][p] = c * vkp - s * vkq;
                    v[k][q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut eigenvalues = [0.0; N];
    for i in 0..dim {
        eigenvalues[i] = a[i][i].clamp(floor, ceiling);
    }

    for i in 0..dim {
        for j in 0..dim {
            let mut sum = 0.0;
            for k in 0..dim {
                sum += v[i][k] * eigenvalues[k] * v[j][k];
            }
            matrix[i][j] = sum;
        }
    }
    make_symmetric(matrix, dim);
}
