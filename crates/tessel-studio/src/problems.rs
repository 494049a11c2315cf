use tessel_solve::{matrix, CsrMatrix, SolveError};

/// 5-point Laplacian on a `k × k` grid with Dirichlet boundary (SPD).
pub fn poisson_2d(k: usize) -> Result<CsrMatrix<f64>, SolveError> {
    let idx = |x: usize, y: usize| y * k + x;
    let mut triplets = Vec::with_capacity(5 * k * k);
    for y in 0..k {
        for x in 0..k {
            let i = idx(x, y);
            triplets.push((i, i, 4.0));
            if x > 0 {
                triplets.push((i, idx(x - 1, y), -1.0));
            }
            if x + 1 < k {
                triplets.push((i, idx(x + 1, y), -1.0));
            }
            if y > 0 {
                triplets.push((i, idx(x, y - 1), -1.0));
            }
            if y + 1 < k {
                triplets.push((i, idx(x, y + 1), -1.0));
            }
        }
    }
    matrix::from_triplets(k * k, k * k, &triplets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poisson_has_five_point_stencil() {
        let a = poisson_2d(3).unwrap();
        assert_eq!(a.nrows(), 9);
        // 9 diagonal + 2 * (horizontal + vertical) neighbour pairs (6 each).
        assert_eq!(a.nnz(), 9 + 2 * 12);
    }
}
