use kiddo::immutable::float::kdtree::ImmutableKdTree;

use crate::RegistrationError;

/// The closest reference point to one query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    /// Index of the closest point in the reference set.
    pub index: usize,
    /// Squared Euclidean distance to that point.
    pub distance_squared: f64,
}

/// Closest-point queries against a fixed reference point set.
///
/// This is the seam between the ICP engine and the spatial structure:
/// the engine only ever calls [`NearestNeighbor::nearest_one`], so an
/// accelerated index can replace the brute-force scan without touching
/// the engine.
pub trait NearestNeighbor {
    /// Find the closest reference point to `query`.
    fn nearest_one(&self, query: &[f64; 3]) -> Correspondence;

    /// Find the closest reference point to each query point.
    fn nearest(&self, queries: &[[f64; 3]]) -> Vec<Correspondence> {
        queries.iter().map(|q| self.nearest_one(q)).collect()
    }
}

/// Exhaustive O(N*M) nearest-neighbor scan.
///
/// Adequate for clouds of a few thousand points. Ties are broken by the
/// first-encountered minimum in reference order, which keeps queries
/// deterministic.
pub struct BruteForceIndex<'a> {
    reference: &'a [[f64; 3]],
}

impl<'a> BruteForceIndex<'a> {
    /// Build an index over a reference point set.
    pub fn new(reference: &'a [[f64; 3]]) -> Result<Self, RegistrationError> {
        if reference.is_empty() {
            return Err(RegistrationError::EmptyReferenceSet);
        }
        Ok(Self { reference })
    }
}

impl NearestNeighbor for BruteForceIndex<'_> {
    fn nearest_one(&self, query: &[f64; 3]) -> Correspondence {
        let mut best = Correspondence {
            index: 0,
            distance_squared: f64::INFINITY,
        };
        for (index, point) in self.reference.iter().enumerate() {
            let distance_squared = (point[0] - query[0]).powi(2)
                + (point[1] - query[1]).powi(2)
                + (point[2] - query[2]).powi(2);
            if distance_squared < best.distance_squared {
                best = Correspondence {
                    index,
                    distance_squared,
                };
            }
        }
        best
    }
}

/// Kd-tree nearest-neighbor index for large reference clouds.
pub struct KdTreeIndex {
    tree: ImmutableKdTree<f64, u32, 3, 32>,
}

impl KdTreeIndex {
    /// Build a kd-tree over a reference point set.
    pub fn new(reference: &[[f64; 3]]) -> Result<Self, RegistrationError> {
        if reference.is_empty() {
            return Err(RegistrationError::EmptyReferenceSet);
        }
        Ok(Self {
            tree: ImmutableKdTree::new_from_slice(reference),
        })
    }
}

impl NearestNeighbor for KdTreeIndex {
    fn nearest_one(&self, query: &[f64; 3]) -> Correspondence {
        let nn = self.tree.nearest_one::<kiddo::SquaredEuclidean>(query);
        Correspondence {
            index: nn.item as usize,
            distance_squared: nn.distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_random_points(num_points: usize) -> Vec<[f64; 3]> {
        (0..num_points)
            .map(|_| {
                [
                    rand::random::<f64>(),
                    rand::random::<f64>(),
                    rand::random::<f64>(),
                ]
            })
            .collect()
    }

    #[test]
    fn test_brute_force_finds_closest() -> Result<(), RegistrationError> {
        let reference = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 2.0, 0.0]];
        let index = BruteForceIndex::new(&reference)?;

        let c = index.nearest_one(&[0.9, 0.1, 0.0]);
        assert_eq!(c.index, 1);
        assert!((c.distance_squared - 0.02).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_brute_force_tie_breaks_on_first() -> Result<(), RegistrationError> {
        // both reference points are at distance 1 from the query
        let reference = vec![[1.0, 0.0, 0.0], [-1.0, 0.0, 0.0]];
        let index = BruteForceIndex::new(&reference)?;
        assert_eq!(index.nearest_one(&[0.0, 0.0, 0.0]).index, 0);
        Ok(())
    }

    #[test]
    fn test_empty_reference_fails() {
        assert!(matches!(
            BruteForceIndex::new(&[]),
            Err(RegistrationError::EmptyReferenceSet)
        ));
        assert!(matches!(
            KdTreeIndex::new(&[]),
            Err(RegistrationError::EmptyReferenceSet)
        ));
    }

    #[test]
    fn test_kdtree_agrees_with_brute_force() -> Result<(), RegistrationError> {
        let reference = create_random_points(200);
        let queries = create_random_points(50);

        let brute = BruteForceIndex::new(&reference)?;
        let kdtree = KdTreeIndex::new(&reference)?;

        for query in &queries {
            let a = brute.nearest_one(query);
            let b = kdtree.nearest_one(query);
            assert_eq!(a.index, b.index);
            assert!((a.distance_squared - b.distance_squared).abs() < 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_nearest_batch_matches_single_queries() -> Result<(), RegistrationError> {
        let reference = create_random_points(100);
        let queries = create_random_points(10);
        let index = BruteForceIndex::new(&reference)?;

        let batch = index.nearest(&queries);
        for (query, c) in queries.iter().zip(batch.iter()) {
            assert_eq!(index.nearest_one(query), *c);
        }
        Ok(())
    }
}
