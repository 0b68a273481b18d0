use crate::common::config::DEFAULT_TOLERANCE;

pub trait FaceComparator {
    /// One flag per entry of `known`: does it match `candidate`?
    fn compare_faces(&self, known: &[Vec<f32>], candidate: &[f32]) -> Vec<bool>;
}

/// Matches when the Euclidean distance is at most `tolerance`.
/// Lower tolerance is stricter.
#[derive(Debug, Clone, Copy)]
pub struct DistanceComparator {
    tolerance: f32,
}

impl DistanceComparator {
    pub fn new(tolerance: f32) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }
}

impl Default for DistanceComparator {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl FaceComparator for DistanceComparator {
    fn compare_faces(&self, known: &[Vec<f32>], candidate: &[f32]) -> Vec<bool> {
        known
            .iter()
            .map(|encoding| {
                // Encodings of different length never match
                encoding.len() == candidate.len()
                    && euclidean_distance(encoding, candidate) <= self.tolerance
            })
            .collect()
    }
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_euclidean_distance() {
        assert_relative_eq!(euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_relative_eq!(euclidean_distance(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_compare_returns_one_flag_per_known_encoding() {
        let known = vec![vec![0.0, 0.0], vec![0.5, 0.0], vec![1.0, 0.0]];
        let matches = DistanceComparator::new(0.6).compare_faces(&known, &[0.0, 0.0]);
        assert_eq!(matches, vec![true, true, false]);
    }

    #[test]
    fn test_tolerance_boundary_is_inclusive() {
        let known = vec![vec![0.5, 0.0]];
        assert_eq!(DistanceComparator::new(0.5).compare_faces(&known, &[0.0, 0.0]), vec![true]);
        assert_eq!(DistanceComparator::new(0.4).compare_faces(&known, &[0.0, 0.0]), vec![false]);
    }

    #[test]
    fn test_dimension_mismatch_never_matches() {
        let known = vec![vec![0.0, 0.0, 0.0]];
        assert_eq!(DistanceComparator::default().compare_faces(&known, &[0.0, 0.0]), vec![false]);
    }

    #[test]
    fn test_empty_known_set() {
        assert!(DistanceComparator::default().compare_faces(&[], &[0.1]).is_empty());
    }
}
