/// An ordered set of 3D points, optionally with per-point normals.
///
/// The cloud is immutable once constructed; the registration engine only
/// ever borrows it.
#[derive(Debug, Clone)]
pub struct PointCloud {
    // The points in the point cloud.
    points: Vec<[f64; 3]>,
    // The normals of the points.
    normals: Option<Vec<[f64; 3]>>,
}

impl PointCloud {
    /// Create a new point cloud from points and normals (optional).
    pub fn new(points: Vec<[f64; 3]>, normals: Option<Vec<[f64; 3]>>) -> Self {
        Self { points, normals }
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// Get as reference the normals of the points in the point cloud.
    pub fn normals(&self) -> Option<&[[f64; 3]]> {
        self.normals.as_deref()
    }

    /// Compute the centroid of the point cloud, or `None` when empty.
    pub fn centroid(&self) -> Option<[f64; 3]> {
        if self.points.is_empty() {
            return None;
        }
        let mut sum = [0.0; 3];
        for p in &self.points {
            sum[0] += p[0];
            sum[1] += p[1];
            sum[2] += p[2];
        }
        let n = self.points.len() as f64;
        Some([sum[0] / n, sum[1] / n, sum[2] / n])
    }

    /// Get the minimum bound of the point cloud.
    pub fn min_bound(&self) -> [f64; 3] {
        match self.points.first() {
            Some(first) => self.points.iter().fold(*first, fold_min),
            None => [0.0; 3],
        }
    }

    /// Get the maximum bound of the point cloud.
    pub fn max_bound(&self) -> [f64; 3] {
        match self.points.first() {
            Some(first) => self.points.iter().fold(*first, fold_max),
            None => [0.0; 3],
        }
    }

    /// Roughly normalize the cloud by dividing every point by the norm of
    /// the axis-aligned bounding-box extents, so that scans of different
    /// absolute sizes become comparable before registration.
    pub fn rough_normalize(&self) -> Self {
        let (min, max) = (self.min_bound(), self.max_bound());
        let scale = ((max[0] - min[0]).powi(2)
            + (max[1] - min[1]).powi(2)
            + (max[2] - min[2]).powi(2))
        .sqrt();
        if !scale.is_finite() || scale == 0.0 {
            return self.clone();
        }
        Self {
            points: self
                .points
                .iter()
                .map(|p| [p[0] / scale, p[1] / scale, p[2] / scale])
                .collect(),
            normals: self.normals.clone(),
        }
    }
}

fn fold_min(acc: [f64; 3], p: &[f64; 3]) -> [f64; 3] {
    [acc[0].min(p[0]), acc[1].min(p[1]), acc[2].min(p[2])]
}

fn fold_max(acc: [f64; 3], p: &[f64; 3]) -> [f64; 3] {
    [acc[0].max(p[0]), acc[1].max(p[1]), acc[2].max(p[2])]
}
