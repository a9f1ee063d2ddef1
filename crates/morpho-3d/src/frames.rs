//! Declarative joint coordinate-system definitions.
//!
//! A frame definition names which landmarks provide the origin, the
//! principal axis and the reference plane of a joint coordinate system.
//! Definitions are pure data resolved against a landmark map at call time;
//! the actual axis/plane orthogonalization is performed by the downstream
//! coordinate-system builder, not here.

use std::collections::HashMap;

use thiserror::Error;

/// Named 3D landmarks in homogeneous coordinates.
pub type Landmarks = HashMap<String, [f64; 4]>;

/// Error type for frame resolution.
#[derive(Debug, Error)]
pub enum FrameError {
    /// A referenced landmark name is missing from the landmark map.
    #[error("unknown landmark '{0}'")]
    UnknownLandmark(String),
    /// A landmark reference list has no entries.
    #[error("landmark reference list is empty")]
    EmptyReference,
}

/// A coordinate axis label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// The x axis.
    X,
    /// The y axis.
    Y,
    /// The z axis.
    Z,
}

/// Which constraint is preserved exactly when the frame is orthogonalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keep {
    /// Keep the axis direction exact, adjust the plane.
    Axis,
    /// Keep the plane normal exact, adjust the axis.
    Plane,
}

/// A landmark reference: one or more landmark names whose positions are
/// averaged at resolve time.
pub type LandmarkRef = Vec<String>;

/// Declarative definition of a joint coordinate system.
#[derive(Debug, Clone)]
pub struct FrameDefinition {
    /// Landmarks averaged into the frame origin.
    pub origin: LandmarkRef,
    /// Start and end landmarks of the principal axis.
    pub axis: (LandmarkRef, LandmarkRef),
    /// Which axis the principal axis maps to.
    pub axis_name: Axis,
    /// Two in-plane vectors (start/end landmark pairs) whose cross product
    /// is the plane normal.
    pub plane: ((LandmarkRef, LandmarkRef), (LandmarkRef, LandmarkRef)),
    /// Which axis the plane normal maps to.
    pub plane_name: Axis,
    /// Orthogonalization priority.
    pub keep: Keep,
}

/// A frame definition with every landmark reference replaced by its
/// averaged homogeneous position.
#[derive(Debug, Clone)]
pub struct ResolvedFrame {
    /// Frame origin.
    pub origin: [f64; 4],
    /// Start and end points of the principal axis.
    pub axis: ([f64; 4], [f64; 4]),
    /// Which axis the principal axis maps to.
    pub axis_name: Axis,
    /// Start and end points of the two in-plane vectors.
    pub plane: (([f64; 4], [f64; 4]), ([f64; 4], [f64; 4])),
    /// Which axis the plane normal maps to.
    pub plane_name: Axis,
    /// Orthogonalization priority.
    pub keep: Keep,
}

impl FrameDefinition {
    /// Resolve every landmark reference against a landmark map.
    pub fn resolve(&self, landmarks: &Landmarks) -> Result<ResolvedFrame, FrameError> {
        Ok(ResolvedFrame {
            origin: lookup_mean(&self.origin, landmarks)?,
            axis: (
                lookup_mean(&self.axis.0, landmarks)?,
                lookup_mean(&self.axis.1, landmarks)?,
            ),
            axis_name: self.axis_name,
            plane: (
                (
                    lookup_mean(&self.plane.0 .0, landmarks)?,
                    lookup_mean(&self.plane.0 .1, landmarks)?,
                ),
                (
                    lookup_mean(&self.plane.1 .0, landmarks)?,
                    lookup_mean(&self.plane.1 .1, landmarks)?,
                ),
            ),
            plane_name: self.plane_name,
            keep: self.keep,
        })
    }
}

fn lookup_mean(names: &[String], landmarks: &Landmarks) -> Result<[f64; 4], FrameError> {
    if names.is_empty() {
        return Err(FrameError::EmptyReference);
    }
    let mut sum = [0.0; 3];
    for name in names {
        let p = landmarks
            .get(name)
            .ok_or_else(|| FrameError::UnknownLandmark(name.clone()))?;
        sum[0] += p[0];
        sum[1] += p[1];
        sum[2] += p[2];
    }
    let n = names.len() as f64;
    Ok([sum[0] / n, sum[1] / n, sum[2] / n, 1.0])
}

/// Registry mapping a coordinate-system name to its declarative definition.
#[derive(Debug, Clone, Default)]
pub struct FrameRegistry {
    definitions: HashMap<String, FrameDefinition>,
}

impl FrameRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the ISB scapular coordinate system:
    /// origin at AA, x axis from TS to AA, y plane spanned by AI->TS and
    /// AI->AA, axis kept exact.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(
            "ISB",
            FrameDefinition {
                origin: vec!["AA".into()],
                axis: (vec!["TS".into()], vec!["AA".into()]),
                axis_name: Axis::X,
                plane: (
                    (vec!["AI".into()], vec!["TS".into()]),
                    (vec!["AI".into()], vec!["AA".into()]),
                ),
                plane_name: Axis::Y,
                keep: Keep::Axis,
            },
        );
        registry
    }

    /// Register a definition under a name, replacing any previous entry.
    pub fn register(&mut self, name: &str, definition: FrameDefinition) {
        self.definitions.insert(name.to_string(), definition);
    }

    /// Look up a definition by name.
    pub fn get(&self, name: &str) -> Option<&FrameDefinition> {
        self.definitions.get(name)
    }

    /// Names of all registered definitions.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }
}
