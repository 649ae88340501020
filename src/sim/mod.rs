//! Decorative simulations
//!
//! Two unrelated models that only share vocabulary (bodies, anchors, bounds):
//! - `cluster`: spring + repulsion particles (header blobs, tech graph)
//! - `pills`: rigid-body pill board with contacts, driven by a fixed timestep
//!
//! Neither knows about rendering; callers read positions/transforms out.

pub mod cluster;
pub mod collision;
pub mod pills;
pub mod stepper;

pub use cluster::{ClusterBody, ClusterParams, ParticleCluster, repulsion};
pub use collision::{CollisionResult, Wall, capsule_capsule, capsule_wall};
pub use pills::{PillBoard, PillBody, PillTuning, RigidWorld, cap_speed};
pub use stepper::{FixedStepper, Smoothed};
