//! Compile-time capacity limits
//!
//! These size every fixed-capacity array in the history and bound both
//! worst-case memory and per-operation cost.

/// Number of past frames kept in the history
pub const MAX_REWIND_FRAMES: usize = 60;

/// Maximum number of registered bodies
pub const MAX_BODIES: usize = 64;

/// One proximity volume per body
pub const MAX_PROXIMITY_COUNT: usize = MAX_BODIES;

/// Maximum boxes a single body may report
pub const MAX_BOXES_PER_BODY: usize = 16;

/// Maximum spheres a single body may report
pub const MAX_SPHERES_PER_BODY: usize = 16;

/// Maximum capsules a single body may report
pub const MAX_CAPSULES_PER_BODY: usize = 16;

/// Maximum narrow-phase primitives under one proximity volume
pub const MAX_CHILDREN_PER_PROXIMITY: usize =
    MAX_BOXES_PER_BODY + MAX_SPHERES_PER_BODY + MAX_CAPSULES_PER_BODY;

/// Maximum narrow-phase primitives in one snapshot
pub const MAX_OBJECTS: usize = MAX_PROXIMITY_COUNT * MAX_CHILDREN_PER_PROXIMITY;

/// World-wide box capacity
pub const MAX_BOX_COUNT: usize = MAX_BODIES * MAX_BOXES_PER_BODY;

/// World-wide sphere capacity
pub const MAX_SPHERE_COUNT: usize = MAX_BODIES * MAX_SPHERES_PER_BODY;

/// World-wide capsule capacity
pub const MAX_CAPSULE_COUNT: usize = MAX_BODIES * MAX_CAPSULES_PER_BODY;
