//! Collision layers and the layer collision matrix.
//!
//! Every body lives on one of 32 layers. The [`LayerCollisionMatrix`] records
//! which layer pairs ignore each other; the ground sensor derives its cast
//! mask from it.

use bevy::prelude::*;

/// Number of collision layers.
pub const LAYER_COUNT: u8 = 32;

/// Layer whose colliders are never hit by sensor casts.
pub const IGNORE_RAYCAST_LAYER: u8 = 2;

/// Mask that includes every layer.
pub const ALL_LAYERS: u32 = u32::MAX;

/// The collision layer of an entity. Entities without it are on layer 0.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[reflect(Component)]
pub struct CollisionLayer(pub u8);

impl CollisionLayer {
    /// Create a collision layer, wrapping out-of-range values into `0..32`.
    pub fn new(layer: u8) -> Self {
        Self(layer % LAYER_COUNT)
    }

    /// The single-bit mask for this layer.
    #[inline]
    pub fn bit(self) -> u32 {
        1 << (self.0 % LAYER_COUNT)
    }
}

/// Symmetric table of layer pairs that do not collide.
#[derive(Resource, Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[reflect(Resource)]
pub struct LayerCollisionMatrix {
    /// `ignored[a]` bit `b` set means layers `a` and `b` ignore each other.
    ignored: [u32; LAYER_COUNT as usize],
}

impl LayerCollisionMatrix {
    /// Mark the pair `(a, b)` as ignoring (or colliding with) each other.
    pub fn set_ignore(&mut self, a: u8, b: u8, ignore: bool) {
        let (a, b) = (a % LAYER_COUNT, b % LAYER_COUNT);
        if ignore {
            self.ignored[a as usize] |= 1 << b;
            self.ignored[b as usize] |= 1 << a;
        } else {
            self.ignored[a as usize] &= !(1 << b);
            self.ignored[b as usize] &= !(1 << a);
        }
    }

    /// Builder: ignore collisions between `a` and `b`.
    pub fn with_ignored(mut self, a: u8, b: u8) -> Self {
        self.set_ignore(a, b, true);
        self
    }

    /// Whether layers `a` and `b` ignore each other.
    pub fn ignores(&self, a: u8, b: u8) -> bool {
        let (a, b) = (a % LAYER_COUNT, b % LAYER_COUNT);
        self.ignored[a as usize] & (1 << b) != 0
    }

    /// Mask of the layers a body on `layer` collides with.
    pub fn collision_mask_for(&self, layer: CollisionLayer) -> u32 {
        let mut mask = ALL_LAYERS;
        for other in 0..LAYER_COUNT {
            if self.ignores(layer.0, other) {
                mask &= !(1 << other);
            }
        }
        mask
    }

    /// Compute the cast mask for a body on `layer`.
    ///
    /// Starts from [`collision_mask_for`](Self::collision_mask_for), then
    /// drops [`IGNORE_RAYCAST_LAYER`].
    pub fn cast_mask_for(&self, layer: CollisionLayer) -> u32 {
        self.collision_mask_for(layer) & !(1 << IGNORE_RAYCAST_LAYER)
    }
}
