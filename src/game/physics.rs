use nalgebra::{UnitQuaternion, Vector3};
use rapier3d::prelude::*;
use std::collections::HashMap;

use super::constants::physics as consts;

// Collision categories.
// Ground rays see everything solid; hit-scan rays only see targets.
const GROUP_STATIC: Group = Group::GROUP_1; // Floors, ramps, walls
const GROUP_CHARACTER: Group = Group::GROUP_2; // Controlled characters
const GROUP_TARGET: Group = Group::GROUP_3; // Hit-scan targets ("Enemy" layer)

/// Collision category a collider belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionCategory {
    Static,
    Character,
    Target,
}

impl CollisionCategory {
    fn group(self) -> Group {
        match self {
            CollisionCategory::Static => GROUP_STATIC,
            CollisionCategory::Character => GROUP_CHARACTER,
            CollisionCategory::Target => GROUP_TARGET,
        }
    }
}

/// Restricts what a ray may hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct RayFilter {
    /// Entity whose colliders are skipped (usually the caster itself)
    pub exclude: Option<u64>,
    /// Only colliders of this category are considered; `None` means any
    pub category: Option<CollisionCategory>,
}

impl RayFilter {
    pub fn excluding(entity_id: u64) -> Self {
        Self {
            exclude: Some(entity_id),
            category: None,
        }
    }

    pub fn with_category(mut self, category: CollisionCategory) -> Self {
        self.category = Some(category);
        self
    }
}

/// First surface hit by a ray.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RayHit {
    /// Distance along the (unit) ray direction
    pub distance: f32,
    pub point: [f32; 3],
    /// Outward surface normal at the hit point
    pub normal: [f32; 3],
    /// Entity owning the hit collider, if it was registered with an id
    pub entity: Option<u64>,
}

/// Read-only world geometry the controller queries each tick.
///
/// The controller never owns the world; anything that can answer a ray cast
/// (a rapier world, a test plane, another engine) can stand behind this trait.
pub trait WorldQuery {
    /// Casts a ray from `origin` along unit `direction`, up to `max_distance`.
    fn cast_ray(
        &self,
        origin: Vector3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
        filter: RayFilter,
    ) -> Option<RayHit>;
}

/// Shape of a static part.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartShape {
    Block,
    Ball,
}

/// Builds a collider for a static part of the given size (full extents).
fn build_collider(size: [f32; 3], shape: PartShape, category: CollisionCategory) -> Collider {
    let [sx, sy, sz] = size;
    let shared_shape = match shape {
        PartShape::Block => SharedShape::cuboid(sx / 2.0, sy / 2.0, sz / 2.0),
        PartShape::Ball => SharedShape::ball(sx / 2.0),
    };
    ColliderBuilder::new(shared_shape)
        .collision_groups(InteractionGroups::new(category.group(), Group::ALL))
        .build()
}

/// Rotation from Euler angles in degrees, nalgebra convention (X roll, Y pitch, Z yaw).
pub fn rotation_from_degrees(euler_degrees: [f32; 3]) -> UnitQuaternion<f32> {
    UnitQuaternion::from_euler_angles(
        euler_degrees[0].to_radians(),
        euler_degrees[1].to_radians(),
        euler_degrees[2].to_radians(),
    )
}

/// Rotation about the world up axis.
pub fn yaw_rotation(yaw: f32) -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw)
}

/// Wrapper around a Rapier3D world standing in for the external physics engine.
/// Gravity integration and collision resolution happen in `step`; the
/// controller only reads ray casts and writes character velocity and yaw.
pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,

    /// Maps entity id to Rapier rigid body handle
    pub entity_to_body: HashMap<u64, RigidBodyHandle>,
    /// Maps Rapier rigid body handle to entity id (reverse lookup)
    pub body_to_entity: HashMap<RigidBodyHandle, u64>,
    /// Maps Rapier collider handle to entity id (for ray hit reporting)
    pub collider_to_entity: HashMap<ColliderHandle, u64>,
}

impl PhysicsWorld {
    /// Creates a new physics world with default gravity
    pub fn new() -> Self {
        Self {
            gravity: vector![0.0, -consts::DEFAULT_GRAVITY, 0.0],
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            entity_to_body: HashMap::new(),
            body_to_entity: HashMap::new(),
            collider_to_entity: HashMap::new(),
        }
    }

    /// Sets the gravity for the physics world
    pub fn set_gravity(&mut self, gravity_y: f32) {
        self.gravity = vector![0.0, -gravity_y, 0.0];
    }

    /// Steps the physics simulation forward by dt seconds
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Refreshes the query pipeline so ray casts see the latest collider poses.
    pub fn update_queries(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Adds a fixed part (floor, ramp, wall or target dummy)
    pub fn add_part(
        &mut self,
        entity_id: u64,
        position: [f32; 3],
        rotation_degrees: [f32; 3],
        size: [f32; 3],
        shape: PartShape,
        category: CollisionCategory,
    ) -> RigidBodyHandle {
        let quat = rotation_from_degrees(rotation_degrees);
        let body = RigidBodyBuilder::fixed()
            .translation(vector![position[0], position[1], position[2]])
            .rotation(quat.scaled_axis())
            .build();
        let handle = self.rigid_body_set.insert(body);

        let collider = build_collider(size, shape, category);
        let collider_handle = self
            .collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);

        self.entity_to_body.insert(entity_id, handle);
        self.body_to_entity.insert(handle, entity_id);
        self.collider_to_entity.insert(collider_handle, entity_id);

        handle
    }

    /// Adds a capsule body for a controlled character.
    /// The body is dynamic so the engine owns gravity and contacts, with
    /// rotations locked because yaw is driven by the controller.
    pub fn add_character(
        &mut self,
        entity_id: u64,
        position: [f32; 3],
        radius: f32,
        height: f32,
        category: CollisionCategory,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![position[0], position[1], position[2]])
            .lock_rotations()
            .build();
        let body_handle = self.rigid_body_set.insert(body);

        // Total height = 2*half_height + 2*radius
        let half_height = (height - 2.0 * radius).max(0.0) / 2.0;
        let collider = ColliderBuilder::capsule_y(half_height, radius)
            .friction(0.0)
            .collision_groups(InteractionGroups::new(
                GROUP_CHARACTER | category.group(),
                Group::ALL,
            ))
            .build();
        let collider_handle = self
            .collider_set
            .insert_with_parent(collider, body_handle, &mut self.rigid_body_set);

        self.entity_to_body.insert(entity_id, body_handle);
        self.body_to_entity.insert(body_handle, entity_id);
        self.collider_to_entity.insert(collider_handle, entity_id);

        body_handle
    }

    /// Removes any entity (part or character) from the physics world
    pub fn remove_entity(&mut self, entity_id: u64) -> bool {
        let Some(handle) = self.entity_to_body.remove(&entity_id) else {
            return false;
        };
        self.body_to_entity.remove(&handle);
        if let Some(body) = self.rigid_body_set.get(handle) {
            for &ch in body.colliders() {
                self.collider_to_entity.remove(&ch);
            }
        }
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        true
    }

    /// Checks if an entity has a physics body
    pub fn has_entity(&self, entity_id: u64) -> bool {
        self.entity_to_body.contains_key(&entity_id)
    }

    /// Gets the handle for an entity
    pub fn get_handle(&self, entity_id: u64) -> Option<RigidBodyHandle> {
        self.entity_to_body.get(&entity_id).copied()
    }

    /// Gets the position of an entity's body
    pub fn get_position(&self, entity_id: u64) -> Option<Vector3<f32>> {
        let body = self.rigid_body_set.get(self.get_handle(entity_id)?)?;
        Some(*body.translation())
    }

    /// Gets the linear velocity of an entity's body
    pub fn get_velocity(&self, entity_id: u64) -> Option<Vector3<f32>> {
        let body = self.rigid_body_set.get(self.get_handle(entity_id)?)?;
        Some(*body.linvel())
    }

    /// Writes controller output (velocity and facing yaw) to a character body.
    pub fn set_character_motion(&mut self, entity_id: u64, velocity: Vector3<f32>, yaw: f32) -> bool {
        let Some(handle) = self.get_handle(entity_id) else {
            return false;
        };
        let Some(body) = self.rigid_body_set.get_mut(handle) else {
            return false;
        };
        body.set_linvel(velocity, true);
        body.set_rotation(yaw_rotation(yaw), true);
        true
    }
}

impl WorldQuery for PhysicsWorld {
    fn cast_ray(
        &self,
        origin: Vector3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
        filter: RayFilter,
    ) -> Option<RayHit> {
        let ray = Ray::new(Point::from(origin), direction);

        let mut query_filter = QueryFilter::default().exclude_sensors();
        if let Some(body_handle) = filter.exclude.and_then(|id| self.get_handle(id)) {
            query_filter = query_filter.exclude_rigid_body(body_handle);
        }
        if let Some(category) = filter.category {
            query_filter = query_filter.groups(InteractionGroups::new(Group::ALL, category.group()));
        }

        let (hit_collider, intersection) = self.query_pipeline.cast_ray_and_get_normal(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_distance,
            true, // solid
            query_filter,
        )?;

        let point = ray.point_at(intersection.time_of_impact);
        let normal = intersection.normal;
        Some(RayHit {
            distance: intersection.time_of_impact,
            point: [point.x, point.y, point.z],
            normal: [normal.x, normal.y, normal.z],
            entity: self.collider_to_entity.get(&hit_collider).copied(),
        })
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
