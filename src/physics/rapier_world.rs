//! Rapier 世界查询后端
//!
//! 只用静态碰撞体和 QueryPipeline 做球体扫掠，不做动力学步进。
//! 每个碰撞体的 user_data 保存宿主的物体标识，用于忽略角色自身。

use glam::Vec3;
use rapier3d::parry::query::ShapeCastOptions;
use rapier3d::parry::shape::Ball;
use rapier3d::prelude::*;

use super::world::{BodyId, IgnoreSet, WorldQuery};

/// 基于 rapier3d 的世界
pub struct RapierWorld {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    query_pipeline: QueryPipeline,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierWorld {
    pub fn new() -> Self {
        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// 添加静态碰撞体并标记物体标识
    pub fn add_collider(&mut self, builder: ColliderBuilder, body_id: BodyId) -> ColliderHandle {
        let collider = builder.user_data(body_id as u128).build();
        let handle = self.colliders.insert(collider);
        self.refresh();
        handle
    }

    /// 添加一块顶面在 `height` 的方形地面
    pub fn add_ground(&mut self, height: f32, half_extent: f32, body_id: BodyId) -> ColliderHandle {
        const THICKNESS: f32 = 1.0;
        let builder = ColliderBuilder::cuboid(half_extent, half_extent, THICKNESS * 0.5)
            .translation(vector![0.0, 0.0, height - THICKNESS * 0.5]);
        let handle = self.add_collider(builder, body_id);
        log::info!("[Rapier] 地面: 高度={}, 半宽={}, id={}", height, half_extent, body_id);
        handle
    }

    /// 添加轴对齐盒子
    pub fn add_box(&mut self, center: Vec3, half_extents: Vec3, body_id: BodyId) -> ColliderHandle {
        let builder = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(vector![center.x, center.y, center.z]);
        self.add_collider(builder, body_id)
    }

    /// 移动已有碰撞体（移动平台等）
    pub fn set_collider_translation(&mut self, handle: ColliderHandle, position: Vec3) {
        if let Some(collider) = self.colliders.get_mut(handle) {
            collider.set_translation(vector![position.x, position.y, position.z]);
            self.refresh();
        } else {
            log::warn!("[Rapier] 碰撞体不存在: {:?}", handle);
        }
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    /// 碰撞体变化后重建查询结构
    pub fn refresh(&mut self) {
        self.query_pipeline.update(&self.colliders);
    }
}

impl WorldQuery for RapierWorld {
    fn sweep_sphere(
        &self,
        origin: Vec3,
        end: Vec3,
        radius: f32,
        ignore: &IgnoreSet,
    ) -> Option<Vec3> {
        if radius <= 0.0 || !origin.is_finite() || !end.is_finite() {
            return None;
        }

        let delta = end - origin;
        let shape = Ball::new(radius);
        let shape_pos = Isometry::translation(origin.x, origin.y, origin.z);
        let shape_vel = vector![delta.x, delta.y, delta.z];
        let options = ShapeCastOptions::with_max_time_of_impact(1.0);

        let predicate = |_handle: ColliderHandle, collider: &Collider| {
            !ignore.contains(collider.user_data as BodyId)
        };
        let filter = QueryFilter::default().predicate(&predicate);

        self.query_pipeline
            .cast_shape(
                &self.bodies,
                &self.colliders,
                &shape_pos,
                &shape_vel,
                &shape,
                options,
                filter,
            )
            .map(|(_handle, hit)| origin + delta * hit.time_of_impact)
    }
}
