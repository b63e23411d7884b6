//! 单链演示 rig
//!
//! 把整个层次按索引顺序当作一条 CCD 链，末端沿时间驱动的轨迹运动。

use glam::Vec3;

use crate::skeleton::{solve_ccd, CcdSettings, ChainLink, RigHierarchy};

/// 每个关节的单次迭代角度限制（度）
const DEMO_ROTATION_LIMIT: f32 = 10.0;

const DEMO_SETTINGS: CcdSettings = CcdSettings {
    precision: 0.1,
    max_iterations: 10,
    start_from_tail: true,
    enable_rotation_limit: false,
};

/// 演示轨迹：水平画圆，同时上下起伏
pub fn demo_target(time_seconds: f32) -> Vec3 {
    Vec3::new(
        time_seconds.sin() * 20.0,
        time_seconds.cos() * 20.0,
        10.0 + (time_seconds * 4.0).cos() * 10.0,
    )
}

#[derive(Debug, Default)]
pub struct DemoLegRig {
    ready: bool,
    chain: Vec<ChainLink>,
    limits: Vec<f32>,
}

impl DemoLegRig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 层次非空时就绪
    pub fn initialize(&mut self, hierarchy: &dyn RigHierarchy) -> bool {
        self.ready = !hierarchy.is_empty();
        if !self.ready {
            log::warn!("[DemoLegRig] 层次为空，未就绪");
        }
        self.ready
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn tick(&mut self, hierarchy: &mut dyn RigHierarchy, time_seconds: f32) -> bool {
        if !self.ready {
            return false;
        }
        self.set_leg_location(hierarchy, demo_target(time_seconds));
        true
    }

    /// 求解并写回，返回是否有骨骼移动
    pub fn set_leg_location(&mut self, hierarchy: &mut dyn RigHierarchy, location: Vec3) -> bool {
        let length = hierarchy.len();
        if self.chain.len() < length {
            self.chain.resize(length, ChainLink::default());
            self.limits.resize(length, DEMO_ROTATION_LIMIT);
        }

        for i in 0..length {
            self.chain[i] =
                ChainLink::new(hierarchy.global_transform(i), hierarchy.local_transform(i));
            self.limits[i] = DEMO_ROTATION_LIMIT;
        }

        if !solve_ccd(&mut self.chain[..length], location, &DEMO_SETTINGS, &self.limits[..length]) {
            return false;
        }

        for (i, link) in self.chain[..length].iter().enumerate() {
            hierarchy.set_global_transform(i, link.transform, true);
        }
        true
    }
}
