//! 多角色并行更新
//!
//! 每个实例独占自己的 rig、层次、角色状态与特效接收方，
//! 世界与曲线只读共享，因此实例之间无需同步。

use rayon::prelude::*;

use crate::animation::Curve;
use crate::physics::WorldQuery;
use crate::skeleton::RigHierarchy;

use super::effects::EffectsSink;
use super::spider_rig::{CharacterState, RigContext, SpiderRig};

/// 单个角色
pub struct RigInstance<H, S> {
    pub rig: SpiderRig,
    pub hierarchy: H,
    pub character: CharacterState,
    pub effects: S,
}

impl<H, S> RigInstance<H, S>
where
    H: RigHierarchy,
    S: EffectsSink,
{
    pub fn new(rig: SpiderRig, hierarchy: H, effects: S) -> Self {
        Self {
            rig,
            hierarchy,
            character: CharacterState::default(),
            effects,
        }
    }

    pub fn tick(
        &mut self,
        delta_time: f32,
        world: &dyn WorldQuery,
        stick_curve: &dyn Curve,
        offset_curve: &dyn Curve,
    ) -> bool {
        let mut ctx = RigContext {
            hierarchy: &mut self.hierarchy,
            world,
            character: &self.character,
            stick_curve,
            offset_curve,
            effects: Some(&self.effects),
        };
        self.rig.tick(delta_time, &mut ctx)
    }
}

/// 并行推进所有实例，返回实际执行的数量
pub fn tick_crowd<H, S>(
    instances: &mut [RigInstance<H, S>],
    delta_time: f32,
    world: &(dyn WorldQuery + Sync),
    stick_curve: &(dyn Curve + Sync),
    offset_curve: &(dyn Curve + Sync),
) -> usize
where
    H: RigHierarchy + Send,
    S: EffectsSink + Send,
{
    instances
        .par_iter_mut()
        .map(|instance| instance.tick(delta_time, world, stick_curve, offset_curve))
        .filter(|executed| *executed)
        .count()
}
