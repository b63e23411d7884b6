//! 多足 rig
//!
//! - definition: 腿/脊柱定义与索引解析
//! - state: 每条腿的运行时状态与步态时钟
//! - spider_rig: 逐帧更新
//! - effects: 落地冲击通知
//! - demo_leg: 单链演示 rig
//! - crowd: 多角色并行更新

mod crowd;
mod definition;
mod demo_leg;
mod effects;
mod spider_rig;
mod state;

pub use crowd::{tick_crowd, RigInstance};
pub use definition::{resolve, LegDef, ResolvedIndices, RigVariant, SpineDef};
pub use demo_leg::{demo_target, DemoLegRig};
pub use effects::{ChannelEffects, EffectsSink, ImpactEvent, RecordedEffects};
pub use spider_rig::{CharacterState, RigContext, SpiderRig};
pub use state::{LegFlags, LegRuntime, LocomotionSample, LocomotionState};
