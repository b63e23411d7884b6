//! 物理相关
//!
//! - config: rig 可调参数（全局默认值）
//! - world: 世界查询接口与解析地面
//! - trace: 腿部地面探测
//! - rapier_world: rapier3d 查询后端

pub mod config;
mod rapier_world;
mod trace;
mod world;

pub use config::{get_config, reset_config, set_config, RigConfig};
pub use rapier_world::RapierWorld;
pub use trace::LegTracer;
pub use world::{BodyId, FlatGround, IgnoreSet, WorldQuery};
