//! Rig 可调参数
//!
//! 所有参数扁平化，直接在代码中修改默认值即可。
//! 距离单位与宿主一致（默认值按厘米设计），时间单位为秒。

use once_cell::sync::Lazy;
use std::sync::RwLock;

/// Rig 配置（扁平化，不嵌套）
#[derive(Debug, Clone, PartialEq)]
pub struct RigConfig {
    // ========== 脊柱弹簧 ==========
    /// 弹簧刚度，默认 0.9
    pub spine_spring_stiffness: f32,
    /// 阻尼比，默认 0.25（欠阻尼，脊柱会轻微回弹）
    pub spine_spring_damping_ratio: f32,
    /// 着地时弹簧时间倍率：每秒推进多少“弹簧秒”，默认 6.0
    pub spine_spring_rate: f32,
    /// 下落时弹簧时间倍率，默认 3.0（下落时脊柱更迟滞）
    pub falling_spine_spring_rate: f32,

    // ========== CCD IK ==========
    /// 末端容差距离，默认 1.0
    pub ccd_precision: f32,
    /// 最大迭代次数，默认 10
    pub ccd_max_iterations: u32,
    /// 从末端向根部遍历，默认 true
    pub ccd_start_from_tail: bool,
    /// 累积角度限制，默认 false（只限制单次迭代）
    pub ccd_enable_rotation_limit: bool,
    /// 腿部关节角度限制（度），默认 30
    pub leg_rotation_limit_degrees: f32,

    // ========== 移动 ==========
    /// 水平速度超过此值视为“在移动”，默认 1.0
    pub move_speed_threshold: f32,
    /// 停止移动后过渡到静止姿态的时长，默认 0.5 秒
    pub stall_duration: f32,
    /// 滞后速度比的追赶速率（1/秒），默认 4.0
    pub speed_lag: f32,
    /// 步态时钟系数：相位增量 = 水平速度 × dt × throttle，默认 0.012
    pub throttle: f32,
    /// 落脚点沿速度方向的前探时间，默认 0.15 秒
    pub stride_lead_time: f32,
    /// 抬腿高度，默认 12.0
    pub lift_height: f32,
    /// 着地腿的跟随速率（1/秒），默认 2.0
    pub stuck_leg_lag: f32,
    /// 抬起腿的跟随速率（1/秒），默认 20.0
    pub lifted_leg_lag: f32,

    // ========== 下落 ==========
    /// 腿向外张开量 = |垂直速度| × 系数，默认 0.05
    pub fall_spread_factor: f32,
    /// 最大张开量，默认 15.0
    pub max_fall_spread: f32,
    /// 抬腿量 = −垂直速度 × 系数，默认 0.04
    pub fall_lift_factor: f32,
    /// 最大抬腿量（绝对值），默认 10.0
    pub max_fall_lift: f32,
    /// 下落时腿的跟随速率（1/秒），默认 8.0
    pub falling_leg_lag: f32,
    /// 脊柱倾斜 = 水平速度分量 × 系数（弧度），默认 0.002
    pub fall_tilt_factor: f32,
    /// 最大倾斜角（度），默认 20
    pub max_fall_tilt_degrees: f32,

    // ========== 地面探测 ==========
    /// 探测原点相对脊柱的抬高量，默认 20.0
    pub trace_origin_height: f32,
    /// 探测起点在落脚点之前的距离，默认 30.0
    pub trace_inward: f32,
    /// 探测终点在落脚点之后的距离，默认 30.0
    pub trace_outward: f32,
    /// 探测球半径，默认 2.0
    pub trace_radius: f32,
    /// 首次未命中时是否做攀边回探，默认 true
    pub ledge_trace: bool,

    // ========== 特效 ==========
    /// 落地冲击低于此高度差时不通知，默认 0.0（总是通知）
    pub min_impact_height: f32,
    /// 落地时是否为每条着地的腿额外通知，默认 false
    pub notify_leg_impacts: bool,

    // ========== 调试 ==========
    /// 是否输出逐帧调试日志，默认 false
    pub debug_log: bool,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            // ====== 脊柱弹簧 ======
            spine_spring_stiffness: 0.9,
            spine_spring_damping_ratio: 0.25,
            // 60 FPS 下每帧推进 0.1 弹簧秒
            spine_spring_rate: 6.0,
            falling_spine_spring_rate: 3.0,

            // ====== CCD IK ======
            ccd_precision: 1.0,
            ccd_max_iterations: 10,
            ccd_start_from_tail: true,
            ccd_enable_rotation_limit: false,
            leg_rotation_limit_degrees: 30.0,

            // ====== 移动 ======
            move_speed_threshold: 1.0,
            stall_duration: 0.5,
            speed_lag: 4.0,
            // 最高步行速度 160 时约 2 个步态周期/秒
            throttle: 0.012,
            stride_lead_time: 0.15,
            lift_height: 12.0,
            stuck_leg_lag: 2.0,
            lifted_leg_lag: 20.0,

            // ====== 下落 ======
            fall_spread_factor: 0.05,
            max_fall_spread: 15.0,
            fall_lift_factor: 0.04,
            max_fall_lift: 10.0,
            falling_leg_lag: 8.0,
            fall_tilt_factor: 0.002,
            max_fall_tilt_degrees: 20.0,

            // ====== 地面探测 ======
            trace_origin_height: 20.0,
            trace_inward: 30.0,
            trace_outward: 30.0,
            trace_radius: 2.0,
            ledge_trace: true,

            // ====== 特效 ======
            min_impact_height: 0.0,
            notify_leg_impacts: false,

            // ====== 调试 ======
            debug_log: false,
        }
    }
}

impl RigConfig {
    /// 把负数参数截断为 0
    pub fn sanitized(mut self) -> Self {
        for value in [
            &mut self.spine_spring_stiffness,
            &mut self.spine_spring_damping_ratio,
            &mut self.spine_spring_rate,
            &mut self.falling_spine_spring_rate,
            &mut self.ccd_precision,
            &mut self.leg_rotation_limit_degrees,
            &mut self.move_speed_threshold,
            &mut self.stall_duration,
            &mut self.speed_lag,
            &mut self.stride_lead_time,
            &mut self.stuck_leg_lag,
            &mut self.lifted_leg_lag,
            &mut self.fall_spread_factor,
            &mut self.max_fall_spread,
            &mut self.max_fall_lift,
            &mut self.falling_leg_lag,
            &mut self.max_fall_tilt_degrees,
            &mut self.trace_inward,
            &mut self.trace_outward,
            &mut self.trace_radius,
            &mut self.min_impact_height,
        ] {
            if !(*value >= 0.0) {
                *value = 0.0;
            }
        }
        self
    }
}

/// 全局默认配置
static RIG_CONFIG: Lazy<RwLock<RigConfig>> = Lazy::new(|| RwLock::new(RigConfig::default()));

/// 获取当前默认配置（只读副本）
pub fn get_config() -> RigConfig {
    RIG_CONFIG.read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// 设置默认配置（之后创建的 rig 生效）
pub fn set_config(config: RigConfig) {
    *RIG_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = config;
}

/// 重置为默认配置
pub fn reset_config() {
    *RIG_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = RigConfig::default();
}
