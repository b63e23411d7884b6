//! 特效通知
//!
//! 落地冲击只是“尽力而为”的通知：rig 从不等待，也不关心是否送达。

use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Mutex;

use glam::Vec3;

/// 落地冲击事件
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImpactEvent {
    /// 世界空间位置
    pub position: Vec3,
    /// 冲击量（下落高度差）
    pub magnitude: f32,
    /// 单腿落地（否则为整体落地）
    pub is_leg: bool,
}

impl ImpactEvent {
    /// 粒子缩放系数
    pub fn effect_scale(&self) -> f32 {
        (self.magnitude / 4.0).clamp(10.0, 40.0)
    }
}

/// 特效接收方
pub trait EffectsSink {
    /// 不得阻塞
    fn notify_impact(&self, event: ImpactEvent);
}

impl<F> EffectsSink for F
where
    F: Fn(ImpactEvent),
{
    fn notify_impact(&self, event: ImpactEvent) {
        self(event)
    }
}

/// 有界通道实现，满了就丢弃
#[derive(Clone, Debug)]
pub struct ChannelEffects {
    sender: SyncSender<ImpactEvent>,
}

impl ChannelEffects {
    pub fn bounded(capacity: usize) -> (Self, Receiver<ImpactEvent>) {
        let (sender, receiver) = mpsc::sync_channel(capacity);
        (Self { sender }, receiver)
    }
}

impl EffectsSink for ChannelEffects {
    fn notify_impact(&self, event: ImpactEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                log::debug!("[Effects] 通道已满，丢弃冲击事件: {:.2}", event.magnitude);
            }
            Err(TrySendError::Disconnected(_)) => {
                log::debug!("[Effects] 接收方已断开");
            }
        }
    }
}

/// 记录所有事件（测试、回放用）
#[derive(Debug, Default)]
pub struct RecordedEffects {
    events: Mutex<Vec<ImpactEvent>>,
}

impl RecordedEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ImpactEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EffectsSink for RecordedEffects {
    fn notify_impact(&self, event: ImpactEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
