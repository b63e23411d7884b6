//! 无界面演示：四足角色走路 -> 起跳 -> 落地
//!
//! 运行：`RUST_LOG=debug cargo run --features demo --bin rig_demo`

use glam::Vec3;

use spider_rig::animation::KeyedCurve;
use spider_rig::physics::RapierWorld;
use spider_rig::rig::{ChannelEffects, DemoLegRig, LegDef, RigContext, SpineDef};
use spider_rig::skeleton::{BoneSet, BoneTransform};
use spider_rig::{get_config, CharacterState, RigHierarchy, SpiderRig};

const FPS: f32 = 60.0;
const CHARACTER_BODY: u64 = 1;
const GROUND_BODY: u64 = 2;

fn build_spider() -> (BoneSet, SpineDef, Vec<LegDef>) {
    let mut set = BoneSet::new();
    let root = set.add_bone("root", None, BoneTransform::IDENTITY);
    set.add_control("spine_ctrl", Some(root), BoneTransform::from_translation(Vec3::Z * 12.0));
    let spine = set.add_bone("spine", Some(root), BoneTransform::from_translation(Vec3::Z * 12.0));

    let mut legs = Vec::new();
    for j in 0..4 {
        let angle = std::f32::consts::FRAC_PI_4 + std::f32::consts::FRAC_PI_2 * j as f32;
        let dir = Vec3::new(angle.cos(), angle.sin(), 0.0);
        let names = [format!("hip_{}", j), format!("knee_{}", j), format!("foot_{}", j)];

        let hip_pos = dir * 6.0 + Vec3::Z * 12.0;
        let knee_pos = dir * 18.0 + Vec3::Z * 18.0;
        let foot = BoneTransform::from_translation(dir * 30.0 + Vec3::Z * 2.0);
        let hip = set.add_bone(&names[0], Some(spine), BoneTransform::from_translation(hip_pos));
        let knee = set.add_bone(&names[1], Some(hip), BoneTransform::from_translation(knee_pos));
        set.add_bone(&names[2], Some(knee), foot);
        set.add_control(&format!("ik_{}", j), Some(root), foot);

        legs.push(LegDef::new(format!("ik_{}", j), names));
    }
    (set, SpineDef::new("spine_ctrl", "spine"), legs)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (mut set, spine, legs) = build_spider();
    let mut rig = SpiderRig::with_config(get_config());
    if let Err(e) = rig.configure(&set, &spine, &legs) {
        log::error!("[Demo] 配置失败: {}", e);
        return;
    }

    let mut world = RapierWorld::new();
    world.add_ground(0.0, 10_000.0, GROUND_BODY);

    let stick = KeyedCurve::default_stick();
    let offset = KeyedCurve::default_offset();
    let (effects, impacts) = ChannelEffects::bounded(16);

    let mut character = CharacterState {
        body_id: Some(CHARACTER_BODY),
        ..CharacterState::default()
    };
    let dt = 1.0 / FPS;
    let mut vertical_speed = 0.0f32;

    for frame in 0..240u32 {
        // 0-1s 走路，1s 起跳，之后弹道下落直到着地
        if frame < 60 {
            character.velocity = Vec3::new(120.0, 0.0, 0.0);
        } else if frame == 60 {
            vertical_speed = 320.0;
            character.is_falling = true;
        }

        if character.is_falling {
            vertical_speed -= 980.0 * dt;
            character.transform.translation.z += vertical_speed * dt;
            if character.transform.translation.z <= 0.0 {
                character.transform.translation.z = 0.0;
                character.is_falling = false;
                character.velocity = Vec3::ZERO;
                vertical_speed = 0.0;
            } else {
                character.velocity.z = vertical_speed;
            }
        }
        let horizontal = Vec3::new(character.velocity.x, character.velocity.y, 0.0);
        character.transform.translation += horizontal * dt;

        let mut ctx = RigContext {
            hierarchy: &mut set,
            world: &world,
            character: &character,
            stick_curve: &stick,
            offset_curve: &offset,
            effects: Some(&effects),
        };
        rig.tick(dt, &mut ctx);

        if frame % 30 == 0 {
            let feet: Vec<String> = rig
                .legs()
                .iter()
                .map(|leg| format!("{:.1}", leg.target_global.z))
                .collect();
            log::info!(
                "[Demo] 帧 {:3}: 位置 {:?}, 脊柱高 {:.2}, 脚高 [{}]",
                frame,
                character.position(),
                rig.spine_position().z,
                feet.join(", ")
            );
        }

        while let Ok(impact) = impacts.try_recv() {
            log::info!(
                "[Demo] 落地冲击: {:.1} (粒子缩放 {:.1}) @ {:?}",
                impact.magnitude,
                impact.effect_scale(),
                impact.position
            );
        }
    }

    // 单链演示
    let mut chain = BoneSet::new();
    let mut parent = None;
    for i in 0..5 {
        let local = BoneTransform::from_translation(Vec3::Z * (i as f32 * 8.0));
        parent = Some(chain.add_bone(&format!("link_{}", i), parent, local));
    }
    let mut demo = DemoLegRig::new();
    if demo.initialize(&chain) {
        for frame in 0..120u32 {
            demo.tick(&mut chain, frame as f32 * dt);
        }
        log::info!("[Demo] 单链末端: {:?}", chain.position(chain.len() - 1));
    }
}
