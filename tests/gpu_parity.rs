//! Needs a GPU adapter: `cargo test -- --ignored`.

use glam::Vec2;
use splat_fluid::stats::max_abs_difference;
use splat_fluid::{Config, Effect, FieldId, Rgb};

fn config() -> Config {
    Config {
        sim_resolution: 64,
        dye_resolution: 128,
        ..Config::default()
    }
}

#[test]
#[ignore]
fn gpu_matches_cpu_over_a_few_steps() {
    let mut cpu = Effect::new(config()).unwrap().with_seed(9);
    let mut gpu = Effect::new_gpu(config()).unwrap().with_seed(9);

    let splats = [
        (Vec2::new(0.3, 0.5), Vec2::new(300.0, 40.0)),
        (Vec2::new(0.7, 0.4), Vec2::new(-200.0, 0.0)),
    ];
    for (position, velocity) in splats {
        let color = Rgb::new(0.8, 0.1, 0.3);
        cpu.add_splat(color, position, velocity).unwrap();
        gpu.add_splat(color, position, velocity).unwrap();
    }
    cpu.multiple_splats(2).unwrap();
    gpu.multiple_splats(2).unwrap();

    for _ in 0..5 {
        cpu.update(1.0 / 60.0).unwrap();
        gpu.update(1.0 / 60.0).unwrap();
    }

    for field in [FieldId::Velocity, FieldId::Dye, FieldId::Pressure] {
        let a = cpu.read_field(field).unwrap();
        let b = gpu.read_field(field).unwrap();
        let diff = max_abs_difference(&a, &b).unwrap();
        assert!(diff < 1e-2, "{}: {diff}", field.label());
    }
}

#[test]
#[ignore]
fn gpu_readback_round_trips_loaded_field() {
    use glam::Vec4;
    use splat_fluid::{Backend, GridField};

    let mut gpu = Effect::new_gpu(config()).unwrap();
    let res = gpu.backend().sim_resolution();
    let mut field = GridField::new(res, splat_fluid::Filter::Nearest).unwrap();
    for y in 0..res.height {
        for x in 0..res.width {
            field.set(x, y, Vec4::new(x as f32, y as f32, 0.5, 1.0));
        }
    }
    gpu.backend_mut().load_field(FieldId::Pressure, &field).unwrap();
    assert_eq!(gpu.read_field(FieldId::Pressure).unwrap(), field);
}

#[test]
#[ignore]
fn gpu_texture_is_the_committed_dye_field() {
    let gpu = Effect::new_gpu(config()).unwrap();
    let dye = gpu.texture();
    assert_eq!(dye.resolution(), splat_fluid::Resolution::new(128, 64));
    assert_eq!(dye.buffer().size(), 128 * 64 * 16);
}
