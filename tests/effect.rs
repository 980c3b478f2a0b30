use glam::{Vec2, Vec4};
use splat_fluid::{Backend, Config, Effect, FieldId, GridField, Rgb};

fn config() -> Config {
    Config {
        sim_resolution: 64,
        dye_resolution: 64,
        ..Config::default()
    }
}

fn effect(config: Config) -> Effect {
    Effect::new(config).unwrap().with_seed(42)
}

fn argmax_speed(velocity: &GridField) -> (u32, u32, f32) {
    let mut best = (0, 0, 0.0f32);
    for y in 0..velocity.height() {
        for x in 0..velocity.width() {
            let speed = velocity.get(x, y).truncate().truncate().length();
            if speed > best.2 {
                best = (x, y, speed);
            }
        }
    }
    best
}

#[test]
fn splat_writes_gaussian_into_dye() {
    let mut effect = effect(config());
    effect
        .add_splat(Rgb::new(1.0, 0.0, 0.0), Vec2::splat(0.5), Vec2::new(100.0, 0.0))
        .unwrap();

    let dye = effect.read_field(FieldId::Dye).unwrap();
    let radius = effect.config().splat_radius_uv();
    let aspect = effect.aspect_ratio();
    for y in 0..dye.height() {
        for x in 0..dye.width() {
            let uv = dye.texel_center(x, y);
            let mut p = uv - Vec2::splat(0.5);
            p.x *= aspect;
            let expected = (-p.dot(p) / radius).exp();
            let texel = dye.get(x, y);
            assert!((texel.x - expected).abs() < 1e-5, "({x}, {y})");
            assert_eq!(texel.w, 1.0);
        }
    }

    let velocity = effect.read_field(FieldId::Velocity).unwrap();
    assert!(velocity.texels().iter().all(|v| v.y == 0.0));
}

#[test]
fn splat_stays_centered_after_one_update() {
    let mut effect = effect(config());
    effect
        .add_splat(Rgb::new(1.0, 0.0, 0.0), Vec2::splat(0.5), Vec2::new(100.0, 0.0))
        .unwrap();
    effect.update(1.0 / 60.0).unwrap();

    let velocity = effect.read_field(FieldId::Velocity).unwrap();
    let (x, y, peak) = argmax_speed(&velocity);
    assert!(peak > 10.0);
    assert!(x.abs_diff(32) <= 6, "peak at x = {x}");
    assert!(y.abs_diff(16) <= 3, "peak at y = {y}");

    let far = velocity.get(0, 0).truncate().truncate().length();
    assert!(far < 0.1 * peak, "{far} vs {peak}");

    let dye = effect.read_field(FieldId::Dye).unwrap();
    assert!(dye.texels().iter().all(|t| t.y == 0.0 && t.z == 0.0));
    assert!(dye.texels().iter().any(|t| t.x > 0.1));
}

#[test]
fn paused_update_leaves_fields_alone() {
    let mut effect = effect(Config {
        paused: true,
        ..config()
    });
    effect
        .add_splat(Rgb::new(0.0, 1.0, 0.0), Vec2::new(0.25, 0.5), Vec2::new(0.0, 50.0))
        .unwrap();
    let dye = effect.read_field(FieldId::Dye).unwrap();
    let velocity = effect.read_field(FieldId::Velocity).unwrap();

    effect.update(1.0 / 60.0).unwrap();
    effect.update(1.0 / 60.0).unwrap();

    assert_eq!(effect.read_field(FieldId::Dye).unwrap(), dye);
    assert_eq!(effect.read_field(FieldId::Velocity).unwrap(), velocity);
}

#[test]
fn paused_update_still_applies_queued_splats() {
    let mut effect = effect(Config {
        paused: true,
        ..config()
    });
    effect.queue_random_splats(3);
    effect.update(1.0 / 60.0).unwrap();

    let dye = effect.read_field(FieldId::Dye).unwrap();
    assert!(dye.texels().iter().any(|t| t.truncate().max_element() > 0.0));

    // One batch per update; nothing left for the next one.
    effect.update(1.0 / 60.0).unwrap();
    assert_eq!(effect.read_field(FieldId::Dye).unwrap(), dye);
}

#[test]
fn dissipation_decays_dye_without_flow() {
    let mut effect = effect(Config {
        density_dissipation: 1.0,
        curl: 0.0,
        ..config()
    });
    let mut dye = GridField::new(effect.texture().resolution(), effect.texture().filter()).unwrap();
    dye.fill(Vec4::new(1.0, 0.5, 0.25, 1.0));
    effect.backend_mut().load_field(FieldId::Dye, &dye).unwrap();

    effect.update(0.01).unwrap();

    let decay = 1.0 / (1.0 + 0.01);
    for texel in effect.texture().texels() {
        assert!((texel.x - decay).abs() < 1e-5);
        assert!((texel.y - 0.5 * decay).abs() < 1e-5);
    }
}
