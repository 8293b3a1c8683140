use lifeworld_codec::{CodecError, compact, pattern};
use lifeworld_core::{RuleSet, World};

fn seeded_world() -> World {
    let mut world = World::new(8, 8, RuleSet::default()).expect("world");
    // Glider plus a far corner cell so the bounding rectangle is interesting.
    for &(x, y) in &[(1, 0), (2, 1), (0, 2), (1, 2), (2, 2), (7, 7)] {
        world.set(x, y, true).expect("seed");
    }
    world
}

#[test]
fn compact_round_trip_survives_ticking() {
    let mut world = seeded_world();
    world.tick();
    world.tick();

    let encoded = compact::encode(world.grid());
    let decoded = compact::decode(&encoded).expect("decode");
    assert_eq!(&decoded, world.grid());
}

#[test]
fn compact_decode_installs_into_a_world() {
    let source = seeded_world();
    let encoded = compact::encode(source.grid());

    let mut target = World::new(4, 4, RuleSet::new(&[1], &[]).expect("rules"))
        .expect("target");
    let decoded = compact::decode(&encoded).expect("decode");
    target.install(decoded, *source.rules());

    assert_eq!(target.width(), 8);
    assert_eq!(target.grid(), source.grid());
    assert_eq!(target.generation(), 0);
}

#[test]
fn pattern_round_trip_preserves_world_and_rules() {
    let source = seeded_world();
    let encoded = pattern::encode(source.grid(), source.rules(), false);

    let (grid, rules) = pattern::decode(&encoded, 1, 1).expect("decode");
    assert_eq!(&grid, source.grid());
    assert_eq!(&rules, source.rules());
}

#[test]
fn failed_pattern_decode_leaves_the_world_untouched() {
    let mut world = seeded_world();
    let before = world.grid().clone();

    let oversized = "#WW 64\nx = 65, y = 1, rule = B3/S23\n!";
    let result = pattern::decode(oversized, world.width(), world.height());
    assert!(matches!(result, Err(CodecError::PatternTooLarge { .. })));

    // Nothing decoded, so nothing was installed; the world is unchanged.
    assert_eq!(world.grid(), &before);
    world.tick();
    assert_eq!(world.generation(), 1);
}

#[test]
fn compact_and_pattern_agree_on_cell_content() {
    let source = seeded_world();

    let via_compact = compact::decode(&compact::encode(source.grid())).expect("compact");
    let (via_pattern, _) =
        pattern::decode(&pattern::encode(source.grid(), source.rules(), false), 1, 1)
            .expect("pattern");
    assert_eq!(via_compact, via_pattern);
}
