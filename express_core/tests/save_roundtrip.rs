use express_core::{Car, CharacterId, Facing, SaveError, SaveImage, SaveKind, World};

#[test]
fn timers_survive_a_round_trip_in_insertion_order() -> Result<(), SaveError> {
    let mut world = World::default();
    world.setup_chapter(1);
    world.timers.add(1000, 7);
    world.timers.add(5000, 3);

    let header = world.header_for(SaveKind::Index, CharacterId::CATH, 0);
    let mut bytes = Vec::new();
    world.save_to(header, &mut bytes)?;

    let mut loaded = World::default();
    loaded.load_from(bytes.as_slice())?;
    let timers: Vec<_> = loaded
        .timers
        .iter()
        .map(|event| (event.deadline, event.subroutine))
        .collect();
    assert_eq!(timers, vec![(1000, 7), (5000, 3)]);
    Ok(())
}

#[test]
fn loading_replaces_chapter_and_viewpoint() -> Result<(), SaveError> {
    let mut world = World::default();
    world.setup_chapter(1);
    world.set_viewpoint(Car::Restaurant, 61, Facing::Up);
    for _ in 0..5 {
        world.tick();
    }
    let header = world.header_for(SaveKind::Auto, CharacterId::CATH, 0);
    let bytes = world.capture(header).to_bytes()?;

    let mut loaded = World::default();
    loaded.setup_chapter(3);
    let restored = loaded.load_from(bytes.as_slice())?;

    assert_eq!(restored.chapter, 1);
    assert_eq!(loaded.clock.chapter, 1);
    assert_eq!(loaded.clock.game_time, world.clock.game_time);
    assert_eq!(loaded.viewpoint(), world.viewpoint());
    assert_eq!(loaded.record(CharacterId::CATH).car, Car::Restaurant);
    for (left, right) in world.records().iter().zip(loaded.records()) {
        assert!(left.persisted_eq(right), "{} differs after loading", left.id);
    }
    Ok(())
}

#[test]
fn truncated_images_are_rejected() {
    let mut world = World::default();
    world.setup_chapter(1);
    let bytes = world
        .capture(world.header_for(SaveKind::Time, CharacterId::CATH, 0))
        .to_bytes()
        .expect("in-memory image");

    for cut in [3, 20, bytes.len() - 1] {
        let result = SaveImage::read_from(&bytes[..cut]);
        assert!(
            matches!(result, Err(SaveError::Truncated)),
            "cut at {cut} gave {result:?}"
        );
    }
}
