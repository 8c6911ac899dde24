use creep_defence_core::{CellCoord, Command, CreepStats, Event, TowerKind};
use creep_defence_world::{self as world, query, TerrainMap, World, WorldConfig};
use proptest::prelude::*;

const COLUMNS: u32 = 8;
const ROWS: u32 = 6;

fn rich_world(seed: u64) -> World {
    let terrain = TerrainMap::generate(COLUMNS, ROWS, seed).expect("valid dimensions");
    World::new(
        terrain,
        WorldConfig {
            starting_gold: 10_000,
            ..WorldConfig::default()
        },
    )
}

fn walker_at(world: &mut World, cell: CellCoord) {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::SpawnCreep {
            stats: CreepStats::for_wave(1),
        },
        &mut events,
    );
    let creep = match events.as_slice() {
        [Event::CreepSpawned { creep, .. }] => *creep,
        other => panic!("unexpected spawn events: {other:?}"),
    };
    let position = query::geometry(world).center_of(cell);
    world::apply(world, Command::MoveCreep { creep, position }, &mut events);
}

fn reaches_exit(world: &mut World, start: CellCoord) -> bool {
    let exit = query::exit(world);
    let mut cell = start;
    for _ in 0..=query::geometry(world).cell_count() {
        if cell == exit {
            return true;
        }
        match world::next_hop(world, cell) {
            Ok(hop) => {
                assert!(cell.is_adjacent(hop), "{cell:?} -> {hop:?} is not a single step");
                assert!(query::is_walkable(world, hop), "route steps onto a tower");
                cell = hop;
            }
            Err(_) => return false,
        }
    }
    false
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn approved_placements_keep_every_route_open(
        seed in any::<u64>(),
        walker in (0_u32..COLUMNS, 0_u32..ROWS),
        attempts in prop::collection::vec((0_u32..COLUMNS, 0_u32..ROWS), 1..48),
    ) {
        let mut world = rich_world(seed);
        let walker = CellCoord::new(walker.0, walker.1);
        walker_at(&mut world, walker);
        let entrance = query::entrance(&world);

        for (column, row) in attempts {
            let cell = CellCoord::new(column, row);
            if cell == walker {
                continue;
            }

            let epoch = query::path_epoch(&world);
            let mut events = Vec::new();
            world::apply(
                &mut world,
                Command::PlaceTower { kind: TowerKind::Laser, cell },
                &mut events,
            );

            let placed = events
                .iter()
                .any(|event| matches!(event, Event::TowerPlaced { .. }));
            if placed {
                prop_assert!(query::path_epoch(&world) > epoch);
                prop_assert_eq!(query::memo_len(&world), 0);
            }
            prop_assert!(query::considering(&world).is_none());
            prop_assert!(reaches_exit(&mut world, entrance));
            prop_assert!(reaches_exit(&mut world, walker));
        }
    }
}

#[test]
fn preview_agrees_with_placement() {
    let terrain = TerrainMap::from_rows(&["E....", ".....", "....X"]).expect("valid map");
    let mut world = World::new(terrain, WorldConfig::default());
    let wall = [CellCoord::new(2, 0), CellCoord::new(2, 1)];
    for cell in wall {
        assert!(world::check_placement(&mut world, cell).is_ok());
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::PlaceTower {
                kind: TowerKind::Laser,
                cell,
            },
            &mut events,
        );
        assert!(query::tower_at(&world, cell).is_some());
    }

    let last_gap = CellCoord::new(2, 2);
    assert!(world::check_placement(&mut world, last_gap).is_err());
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::PlaceTower {
            kind: TowerKind::Laser,
            cell: last_gap,
        },
        &mut events,
    );
    assert!(matches!(
        events.as_slice(),
        [Event::TowerPlacementRejected { .. }]
    ));
    assert_eq!(query::gold(&world), 200 - 2 * TowerKind::Laser.cost());
}
