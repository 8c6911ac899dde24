use creep_defence_core::{CellCoord, Command, Event, PlacementError, TowerId, TowerKind};
use creep_defence_system_builder::{Builder, BuilderInput, PlacementPreview};
use creep_defence_world::{self as world, query, GateError, TerrainMap, World, WorldConfig};

fn laser_preview_at(cell: CellCoord, placeable: bool) -> PlacementPreview {
    let legality = if placeable {
        Ok(())
    } else {
        Err(PlacementError::BlocksPath)
    };
    PlacementPreview::new(TowerKind::Laser, cell, 200, legality)
}

fn corridor() -> World {
    let terrain = TerrainMap::from_rows(&["E...X", "....."]).expect("valid map");
    World::new(terrain, WorldConfig::default())
}

fn preview_in(world: &mut World, kind: TowerKind, cell: CellCoord) -> PlacementPreview {
    let legality = match world::check_placement(world, cell) {
        Ok(()) => Ok(()),
        Err(GateError::Rejected(error)) => Err(error),
        Err(other) => panic!("unexpected gate failure: {other}"),
    };
    PlacementPreview::new(kind, cell, query::gold(world), legality)
}

#[test]
fn confirm_emits_place_command() {
    let mut builder = Builder::default();
    let mut commands = Vec::new();

    builder.handle(
        &[],
        Some(laser_preview_at(CellCoord::new(2, 1), true)),
        BuilderInput {
            confirm_action: true,
            ..BuilderInput::default()
        },
        |_| None,
        &mut commands,
    );

    assert_eq!(
        commands,
        vec![Command::PlaceTower {
            kind: TowerKind::Laser,
            cell: CellCoord::new(2, 1),
        }],
        "builder should emit a placement command when confirming a valid preview",
    );
}

#[test]
fn confirm_ignored_when_preview_not_placeable() {
    let mut builder = Builder::default();
    let mut commands = Vec::new();

    builder.handle(
        &[],
        Some(laser_preview_at(CellCoord::new(2, 1), false)),
        BuilderInput {
            confirm_action: true,
            ..BuilderInput::default()
        },
        |_| None,
        &mut commands,
    );

    assert!(
        commands.is_empty(),
        "invalid preview must not emit commands"
    );
}

#[test]
fn sell_targets_the_hovered_tower() {
    let mut builder = Builder::default();
    let mut commands = Vec::new();
    let hovered_cell = CellCoord::new(2, 1);
    let mut looked_up = None;

    builder.handle(
        &[],
        None,
        BuilderInput {
            sell_action: true,
            cursor_cell: Some(hovered_cell),
            ..BuilderInput::default()
        },
        |cell| {
            looked_up = Some(cell);
            Some(TowerId::new(7))
        },
        &mut commands,
    );

    assert_eq!(looked_up, Some(hovered_cell));
    assert_eq!(
        commands,
        vec![Command::SellTower {
            tower: TowerId::new(7),
        }]
    );
}

#[test]
fn upgrade_precedes_sale_of_the_same_tower() {
    let mut builder = Builder::default();
    let mut commands = Vec::new();

    builder.handle(
        &[],
        None,
        BuilderInput {
            upgrade_action: true,
            sell_action: true,
            cursor_cell: Some(CellCoord::new(1, 1)),
            ..BuilderInput::default()
        },
        |_| Some(TowerId::new(4)),
        &mut commands,
    );

    assert_eq!(
        commands,
        vec![
            Command::UpgradeTower {
                tower: TowerId::new(4),
            },
            Command::SellTower {
                tower: TowerId::new(4),
            },
        ]
    );
}

#[test]
fn upgrade_without_a_hovered_tower_does_nothing() {
    let mut builder = Builder::default();
    let mut commands = Vec::new();

    builder.handle(
        &[],
        None,
        BuilderInput {
            upgrade_action: true,
            cursor_cell: Some(CellCoord::new(0, 1)),
            ..BuilderInput::default()
        },
        |_| None,
        &mut commands,
    );

    assert!(commands.is_empty());
}

#[test]
fn abilities_forward_to_world_commands() {
    let mut builder = Builder::default();
    let mut commands = Vec::new();

    builder.handle(
        &[],
        None,
        BuilderInput {
            nuke_action: true,
            call_wave_action: true,
            ..BuilderInput::default()
        },
        |_| None,
        &mut commands,
    );

    assert_eq!(commands, vec![Command::Nuke, Command::CallWaveEarly]);
}

#[test]
fn lost_sessions_ignore_input() {
    let mut builder = Builder::default();
    let mut commands = Vec::new();

    builder.handle(
        &[Event::GameLost],
        Some(laser_preview_at(CellCoord::new(2, 1), true)),
        BuilderInput {
            confirm_action: true,
            nuke_action: true,
            ..BuilderInput::default()
        },
        |_| Some(TowerId::new(3)),
        &mut commands,
    );

    assert!(commands.is_empty());
}

#[test]
fn previews_from_the_world_drive_placement() {
    let mut world = corridor();
    let mut builder = Builder::default();
    let confirm = BuilderInput {
        confirm_action: true,
        ..BuilderInput::default()
    };

    let mut events = Vec::new();
    for cell in [CellCoord::new(2, 0), CellCoord::new(2, 1)] {
        let preview = preview_in(&mut world, TowerKind::Laser, cell);
        let mut commands = Vec::new();
        builder.handle(&events, Some(preview), confirm, |_| None, &mut commands);
        events.clear();
        for command in commands {
            world::apply(&mut world, command, &mut events);
        }
    }

    assert!(query::tower_at(&world, CellCoord::new(2, 0)).is_some());
    let blocked = preview_in(&mut world, TowerKind::Laser, CellCoord::new(2, 1));
    assert_eq!(blocked.rejection, Some(PlacementError::BlocksPath));
    assert!(query::tower_at(&world, CellCoord::new(2, 1)).is_none());
    assert_eq!(query::gold(&world), 200 - 25);
}
