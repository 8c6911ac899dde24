#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure player-input system responsible for emitting construction and ability commands.

use creep_defence_core::{
    CellCoord, Command, Event, GameOutcome, PlacementError, TowerId, TowerKind,
};

/// Declarative placement preview describing a potential tower construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacementPreview {
    /// Kind of tower proposed for placement.
    pub kind: TowerKind,
    /// Cell the tower would occupy.
    pub cell: CellCoord,
    /// Reason the world would refuse the placement, if any.
    pub rejection: Option<PlacementError>,
}

impl PlacementPreview {
    /// Creates a preview from the player's purse and the world's legality answer.
    ///
    /// Affordability is reported ahead of path legality, mirroring the order
    /// in which the world validates a placement request.
    #[must_use]
    pub fn new(
        kind: TowerKind,
        cell: CellCoord,
        gold: u32,
        legality: Result<(), PlacementError>,
    ) -> Self {
        let rejection = if gold < kind.cost() {
            Some(PlacementError::InsufficientGold)
        } else {
            legality.err()
        };

        Self {
            kind,
            cell,
            rejection,
        }
    }

    /// Reports whether the world would accept the placement.
    #[must_use]
    pub const fn is_placeable(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Input snapshot distilled from adapter-provided frame input data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuilderInput {
    /// Indicates whether the player confirmed a placement on this frame.
    pub confirm_action: bool,
    /// Indicates whether the player requested a tower upgrade on this frame.
    pub upgrade_action: bool,
    /// Indicates whether the player requested a tower sale on this frame.
    pub sell_action: bool,
    /// Indicates whether the player triggered a nuke on this frame.
    pub nuke_action: bool,
    /// Indicates whether the player asked for the next wave early.
    pub call_wave_action: bool,
    /// Cell currently hovered by the cursor.
    pub cursor_cell: Option<CellCoord>,
}

/// Player-input system that translates preview + input into world commands.
#[derive(Debug, Clone)]
pub struct Builder {
    outcome: GameOutcome,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Creates a new builder system instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            outcome: GameOutcome::InProgress,
        }
    }

    /// Session state observed through the event stream.
    #[must_use]
    pub const fn outcome(&self) -> GameOutcome {
        self.outcome
    }

    /// Consumes world events and adapter-derived input to emit commands.
    ///
    /// The `tower_at` closure should mirror the semantics of the world's
    /// `query::tower_at` helper so the system can identify the hovered tower.
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        preview: Option<PlacementPreview>,
        input: BuilderInput,
        mut tower_at: F,
        out: &mut Vec<Command>,
    ) where
        F: FnMut(CellCoord) -> Option<TowerId>,
    {
        for event in events {
            match event {
                Event::NewGameStarted { .. } => self.outcome = GameOutcome::InProgress,
                Event::GameLost => self.outcome = GameOutcome::Lost,
                Event::SessionAborted { .. } => self.outcome = GameOutcome::Aborted,
                _ => {}
            }
        }

        if !self.outcome.is_in_progress() {
            return;
        }

        if input.confirm_action {
            if let Some(preview) = preview.filter(PlacementPreview::is_placeable) {
                out.push(Command::PlaceTower {
                    kind: preview.kind,
                    cell: preview.cell,
                });
            }
        }

        if input.upgrade_action {
            if let Some(tower) = input.cursor_cell.and_then(&mut tower_at) {
                out.push(Command::UpgradeTower { tower });
            }
        }

        if input.sell_action {
            if let Some(tower) = input.cursor_cell.and_then(&mut tower_at) {
                out.push(Command::SellTower { tower });
            }
        }

        if input.nuke_action {
            out.push(Command::Nuke);
        }

        if input.call_wave_action {
            out.push(Command::CallWaveEarly);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_reports_poverty_before_path_legality() {
        let preview = PlacementPreview::new(
            TowerKind::Missile,
            CellCoord::new(1, 1),
            99,
            Err(PlacementError::BlocksPath),
        );
        assert_eq!(preview.rejection, Some(PlacementError::InsufficientGold));
        assert!(!preview.is_placeable());
    }

    #[test]
    fn preview_carries_legality_rejection() {
        let preview = PlacementPreview::new(
            TowerKind::Laser,
            CellCoord::new(1, 1),
            25,
            Err(PlacementError::Reserved),
        );
        assert_eq!(preview.rejection, Some(PlacementError::Reserved));

        let preview = PlacementPreview::new(TowerKind::Laser, CellCoord::new(1, 1), 25, Ok(()));
        assert!(preview.is_placeable());
    }

    #[test]
    fn outcome_follows_session_events() {
        let mut builder = Builder::new();
        let mut out = Vec::new();
        builder.handle(
            &[Event::GameLost],
            None,
            BuilderInput::default(),
            |_| None,
            &mut out,
        );
        assert_eq!(builder.outcome(), GameOutcome::Lost);

        builder.handle(
            &[Event::NewGameStarted {
                entrance: CellCoord::new(0, 0),
                exit: CellCoord::new(4, 0),
            }],
            None,
            BuilderInput::default(),
            |_| None,
            &mut out,
        );
        assert_eq!(builder.outcome(), GameOutcome::InProgress);
        assert!(out.is_empty());
    }
}
