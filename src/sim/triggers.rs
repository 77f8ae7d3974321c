//! Tile triggers and condition watches
//!
//! Triggers fire when an actor steps on their tile; watches are polled once a
//! tick and run their actions when every condition holds. Doors are built
//! entirely from these two pieces.

use std::collections::BTreeMap;

use glam::IVec2;

use super::actors::ActorFlags;
use super::map::{TileFlags, TilePic};
use super::state::SimulationState;
use crate::audio::SoundId;

/// Handle of a watch; watches live for the whole mission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// No entity resident in the tile
    TileClear(IVec2),
    /// Counts down on every check; holds once it reaches zero
    TimedDelay(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Play a sound at a pixel position
    Sound { pos: IVec2, sound: SoundId },
    SetTrigger(IVec2),
    ClearTrigger(IVec2),
    ChangeTile { tile: IVec2, pic: TilePic, flags: TileFlags },
    /// Restart a watch's timed delay and activate it
    SetTimedWatch { watch: WatchId, delay: i32 },
    ActivateWatch(WatchId),
    DeactivateWatch(WatchId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// Flags the toucher needs, any one of them; empty lets anyone through
    pub flags: ActorFlags,
    pub actions: Vec<Action>,
}

impl Trigger {
    pub fn accepts(&self, flags: ActorFlags) -> bool {
        self.flags.is_empty() || self.flags.intersects(flags)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watch {
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
}

/// Every trigger and watch of a mission
#[derive(Debug, Clone, Default)]
pub struct TriggerSet {
    /// Keyed by (row, column) so lookups walk tiles in scan order
    triggers: BTreeMap<(i32, i32), Vec<Trigger>>,
    watches: Vec<Watch>,
    /// Most recently activated first
    active: Vec<WatchId>,
}

impl TriggerSet {
    pub fn add_trigger(&mut self, tile: IVec2, flags: ActorFlags, actions: Vec<Action>) {
        self.triggers
            .entry((tile.y, tile.x))
            .or_default()
            .push(Trigger { flags, actions });
    }

    /// Register an inactive watch
    pub fn add_watch(&mut self, conditions: Vec<Condition>, actions: Vec<Action>) -> WatchId {
        self.watches.push(Watch { conditions, actions });
        WatchId(self.watches.len() - 1)
    }

    pub fn triggers_at(&self, tile: IVec2) -> &[Trigger] {
        self.triggers.get(&(tile.y, tile.x)).map_or(&[], Vec::as_slice)
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.values().map(Vec::len).sum()
    }

    pub fn watch(&self, id: WatchId) -> Option<&Watch> {
        self.watches.get(id.0)
    }

    pub fn watch_mut(&mut self, id: WatchId) -> Option<&mut Watch> {
        self.watches.get_mut(id.0)
    }

    pub fn is_active(&self, id: WatchId) -> bool {
        self.active.contains(&id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    fn activate(&mut self, id: WatchId) {
        if id.0 < self.watches.len() && !self.is_active(id) {
            self.active.insert(0, id);
        }
    }

    fn deactivate(&mut self, id: WatchId) {
        self.active.retain(|w| *w != id);
    }
}

fn run_actions(state: &mut SimulationState, actions: &[Action]) {
    for action in actions {
        match *action {
            Action::Sound { pos, sound } => state.play_sound(pos, sound),
            Action::SetTrigger(t) => {
                if let Some(tile) = state.map.tile_mut(t) {
                    tile.flags |= TileFlags::TRIGGER;
                }
            }
            Action::ClearTrigger(t) => {
                if let Some(tile) = state.map.tile_mut(t) {
                    tile.flags -= TileFlags::TRIGGER;
                }
            }
            Action::ChangeTile { tile, pic, flags } => state.map.set_tile(tile, pic, flags),
            Action::SetTimedWatch { watch, delay } => {
                if let Some(w) = state.triggers.watches.get_mut(watch.0) {
                    if let Some(c) = w
                        .conditions
                        .iter_mut()
                        .find(|c| matches!(c, Condition::TimedDelay(_)))
                    {
                        *c = Condition::TimedDelay(delay);
                    }
                    state.triggers.activate(watch);
                }
            }
            Action::ActivateWatch(w) => state.triggers.activate(w),
            Action::DeactivateWatch(w) => state.triggers.deactivate(w),
        }
    }
}

/// Run every trigger at `tile` that accepts `flags`
pub fn trigger_at(state: &mut SimulationState, tile: IVec2, flags: ActorFlags) {
    let fired: Vec<Vec<Action>> = state
        .triggers
        .triggers_at(tile)
        .iter()
        .filter(|t| t.accepts(flags))
        .map(|t| t.actions.clone())
        .collect();
    for actions in fired {
        run_actions(state, &actions);
    }
}

/// Check a watch's conditions, ticking its timers. All conditions are
/// evaluated in order and the first failing one stops the check.
fn conditions_met(state: &mut SimulationState, id: WatchId) -> bool {
    let Some(watch) = state.triggers.watches.get_mut(id.0) else {
        return false;
    };
    for condition in watch.conditions.iter_mut() {
        match condition {
            Condition::TimedDelay(ticks) => {
                *ticks -= 1;
                if *ticks > 0 {
                    return false;
                }
            }
            Condition::TileClear(t) => {
                if state.map.has_things(*t) {
                    return false;
                }
            }
        }
    }
    true
}

/// Poll every active watch once
pub fn update_watches(state: &mut SimulationState) {
    for id in state.triggers.active.clone() {
        if !state.triggers.is_active(id) {
            continue;
        }
        if conditions_met(state, id) {
            let actions = match state.triggers.watch(id) {
                Some(w) => w.actions.clone(),
                None => continue,
            };
            run_actions(state, &actions);
        }
    }
}
