//! Procedural mission map
//!
//! Generation works on a logical [`Layout`] of cells first (corridor floor,
//! squares, rooms with access tiers, walls, doors) and then rasterizes it
//! into the tile grid. Every placement step is a bounded random search that
//! degrades to fewer features instead of failing.

use glam::IVec2;

use super::collision::check_wall;
use super::map::{AccessTier, DoorAxis, FloorPic, ItemFlags, TileFlags, TilePic, WallPic};
use super::objects::{self, ObjectKind, PickupKind, PlacementFlags};
use super::state::SimulationState;
use super::triggers::{Action, Condition};
use crate::audio::SoundId;
use crate::consts::*;
use crate::mission::{ObjectiveFlags, ObjectiveKind};
use crate::{pixel_to_tile, tile_center, to_fixed};

/// Attempts per square, room and wall pass
const BUILD_ATTEMPTS: usize = 1000;
/// Attempts for an objective item with access constraints
const CONSTRAINED_ATTEMPTS: usize = 1000;
const UNCONSTRAINED_ATTEMPTS: usize = 100;
const KEYCARD_ATTEMPTS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellKind {
    /// Open corridor floor, also the "unassigned" state during generation
    #[default]
    Floor,
    Square,
    Room,
    Wall,
    Door,
    /// Outside the mission area
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cell {
    pub kind: CellKind,
    pub access: AccessTier,
    /// Reserved walking space, never used for placement
    pub leave_free: bool,
}

impl Cell {
    pub const NOTHING: Cell = Cell {
        kind: CellKind::Nothing,
        access: AccessTier::None,
        leave_free: false,
    };

    const WALL: Cell = Cell {
        kind: CellKind::Wall,
        access: AccessTier::None,
        leave_free: false,
    };

    const DOOR: Cell = Cell {
        kind: CellKind::Door,
        access: AccessTier::None,
        leave_free: false,
    };

    /// Untouched corridor floor
    pub fn is_blank(&self) -> bool {
        *self == Cell::default()
    }
}

/// Logical map the tiles were rasterized from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    cells: Vec<Cell>,
    /// Top-left tile of the mission area
    origin: IVec2,
    /// Mission area size in tiles
    size: IVec2,
    /// Highest access rank unlocked plus one; 0 before the first room
    access_count: i32,
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(MAP_WIDTH, MAP_HEIGHT)
    }
}

impl Layout {
    /// Empty layout for a mission area centered in the grid. Sizes of zero
    /// or beyond the grid use the whole grid.
    pub fn new(width: i32, height: i32) -> Self {
        let w = if width > 0 && width < MAP_WIDTH { width } else { MAP_WIDTH };
        let h = if height > 0 && height < MAP_HEIGHT { height } else { MAP_HEIGHT };
        Self {
            cells: vec![Cell::default(); (MAP_WIDTH * MAP_HEIGHT) as usize],
            origin: IVec2::new((MAP_WIDTH - w) / 2, (MAP_HEIGHT - h) / 2),
            size: IVec2::new(w, h),
            access_count: 0,
        }
    }

    pub fn origin(&self) -> IVec2 {
        self.origin
    }

    pub fn size(&self) -> IVec2 {
        self.size
    }

    pub fn tiles_total(&self) -> i32 {
        self.size.x * self.size.y
    }

    fn index(t: IVec2) -> Option<usize> {
        (t.x >= 0 && t.y >= 0 && t.x < MAP_WIDTH && t.y < MAP_HEIGHT)
            .then(|| (t.y * MAP_WIDTH + t.x) as usize)
    }

    /// Cell at a tile; off-grid reads as nothing
    pub fn get(&self, t: IVec2) -> Cell {
        Self::index(t).map_or(Cell::NOTHING, |i| self.cells[i])
    }

    pub fn set(&mut self, t: IVec2, cell: Cell) {
        if let Some(i) = Self::index(t) {
            self.cells[i] = cell;
        }
    }

    pub fn kind(&self, t: IVec2) -> CellKind {
        self.get(t).kind
    }

    fn is_wall(&self, t: IVec2) -> bool {
        self.get(t) == Cell::WALL
    }

    /// Whether any keycard door exists
    pub fn has_high_access(&self) -> bool {
        self.access_count > 1
    }

    pub fn access_count(&self) -> i32 {
        self.access_count
    }

    /// Whether a pixel lies behind a keycard door
    pub fn is_high_access(&self, px: IVec2) -> bool {
        self.get(pixel_to_tile(px)).access != AccessTier::None
    }

    /// Players start on untouched corridor floor only
    pub fn ok_for_player(&self, px: IVec2) -> bool {
        self.get(pixel_to_tile(px)).is_blank()
    }

    /// Untouched corridor tiles of the mission area, row-major
    pub fn floor_tiles(&self) -> Vec<IVec2> {
        let (lo, hi) = (self.origin, self.origin + self.size);
        (lo.y..hi.y)
            .flat_map(|y| (lo.x..hi.x).map(move |x| IVec2::new(x, y)))
            .filter(|t| self.get(*t).is_blank())
            .collect()
    }

    /// True if every cell of the inclusive rectangle is still unassigned
    fn area_clear(&self, origin: IVec2, size: IVec2) -> bool {
        if origin.x < 0
            || origin.y < 0
            || origin.x + size.x >= MAP_WIDTH
            || origin.y + size.y >= MAP_HEIGHT
        {
            return false;
        }
        (origin.y..=origin.y + size.y)
            .all(|y| (origin.x..=origin.x + size.x).all(|x| self.get(IVec2::new(x, y)).is_blank()))
    }

    /// Access tier of the first keyed neighbor, west, east, north, south
    fn door_access(&self, t: IVec2) -> AccessTier {
        [IVec2::NEG_X, IVec2::X, IVec2::NEG_Y, IVec2::Y]
            .into_iter()
            .map(|d| self.get(t + d).access)
            .find(|a| *a != AccessTier::None)
            .unwrap_or(AccessTier::None)
    }
}

/// Run `place` until `wanted` successes or `budget` attempts. Returns the
/// number of successes.
fn attempt(budget: usize, wanted: i32, mut place: impl FnMut() -> bool) -> i32 {
    let mut placed = 0;
    for _ in 0..budget {
        if placed >= wanted {
            break;
        }
        if place() {
            placed += 1;
        }
    }
    placed
}

/// First candidate `place` accepts within `budget` tries
fn try_place<T>(budget: usize, mut place: impl FnMut() -> Option<T>) -> Option<T> {
    (0..budget).find_map(|_| place())
}

/// Random tile inside the mission area
pub fn guess_coords(state: &mut SimulationState) -> IVec2 {
    let (origin, size) = (state.layout.origin, state.layout.size);
    IVec2::new(
        state.dice.below(size.x) + origin.x,
        state.dice.below(size.y) + origin.y,
    )
}

/// Random pixel inside the mission area
pub fn guess_pixel_coords(state: &mut SimulationState) -> IVec2 {
    let size = state.layout.size;
    IVec2::new(
        state.dice.below(size.x * TILE_WIDTH) + (MAP_WIDTH - size.x) * TILE_WIDTH / 2,
        state.dice.below(size.y * TILE_HEIGHT) + (MAP_HEIGHT - size.y) * TILE_HEIGHT / 2,
    )
}

/// Build the whole mission map: terrain, doors, scenery, objective items and
/// keycards
pub fn generate(state: &mut SimulationState) {
    state.layout = Layout::new(state.config.width, state.config.height);
    state.map.reset(state.layout.tiles_total());
    state.triggers = Default::default();

    setup_perimeter(&mut state.layout);

    let squares = attempt(BUILD_ATTEMPTS, state.config.square_count, || build_square(state));
    let rooms = attempt(BUILD_ATTEMPTS, state.config.room_count, || build_room(state));
    let wall_length = state.config.wall_length;
    let walls = attempt(BUILD_ATTEMPTS, state.config.wall_count, || build_wall(state, wall_length));
    log::debug!(
        "Layout: {squares}/{} squares, {rooms}/{} rooms, {walls}/{} walls, access count {}",
        state.config.square_count,
        state.config.room_count,
        state.config.wall_count,
        state.layout.access_count
    );

    fix_map(state);
    fix_doors(state);
    place_scenery(state);
    place_objective_items(state);
    place_keycards(state);
}

/// Nothing outside the mission area, a wall ring on its border
fn setup_perimeter(layout: &mut Layout) {
    let lo = layout.origin;
    let hi = IVec2::new(MAP_WIDTH - 1 - lo.x, MAP_HEIGHT - 1 - lo.y);
    for y in 0..MAP_HEIGHT {
        for x in 0..MAP_WIDTH {
            if x < lo.x || y < lo.y || x > hi.x || y > hi.y {
                layout.set(IVec2::new(x, y), Cell::NOTHING);
            }
        }
    }
    for x in lo.x..=hi.x {
        layout.set(IVec2::new(x, lo.y), Cell::WALL);
        layout.set(IVec2::new(x, hi.y), Cell::WALL);
    }
    for y in lo.y..=hi.y {
        layout.set(IVec2::new(lo.x, y), Cell::WALL);
        layout.set(IVec2::new(hi.x, y), Cell::WALL);
    }
}

fn build_square(state: &mut SimulationState) -> bool {
    let pos = guess_coords(state);
    let size = IVec2::new(state.dice.below(9) + 7, state.dice.below(9) + 7);
    if !state.layout.area_clear(pos - IVec2::ONE, size + IVec2::splat(2)) {
        return false;
    }
    let cell = Cell {
        kind: CellKind::Square,
        ..Cell::default()
    };
    for y in pos.y..=pos.y + size.y {
        for x in pos.x..=pos.x + size.x {
            state.layout.set(IVec2::new(x, y), cell);
        }
    }
    true
}

/// Tier for a new room. Higher tiers are rarer and need the tier below to
/// exist already; a failed roll falls through to the next tier down.
fn roll_room_access(layout: &mut Layout, roll: i32) -> AccessTier {
    let ac = &mut layout.access_count;
    if roll == 0 && *ac >= 4 {
        *ac = 5;
        AccessTier::Red
    } else if roll <= 2 && *ac >= 3 {
        *ac = (*ac).max(4);
        AccessTier::Blue
    } else if roll <= 5 && *ac >= 2 {
        *ac = (*ac).max(3);
        AccessTier::Green
    } else if roll <= 9 && *ac >= 1 {
        *ac = (*ac).max(2);
        AccessTier::Yellow
    } else {
        AccessTier::None
    }
}

fn build_room(state: &mut SimulationState) -> bool {
    let pos = guess_coords(state);
    let size = IVec2::new(state.dice.below(6) + 5, state.dice.below(6) + 5);
    if !state.layout.area_clear(pos - IVec2::ONE, size + IVec2::splat(2)) {
        return false;
    }
    let roll = state.dice.below(20);
    let access = roll_room_access(&mut state.layout, roll);
    let doors = state.dice.below(15) + 1;
    make_room(&mut state.layout, pos, size, doors, access);
    state.layout.access_count = state.layout.access_count.max(1);
    true
}

/// Walls on the rectangle's outline, room floor inside, and a door in the
/// middle of each side selected by `doors` (1 west, 2 east, 4 north, 8 south)
pub fn make_room(layout: &mut Layout, pos: IVec2, size: IVec2, doors: i32, access: AccessTier) {
    let far = pos + size;
    for y in pos.y..=far.y {
        layout.set(IVec2::new(pos.x, y), Cell::WALL);
        layout.set(IVec2::new(far.x, y), Cell::WALL);
    }
    let room = Cell {
        kind: CellKind::Room,
        access,
        leave_free: false,
    };
    for x in pos.x + 1..far.x {
        layout.set(IVec2::new(x, pos.y), Cell::WALL);
        layout.set(IVec2::new(x, far.y), Cell::WALL);
        for y in pos.y + 1..far.y {
            layout.set(IVec2::new(x, y), room);
        }
    }
    let mid = pos + size / 2;
    let sides = [
        (1, IVec2::new(pos.x, mid.y)),
        (2, IVec2::new(far.x, mid.y)),
        (4, IVec2::new(mid.x, pos.y)),
        (8, IVec2::new(mid.x, far.y)),
    ];
    for (bit, t) in sides {
        if doors & bit != 0 {
            layout.set(t, Cell::DOOR);
        }
    }
}

/// A wall may start on the grid border or where its 3x3 neighborhood is empty
fn valid_wall_start(layout: &Layout, t: IVec2) -> bool {
    if t.x == 0 || t.y == 0 || t.x == MAP_WIDTH - 1 || t.y == MAP_HEIGHT - 1 {
        return true;
    }
    (-1..=1).all(|dy| (-1..=1).all(|dx| layout.get(t + IVec2::new(dx, dy)).is_blank()))
}

fn build_wall(state: &mut SimulationState, length: i32) -> bool {
    let start = guess_coords(state);
    if !valid_wall_start(&state.layout, start) {
        return false;
    }
    state.layout.set(start, Cell::WALL);
    let dir = state.dice.bits(3);
    grow(state, start, dir, length);
    true
}

const GROW_DIRECTIONS: [IVec2; 4] = [IVec2::NEG_Y, IVec2::X, IVec2::Y, IVec2::NEG_X];

/// Extend a wall from `t` one tile at a time. A step is refused when it would
/// touch another wall anywhere but at the segment it grows from.
fn grow(state: &mut SimulationState, mut t: IVec2, dir: i32, mut length: i32) {
    let step = GROW_DIRECTIONS[(dir & 3) as usize];
    // Perpendicular to the growth direction
    let side = IVec2::new(step.y, step.x);
    while length > 0 {
        let next = t + step;
        let ahead = next + step;
        if !state.layout.in_grow_bounds(ahead)
            || [next + side, next - side, ahead + side, ahead, ahead - side]
                .into_iter()
                .any(|c| !state.layout.get(c).is_blank())
        {
            return;
        }
        t = next;
        state.layout.set(t, Cell::WALL);
        length -= 1;
        if length > 0 && state.dice.bits(3) == 0 {
            let branch = state.dice.below(length);
            let branch_dir = state.dice.bits(3);
            grow(state, t, branch_dir, branch);
            length -= branch;
        }
    }
}

impl Layout {
    /// Growth never looks beyond the top and left grid rows
    fn in_grow_bounds(&self, t: IVec2) -> bool {
        t.x >= 1 && t.y >= 1 && t.x < MAP_WIDTH && t.y < MAP_HEIGHT
    }
}

fn wall_pic(layout: &Layout, t: IVec2) -> WallPic {
    WallPic::for_neighbors(
        layout.is_wall(t + IVec2::NEG_X),
        layout.is_wall(t + IVec2::X),
        layout.is_wall(t + IVec2::Y),
        layout.is_wall(t + IVec2::NEG_Y),
    )
}

/// Rasterize the layout into tile pictures and flags, then sprinkle floor decor
fn fix_map(state: &mut SimulationState) {
    for x in 0..MAP_WIDTH {
        for y in 0..MAP_HEIGHT {
            let t = IVec2::new(x, y);
            let shadowed = y > 0 && state.map.flags_at(t + IVec2::NEG_Y).contains(TileFlags::NO_SEE);
            let (pic, flags) = match state.layout.kind(t) {
                CellKind::Floor | CellKind::Square => (
                    TilePic::Floor(if shadowed { FloorPic::Shadow } else { FloorPic::Normal }),
                    TileFlags::empty(),
                ),
                CellKind::Room | CellKind::Door => (TilePic::Room { shadow: shadowed }, TileFlags::empty()),
                CellKind::Wall => (
                    TilePic::Wall(wall_pic(&state.layout, t)),
                    TileFlags::NO_WALK | TileFlags::NO_SEE | TileFlags::IS_WALL,
                ),
                CellKind::Nothing => (TilePic::Nothing, TileFlags::NO_WALK | TileFlags::NO_SEE),
            };
            state.map.set_tile(t, pic, flags);
        }
    }

    let decor = [(50, FloorPic::Drainage, true), (100, FloorPic::Clutter1, false), (150, FloorPic::Clutter2, false)];
    for (count, pic, aligned) in decor {
        for _ in 0..count {
            let mut t = IVec2::new(state.dice.below(MAP_WIDTH), state.dice.below(MAP_HEIGHT));
            if aligned {
                t = IVec2::new(t.x & !1, t.y & !1);
            }
            if let Some(tile) = state.map.tile_mut(t) {
                if tile.flags.is_empty() && tile.pic == TilePic::Floor(FloorPic::Normal) {
                    tile.pic = TilePic::Floor(pic);
                }
            }
        }
    }
}

/// Turn every door cell into a closed door with triggers on both sides and a
/// watch that shuts it again
fn fix_doors(state: &mut SimulationState) {
    let mut doors = 0;
    for x in 0..MAP_WIDTH {
        for y in 0..MAP_HEIGHT {
            let t = IVec2::new(x, y);
            if state.layout.get(t) == Cell::DOOR {
                let tier = state.layout.door_access(t);
                create_door(state, t, tier);
                doors += 1;
            }
        }
    }
    log::debug!("Placed {doors} doors");
}

const DOOR_CLOSED: TileFlags = TileFlags::NO_SEE
    .union(TileFlags::NO_WALK)
    .union(TileFlags::NO_SHOOT)
    .union(TileFlags::OFFSET_PIC);

fn create_door(state: &mut SimulationState, t: IVec2, tier: AccessTier) {
    // A wall to the west means the door sits in a horizontal wall and is
    // passed north to south
    let axis = if state.layout.is_wall(t + IVec2::NEG_X) {
        DoorAxis::Vertical
    } else {
        DoorAxis::Horizontal
    };
    let (before, after) = match axis {
        DoorAxis::Vertical => (t + IVec2::NEG_Y, t + IVec2::Y),
        DoorAxis::Horizontal => (t + IVec2::NEG_X, t + IVec2::X),
    };
    let closed = TilePic::Door { axis, tier };
    let open = TilePic::DoorOpen { axis };
    let sound = Action::Sound {
        pos: IVec2::new(t.x * TILE_WIDTH, t.y * TILE_HEIGHT),
        sound: SoundId::Door,
    };

    state.map.set_tile(t, closed, DOOR_CLOSED);
    for side in [before, after] {
        if let Some(tile) = state.map.tile_mut(side) {
            tile.flags |= TileFlags::TRIGGER;
        }
    }

    let conditions = vec![
        Condition::TileClear(before),
        Condition::TileClear(t),
        Condition::TileClear(after),
    ];
    let close_door = Action::ChangeTile {
        tile: t,
        pic: closed,
        flags: DOOR_CLOSED,
    };

    let (close_after, open_actions_after, open_flags) = match axis {
        DoorAxis::Vertical => {
            // The closed door throws a shadow on the tile south of it
            let (lit, shaded) = if state.layout.get(after).is_blank() {
                (TilePic::Floor(FloorPic::Normal), TilePic::Floor(FloorPic::Shadow))
            } else {
                (TilePic::Room { shadow: true }, TilePic::Room { shadow: true })
            };
            if let Some(tile) = state.map.tile_mut(after) {
                tile.pic = shaded;
            }
            (
                Action::ChangeTile {
                    tile: after,
                    pic: shaded,
                    flags: TileFlags::TRIGGER,
                },
                Action::ChangeTile {
                    tile: after,
                    pic: lit,
                    flags: TileFlags::empty(),
                },
                TileFlags::empty(),
            )
        }
        DoorAxis::Horizontal => (
            Action::SetTrigger(after),
            Action::ClearTrigger(after),
            TileFlags::OFFSET_PIC,
        ),
    };

    let watch = state.triggers.add_watch(conditions, Vec::new());
    if let Some(w) = state.triggers.watch_mut(watch) {
        w.actions = vec![
            Action::DeactivateWatch(watch),
            Action::SetTrigger(before),
            close_door,
            close_after,
            sound,
        ];
    }

    let open_actions = vec![
        Action::ActivateWatch(watch),
        Action::ClearTrigger(before),
        Action::ChangeTile {
            tile: t,
            pic: open,
            flags: open_flags,
        },
        open_actions_after,
        sound,
    ];
    let flags = tier.keycard();
    state.triggers.add_trigger(before, flags, open_actions.clone());
    state.triggers.add_trigger(after, flags, open_actions);
}

/// Try to put an object of type `def` on tile `t`, honoring its placement
/// rules. `objective` tags the object as an objective item.
fn place_one_object(state: &mut SimulationState, t: IVec2, def: usize, objective: Option<usize>) -> bool {
    let Some(d) = state.config.map_objects.get(def) else {
        return false;
    };
    let f = d.placement;
    let layout = &state.layout;
    let map = &state.map;
    let cell = layout.get(t);
    if !map.flags_at(t).is_empty() || map.has_things(t) || cell.leave_free {
        return false;
    }
    if f.contains(PlacementFlags::ROOM_ONLY) && cell.kind != CellKind::Room {
        return false;
    }
    if f.contains(PlacementFlags::NOT_IN_ROOM) && cell.kind == CellKind::Room {
        return false;
    }
    if f.contains(PlacementFlags::ON_WALL) && layout.kind(t + IVec2::NEG_Y) != CellKind::Wall {
        return false;
    }
    let south = t + IVec2::Y;
    if f.contains(PlacementFlags::FREE_IN_FRONT)
        && !matches!(layout.kind(south), CellKind::Room | CellKind::Floor)
    {
        return false;
    }
    let blocked = |o: IVec2| map.flags_at(t + o).contains(TileFlags::NO_WALK);
    let inner = t.x > 0 && t.y > 0 && t.x < MAP_WIDTH - 1 && t.y < MAP_HEIGHT - 1;
    let cardinal = [IVec2::NEG_X, IVec2::X, IVec2::NEG_Y, IVec2::Y]
        .into_iter()
        .filter(|o| blocked(*o))
        .count();
    if f.contains(PlacementFlags::ONE_WALL) && !(inner && cardinal == 1) {
        return false;
    }
    if f.contains(PlacementFlags::ONE_WALL_PLUS) && !(inner && cardinal >= 1) {
        return false;
    }
    if f.contains(PlacementFlags::NO_WALLS) {
        let any = (-1..=1).any(|dy| (-1..=1).any(|dx| (dx, dy) != (0, 0) && blocked(IVec2::new(dx, dy))));
        if !inner || any {
            return false;
        }
    }

    if f.contains(PlacementFlags::FREE_IN_FRONT) {
        let mut reserved = layout.get(south);
        reserved.leave_free = true;
        state.layout.set(south, reserved);
    }
    let y = if f.contains(PlacementFlags::ON_WALL) {
        t.y * TILE_HEIGHT - 1
    } else {
        t.y * TILE_HEIGHT + TILE_HEIGHT / 2
    };
    let pos = IVec2::new(t.x * TILE_WIDTH + TILE_WIDTH / 2, y);
    match objects::add_scenery(state, pos, def) {
        Some(id) => {
            if let Some(obj) = state.objects.get_mut(id) {
                obj.item.objective = objective;
            }
            true
        }
        None => false,
    }
}

/// Scatter each configured object type by its density per mille of tiles
fn place_scenery(state: &mut SimulationState) {
    let total = state.layout.tiles_total();
    let (origin, size) = (state.layout.origin, state.layout.size);
    for density in state.config.items.clone() {
        let n = density.density * total / 1000;
        let mut placed = 0;
        for _ in 0..n {
            let t = origin + IVec2::new(state.dice.below(size.x), state.dice.below(size.y));
            if place_one_object(state, t, density.def, None) {
                placed += 1;
            }
        }
        log::debug!("Object type {}: {placed} of {n} placed", density.def);
    }
}

/// Access constraint of an objective: (needs keyed area, needs open area)
fn access_constraint(state: &SimulationState, index: usize) -> (bool, bool) {
    let flags = state
        .config
        .objectives
        .get(index)
        .map_or(ObjectiveFlags::empty(), |o| o.flags);
    (
        flags.contains(ObjectiveFlags::HIGH_ACCESS) && state.layout.has_high_access(),
        flags.contains(ObjectiveFlags::NO_ACCESS),
    )
}

fn access_matches(tier: AccessTier, high: bool, low: bool) -> bool {
    (!high || tier != AccessTier::None) && (!low || tier == AccessTier::None)
}

fn place_collectible(state: &mut SimulationState, index: usize) -> bool {
    let (high, low) = access_constraint(state, index);
    let budget = if high || low { CONSTRAINED_ATTEMPTS } else { UNCONSTRAINED_ATTEMPTS };
    try_place(budget, || {
        let px = guess_pixel_coords(state);
        if check_wall(&state.map, to_fixed(px), 4, 3) {
            return None;
        }
        let tier = state.layout.get(pixel_to_tile(px)).access;
        access_matches(tier, high, low).then_some(px)
    })
    .map(|px| {
        let id = objects::add_object(
            state,
            px,
            IVec2::new(3, 2),
            ObjectKind::Pickup(PickupKind::Jewel),
            ItemFlags::CAN_BE_TAKEN,
        );
        if let Some(obj) = state.objects.get_mut(id) {
            obj.item.objective = Some(index);
        }
    })
    .is_some()
}

fn place_blowup(state: &mut SimulationState, index: usize, def: usize) -> bool {
    let (high, low) = access_constraint(state, index);
    let budget = if high || low { CONSTRAINED_ATTEMPTS } else { UNCONSTRAINED_ATTEMPTS };
    try_place(budget, || {
        let t = guess_coords(state);
        let tier = state.layout.get(t).access;
        (access_matches(tier, high, low) && place_one_object(state, t, def, Some(index))).then_some(())
    })
    .is_some()
}

/// Collect and Destroy objectives get their items; requirements shrink to
/// what could actually be placed
fn place_objective_items(state: &mut SimulationState) {
    for (index, objective) in state.config.objectives.clone().into_iter().enumerate() {
        let placed = match objective.kind {
            ObjectiveKind::Collect => attempt(objective.count.max(0) as usize, objective.count, || {
                place_collectible(state, index)
            }),
            ObjectiveKind::Destroy => match objective.item {
                Some(def) => attempt(objective.count.max(0) as usize, objective.count, || {
                    place_blowup(state, index, def)
                }),
                None => 0,
            },
            _ => continue,
        };
        state.mission.clamp_to_placed(index, placed);
    }
}

fn keycard_spot_ok(state: &SimulationState, t: IVec2, room_tier: Option<AccessTier>) -> bool {
    let below = t + IVec2::Y;
    let cell = state.layout.get(t);
    t.y < MAP_HEIGHT - 1
        && state.map.flags_at(t).is_empty()
        && !state.map.has_things(t)
        && state.map.flags_at(below).is_empty()
        && !state.map.has_things(below)
        && cell.kind == CellKind::Room
        && room_tier.is_none_or(|tier| cell.access == tier)
}

/// Drop one keycard per unlocked tier, each in a room one tier below it
fn place_keycards(state: &mut SimulationState) {
    let cards = [
        (5, AccessTier::Red),
        (4, AccessTier::Blue),
        (3, AccessTier::Green),
        (2, AccessTier::Yellow),
    ];
    for (needed, card) in cards {
        if state.layout.access_count >= needed {
            let room = AccessTier::from_rank(card.rank() - 1);
            place_keycard(state, card, room);
        }
    }
}

fn place_keycard(state: &mut SimulationState, card: AccessTier, room: AccessTier) {
    let spot = try_place(KEYCARD_ATTEMPTS, || {
        let t = guess_coords(state);
        keycard_spot_ok(state, t, Some(room)).then_some(t)
    })
    .or_else(|| {
        log::warn!("No random spot for the {card:?} keycard, scanning");
        scan_mission_area(state, |s, t| keycard_spot_ok(s, t, Some(room)))
    })
    .or_else(|| {
        log::warn!("No {room:?} room for the {card:?} keycard, using any room");
        scan_mission_area(state, |s, t| keycard_spot_ok(s, t, None))
    })
    .or_else(|| scan_mission_area(state, |s, t| s.layout.get(t).is_blank() && !s.map.has_things(t)));

    match spot {
        Some(t) => {
            objects::add_object(
                state,
                tile_center(t),
                IVec2::new(9, 5),
                ObjectKind::Pickup(PickupKind::Keycard(card)),
                ItemFlags::CAN_BE_TAKEN,
            );
        }
        None => log::warn!("{card:?} keycard could not be placed"),
    }
}

fn scan_mission_area(
    state: &SimulationState,
    ok: impl Fn(&SimulationState, IVec2) -> bool,
) -> Option<IVec2> {
    let (lo, hi) = (state.layout.origin, state.layout.origin + state.layout.size);
    (lo.y..hi.y)
        .flat_map(|y| (lo.x..hi.x).map(move |x| IVec2::new(x, y)))
        .find(|t| ok(state, *t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::{MissionConfig, ObjectiveConfig};
    use crate::settings::GameOptions;
    use crate::sim::map::Tile;

    fn config(rooms: i32, walls: i32, squares: i32, size: i32) -> MissionConfig {
        MissionConfig {
            room_count: rooms,
            wall_count: walls,
            wall_length: 6,
            square_count: squares,
            ..MissionConfig::open_arena(size, size)
        }
    }

    fn generate_with(config: MissionConfig, seed: u64) -> SimulationState {
        SimulationState::new(config, GameOptions::default(), seed)
    }

    #[test]
    fn test_same_seed_same_map() {
        let a = generate_with(config(5, 10, 2, 32), 1234);
        let b = generate_with(config(5, 10, 2, 32), 1234);
        let ta: &[Tile] = a.map.tiles();
        assert_eq!(ta, b.map.tiles());
        assert_eq!(a.layout, b.layout);
        assert_eq!(a.triggers.trigger_count(), b.triggers.trigger_count());
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = generate_with(config(5, 10, 2, 32), 1);
        let b = generate_with(config(5, 10, 2, 32), 2);
        assert_ne!(a.layout, b.layout);
    }

    #[test]
    fn test_perimeter_and_outside() {
        let state = generate_with(config(0, 0, 0, 32), 7);
        let origin = state.layout.origin();
        assert_eq!(origin, IVec2::new(16, 16));
        assert_eq!(state.layout.kind(IVec2::new(3, 3)), CellKind::Nothing);
        assert_eq!(state.layout.kind(origin), CellKind::Wall);
        assert_eq!(state.layout.kind(origin + IVec2::new(31, 10)), CellKind::Wall);
        assert_eq!(state.layout.kind(origin + IVec2::new(5, 5)), CellKind::Floor);
        assert!(state.map.flags_at(IVec2::new(3, 3)).contains(TileFlags::NO_WALK));
        assert!(state.map.flags_at(origin).contains(TileFlags::IS_WALL));
    }

    #[test]
    fn test_room_access_falls_through_tiers() {
        let mut layout = Layout::default();
        // Nothing unlocked yet: every roll gives an open room
        assert_eq!(roll_room_access(&mut layout, 0), AccessTier::None);
        layout.access_count = 1;
        assert_eq!(roll_room_access(&mut layout, 0), AccessTier::Yellow);
        assert_eq!(layout.access_count, 2);
        assert_eq!(roll_room_access(&mut layout, 10), AccessTier::None);
        assert_eq!(roll_room_access(&mut layout, 4), AccessTier::Green);
        assert_eq!(roll_room_access(&mut layout, 1), AccessTier::Blue);
        assert_eq!(roll_room_access(&mut layout, 0), AccessTier::Red);
        assert_eq!(layout.access_count, 5);
    }

    #[test]
    fn test_keycards_sit_one_tier_below() {
        let mut found = 0;
        for seed in 0..6 {
            let state = generate_with(config(30, 0, 0, MAP_WIDTH), seed);
            for obj in state.objects.values() {
                if let ObjectKind::Pickup(PickupKind::Keycard(card)) = obj.kind {
                    let cell = state.layout.get(obj.item.tile());
                    assert_eq!(cell.kind, CellKind::Room);
                    assert_eq!(cell.access.rank() + 1, card.rank(), "seed {seed}");
                    found += 1;
                }
            }
            let expected = (state.layout.access_count() - 1).max(0) as usize;
            let cards = state
                .objects
                .values()
                .filter(|o| matches!(o.kind, ObjectKind::Pickup(PickupKind::Keycard(_))))
                .count();
            assert_eq!(cards, expected, "one card per unlocked tier, seed {seed}");
        }
        assert!(found > 0, "no keyed rooms in any sample");
    }

    #[test]
    fn test_doors_get_triggers_on_both_sides() {
        let state = generate_with(config(12, 0, 0, MAP_WIDTH), 99);
        let mut doors = 0;
        for (i, tile) in state.map.tiles().iter().enumerate() {
            let t = IVec2::new(i as i32 % MAP_WIDTH, i as i32 / MAP_WIDTH);
            if let TilePic::Door { axis, tier } = tile.pic {
                doors += 1;
                assert!(tile.flags.contains(TileFlags::NO_WALK));
                let (a, b) = match axis {
                    DoorAxis::Vertical => (t + IVec2::NEG_Y, t + IVec2::Y),
                    DoorAxis::Horizontal => (t + IVec2::NEG_X, t + IVec2::X),
                };
                for side in [a, b] {
                    let triggers = state.triggers.triggers_at(side);
                    assert!(!triggers.is_empty());
                    assert!(triggers.iter().any(|tr| tr.flags == tier.keycard()));
                }
            }
        }
        assert!(doors > 0);
        assert_eq!(state.triggers.trigger_count(), doors * 2);
    }

    #[test]
    fn test_rooms_are_walled() {
        let state = generate_with(config(10, 0, 0, MAP_WIDTH), 3);
        for y in 0..MAP_HEIGHT {
            for x in 0..MAP_WIDTH {
                let t = IVec2::new(x, y);
                if state.layout.kind(t) == CellKind::Room {
                    for d in [IVec2::NEG_X, IVec2::X, IVec2::NEG_Y, IVec2::Y] {
                        let n = state.layout.kind(t + d);
                        assert!(
                            matches!(n, CellKind::Room | CellKind::Wall | CellKind::Door),
                            "room tile {t} opens onto {n:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_walls_do_not_touch_sideways() {
        let state = generate_with(config(0, 20, 0, MAP_WIDTH), 11);
        // Free-standing walls never form a 2x2 block
        for y in 1..MAP_HEIGHT - 2 {
            for x in 1..MAP_WIDTH - 2 {
                let block = [(0, 0), (1, 0), (0, 1), (1, 1)]
                    .iter()
                    .all(|(dx, dy)| state.layout.kind(IVec2::new(x + dx, y + dy)) == CellKind::Wall);
                assert!(!block, "2x2 wall block at ({x},{y})");
            }
        }
    }

    #[test]
    fn test_shadow_below_walls() {
        let state = generate_with(config(0, 0, 0, 32), 5);
        let origin = state.layout.origin();
        let below_top = origin + IVec2::new(5, 1);
        let pic = state.map.tile(below_top).expect("tile").pic;
        assert!(matches!(pic, TilePic::Floor(FloorPic::Shadow)));
    }

    #[test]
    fn test_collectibles_clamp_requirement() {
        let mut config = config(0, 0, 0, 16);
        config.objectives.push(ObjectiveConfig {
            kind: ObjectiveKind::Collect,
            description: String::new(),
            required: 5,
            count: 6,
            flags: ObjectiveFlags::HIGH_ACCESS,
            item: None,
        });
        let state = generate_with(config, 8);
        let jewels = state
            .objects
            .values()
            .filter(|o| o.item.objective == Some(0))
            .count() as i32;
        // No keyed rooms: the constraint is dropped and the items still go down
        assert_eq!(jewels, state.mission.objectives[0].count);
        assert!(state.mission.objectives[0].required <= jewels);
    }

    #[test]
    fn test_player_floor_excludes_rooms() {
        let state = generate_with(config(8, 0, 0, MAP_WIDTH), 21);
        for t in state.layout.floor_tiles() {
            assert!(state.layout.ok_for_player(tile_center(t)));
            assert_eq!(state.layout.kind(t), CellKind::Floor);
        }
    }
}
