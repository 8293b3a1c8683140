//! World state and tick pipeline for the LifeWorld cellular automaton.
//!
//! A [`World`] owns a toroidal [`CellGrid`], a birth/survival [`RuleSet`],
//! and a [`ChangeNotifier`] that fans mutation events out to registered
//! observers. All operations are synchronous and CPU-bound; hosts that need
//! repeated ticking or rendering drive the world from outside.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Number of distinct Moore-neighborhood counts (0 through 8 inclusive).
pub const NEIGHBOR_COUNTS: usize = 9;

/// Errors raised by bounds-checked grid access and construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    /// Coordinate lies outside the grid.
    #[error("cell ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds { x: u32, y: u32, width: u32, height: u32 },
    /// Grids must have at least one cell on each axis.
    #[error("grid dimensions must be non-zero")]
    ZeroDimension,
}

/// Errors raised when constructing rule sets.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    /// A neighbor count outside the representable 0..=8 range.
    #[error("neighbor count {count} is outside the 0..=8 rule range")]
    InvalidRule { count: u32 },
}

/// Errors raised by the change notifier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    /// Unsubscribe was called with a token that is not registered.
    #[error("no listener registered for token {0}")]
    UnknownListener(ListenerId),
}

/// Failure reported by an observer during notification.
///
/// Observer failures are isolated: the notifier logs them and keeps
/// delivering to the remaining observers.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ObserverError(pub String);

impl ObserverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Birth/survival predicates over Moore neighbor counts.
///
/// Membership is stored in fixed nine-slot arrays rather than a general set
/// so lookups are O(1) and rendering order is unambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    born: [bool; NEIGHBOR_COUNTS],
    survive: [bool; NEIGHBOR_COUNTS],
}

impl Default for RuleSet {
    /// Standard Life: B3/S23.
    fn default() -> Self {
        let mut born = [false; NEIGHBOR_COUNTS];
        let mut survive = [false; NEIGHBOR_COUNTS];
        born[3] = true;
        survive[2] = true;
        survive[3] = true;
        Self { born, survive }
    }
}

impl RuleSet {
    /// Build a rule set from explicit neighbor-count lists.
    ///
    /// Duplicates collapse; any count above 8 is rejected.
    pub fn new(born: &[u8], survive: &[u8]) -> Result<Self, RuleError> {
        let mut rules = Self {
            born: [false; NEIGHBOR_COUNTS],
            survive: [false; NEIGHBOR_COUNTS],
        };
        for &count in born {
            if count as usize >= NEIGHBOR_COUNTS {
                return Err(RuleError::InvalidRule { count: count.into() });
            }
            rules.born[count as usize] = true;
        }
        for &count in survive {
            if count as usize >= NEIGHBOR_COUNTS {
                return Err(RuleError::InvalidRule { count: count.into() });
            }
            rules.survive[count as usize] = true;
        }
        Ok(rules)
    }

    /// Whether a dead cell with `neighbors` live neighbors becomes alive.
    #[must_use]
    pub const fn is_born(&self, neighbors: usize) -> bool {
        neighbors < NEIGHBOR_COUNTS && self.born[neighbors]
    }

    /// Whether a live cell with `neighbors` live neighbors stays alive.
    #[must_use]
    pub const fn is_survive(&self, neighbors: usize) -> bool {
        neighbors < NEIGHBOR_COUNTS && self.survive[neighbors]
    }
}

impl fmt::Display for RuleSet {
    /// Renders the conventional `B{digits}/S{digits}` rule string, digits
    /// ascending.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("B")?;
        for (count, &member) in self.born.iter().enumerate() {
            if member {
                write!(f, "{count}")?;
            }
        }
        f.write_str("/S")?;
        for (count, &member) in self.survive.iter().enumerate() {
            if member {
                write!(f, "{count}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for RuleSet {
    type Err = RuleError;

    /// Parses rule strings such as `B3/S23`.
    ///
    /// Segment prefixes are case-insensitive; non-digit characters inside a
    /// segment body are skipped and segments with unknown prefixes are
    /// ignored, so rule strings found in pattern files in the wild parse
    /// leniently. A digit above 8 is still rejected.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut born = Vec::new();
        let mut survive = Vec::new();
        for segment in text.split('/') {
            let segment = segment.trim();
            let mut chars = segment.chars();
            let target = match chars.next().map(|c| c.to_ascii_lowercase()) {
                Some('b') => &mut born,
                Some('s') => &mut survive,
                _ => continue,
            };
            for ch in chars {
                if let Some(digit) = ch.to_digit(10) {
                    if digit as usize >= NEIGHBOR_COUNTS {
                        return Err(RuleError::InvalidRule { count: digit });
                    }
                    target.push(digit as u8);
                }
            }
        }
        Self::new(&born, &survive)
    }
}

/// Inclusive axis-aligned rectangle of grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Fixed-size 2D field of binary cell states, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellGrid {
    width: u32,
    height: u32,
    cells: Vec<u8>,
}

impl CellGrid {
    /// Construct an all-dead grid with `width * height` cells.
    pub fn new(width: u32, height: u32) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::ZeroDimension);
        }
        Ok(Self {
            width,
            height,
            cells: vec![0; (width as usize) * (height as usize)],
        })
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Raw row-major cell states, each 0 or 1.
    #[must_use]
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [u8] {
        &mut self.cells
    }

    /// Returns the flat index for `(x, y)` without bounds checks.
    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    fn check_bounds(&self, x: u32, y: u32) -> Result<(), GridError> {
        if x < self.width && y < self.height {
            Ok(())
        } else {
            Err(GridError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Read one cell.
    pub fn get(&self, x: u32, y: u32) -> Result<bool, GridError> {
        self.check_bounds(x, y)?;
        Ok(self.cells[self.offset(x, y)] == 1)
    }

    /// Write one cell.
    pub fn set(&mut self, x: u32, y: u32, alive: bool) -> Result<(), GridError> {
        self.check_bounds(x, y)?;
        let idx = self.offset(x, y);
        self.cells[idx] = u8::from(alive);
        Ok(())
    }

    /// Set every cell to the same state.
    pub fn fill(&mut self, alive: bool) {
        self.cells.fill(u8::from(alive));
    }

    /// Kill every cell.
    pub fn clear(&mut self) {
        self.fill(false);
    }

    /// Number of live cells.
    #[must_use]
    pub fn population(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell == 1).count()
    }

    /// Minimal inclusive rectangle containing every live cell, or `None`
    /// when the grid is entirely dead.
    #[must_use]
    pub fn live_bounds(&self) -> Option<CellRect> {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        let mut any = false;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.cells[self.offset(x, y)] == 1 {
                    any = true;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }
        any.then(|| CellRect {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        })
    }
}

/// Opaque handle identifying a registered observer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sink invoked with the post-mutation grid after every world change.
///
/// The observer receives a shared reference, so it can copy whatever it
/// needs but can never mutate the engine's live state through the snapshot.
pub trait GridObserver: Send {
    fn grid_changed(&mut self, grid: &CellGrid) -> Result<(), ObserverError>;
}

/// Fan-out registry delivering grid mutations to observers.
///
/// Delivery order follows token order, so a fixed observer set is visited
/// exactly once per `notify` with no misses or duplicates. A failing
/// observer is logged and skipped; it stays registered.
#[derive(Default)]
pub struct ChangeNotifier {
    listeners: BTreeMap<u64, Box<dyn GridObserver>>,
    next_token: u64,
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listeners.len())
            .field("next_token", &self.next_token)
            .finish()
    }
}

impl ChangeNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer, returning the token that removes it again.
    pub fn subscribe(&mut self, observer: Box<dyn GridObserver>) -> ListenerId {
        let token = self.next_token;
        self.next_token += 1;
        self.listeners.insert(token, observer);
        ListenerId(token)
    }

    /// Remove a previously registered observer.
    pub fn unsubscribe(&mut self, token: ListenerId) -> Result<(), NotifyError> {
        self.listeners
            .remove(&token.0)
            .map(|_| ())
            .ok_or(NotifyError::UnknownListener(token))
    }

    /// Deliver `grid` to every registered observer.
    pub fn notify(&mut self, grid: &CellGrid) {
        for (&token, observer) in &mut self.listeners {
            if let Err(error) = observer.grid_changed(grid) {
                warn!(listener = token, %error, "grid observer failed");
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// A toroidal Life world: grid, rules, generation counter, and observers.
pub struct World {
    grid: CellGrid,
    rules: RuleSet,
    generation: u64,
    notifier: ChangeNotifier,
    neighbor_scratch: Vec<u8>,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("width", &self.grid.width())
            .field("height", &self.grid.height())
            .field("rules", &self.rules)
            .field("generation", &self.generation)
            .field("listeners", &self.notifier.len())
            .finish()
    }
}

impl World {
    /// Construct an all-dead world.
    pub fn new(width: u32, height: u32, rules: RuleSet) -> Result<Self, GridError> {
        let grid = CellGrid::new(width, height)?;
        let cell_count = grid.cells().len();
        Ok(Self {
            grid,
            rules,
            generation: 0,
            notifier: ChangeNotifier::new(),
            neighbor_scratch: vec![0; cell_count],
        })
    }

    #[must_use]
    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    #[must_use]
    pub const fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Ticks applied since construction or the last [`World::install`].
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.grid.width()
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.grid.height()
    }

    /// Read one cell.
    pub fn get(&self, x: u32, y: u32) -> Result<bool, GridError> {
        self.grid.get(x, y)
    }

    /// Write one cell and notify observers.
    pub fn set(&mut self, x: u32, y: u32, alive: bool) -> Result<(), GridError> {
        self.grid.set(x, y, alive)?;
        self.notifier.notify(&self.grid);
        Ok(())
    }

    /// Set every cell and notify observers once.
    pub fn fill(&mut self, alive: bool) {
        self.grid.fill(alive);
        self.notifier.notify(&self.grid);
    }

    /// Kill every cell and notify observers once.
    pub fn clear(&mut self) {
        self.fill(false);
    }

    /// Swap in new rules; takes effect on the next tick.
    pub fn set_rules(&mut self, rules: RuleSet) {
        self.rules = rules;
    }

    /// Replace the working grid and rules wholesale.
    ///
    /// This is the load path: decoders build a fresh grid and it only
    /// reaches the world through this swap, so a failed decode can never
    /// leave the world partially written. Resets the generation counter and
    /// notifies observers once.
    pub fn install(&mut self, grid: CellGrid, rules: RuleSet) {
        self.neighbor_scratch.resize(grid.cells().len(), 0);
        self.grid = grid;
        self.rules = rules;
        self.generation = 0;
        self.notifier.notify(&self.grid);
    }

    /// Register an observer for grid mutations.
    pub fn subscribe(&mut self, observer: Box<dyn GridObserver>) -> ListenerId {
        self.notifier.subscribe(observer)
    }

    /// Remove a previously registered observer.
    pub fn unsubscribe(&mut self, token: ListenerId) -> Result<(), NotifyError> {
        self.notifier.unsubscribe(token)
    }

    /// Advance the world by one generation and notify observers once.
    ///
    /// Neighbor counts for every cell are taken from the pre-tick grid, so
    /// the whole generation is computed from one consistent snapshot.
    pub fn tick(&mut self) {
        self.count_neighbors();
        let rules = self.rules;
        for (idx, cell) in self.grid.cells_mut().iter_mut().enumerate() {
            let neighbors = self.neighbor_scratch[idx] as usize;
            *cell = if *cell == 1 {
                u8::from(rules.is_survive(neighbors))
            } else {
                u8::from(rules.is_born(neighbors))
            };
        }
        self.generation += 1;
        self.notifier.notify(&self.grid);
    }

    /// Fill the scratch buffer with toroidal Moore-neighbor counts.
    fn count_neighbors(&mut self) {
        let width = self.grid.width() as usize;
        let height = self.grid.height() as usize;
        let cells = self.grid.cells();
        self.neighbor_scratch.resize(width * height, 0);
        for y in 0..height {
            let up = if y == 0 { height - 1 } else { y - 1 };
            let down = if y + 1 == height { 0 } else { y + 1 };
            for x in 0..width {
                let left = if x == 0 { width - 1 } else { x - 1 };
                let right = if x + 1 == width { 0 } else { x + 1 };
                let total = cells[up * width + left]
                    + cells[up * width + x]
                    + cells[up * width + right]
                    + cells[y * width + left]
                    + cells[y * width + right]
                    + cells[down * width + left]
                    + cells[down * width + x]
                    + cells[down * width + right];
                self.neighbor_scratch[y * width + x] = total;
            }
        }
    }
}
