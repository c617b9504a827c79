//! Scripted opponent for Broadside.
//!
//! The bot hunts with a checkerboard scan and, once it lands a hit, switches
//! to targeting: it probes the neighbors of the hit, infers the vessel's
//! orientation from consecutive hits and then extends outward from both
//! ends of the run until the vessel sinks.
//!
//! Shot selection, first non-empty tier wins:
//! 1. the head of the candidate queue
//! 2. neighbors of a hit on a vessel that is still afloat
//! 3. a random untried cell with `row + col` even
//! 4. a random untried cell anywhere

use crate::actions::ShotOutcome;
use crate::board::Board;
use crate::game::{FiredShot, MatchError};
use crate::grid::{Coord, Orientation};
use rand::prelude::*;
use std::collections::{HashSet, VecDeque};

/// Pursuit state for the vessel currently being hunted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Targeting {
    hunting: bool,
    queue: VecDeque<Coord>,
    hits: Vec<Coord>,
    orientation: Option<Orientation>,
}

impl Targeting {
    fn seeded(hit: Coord) -> Self {
        Self {
            hunting: true,
            queue: VecDeque::new(),
            hits: vec![hit],
            orientation: None,
        }
    }

    pub fn is_hunting(&self) -> bool {
        self.hunting
    }

    /// Cells queued to try next
    pub fn queue(&self) -> &VecDeque<Coord> {
        &self.queue
    }

    /// Hits on the pursued vessel, oldest first
    pub fn hits(&self) -> &[Coord] {
        &self.hits
    }

    pub fn orientation(&self) -> Option<Orientation> {
        self.orientation
    }

    /// Untried cells just past each end of the hit run through `anchor`
    fn run_ends(&self, anchor: Coord, orientation: Orientation, tried: &HashSet<Coord>) -> Vec<Coord> {
        let step = orientation.step();
        let mut ends = Vec::with_capacity(2);

        for sign in [-1i16, 1] {
            let mut distance = 1;
            while let Some(cell) = anchor.offset(step, sign * distance) {
                if self.hits.contains(&cell) {
                    distance += 1;
                    continue;
                }
                if !tried.contains(&cell) {
                    ends.push(cell);
                }
                break;
            }
        }

        ends
    }

    /// Untried orthogonal neighbors of `hit`
    fn open_neighbors(hit: Coord, tried: &HashSet<Coord>) -> Vec<Coord> {
        hit.orthogonal_neighbors()
            .filter(|c| !tried.contains(c))
            .collect()
    }

    /// Rebuild the queue around the latest hit
    fn refill(&mut self, tried: &HashSet<Coord>) {
        self.queue.clear();
        let Some(&latest) = self.hits.last() else {
            return;
        };
        let candidates = match self.orientation {
            Some(orientation) => self.run_ends(latest, orientation, tried),
            None => Self::open_neighbors(latest, tried),
        };
        self.queue.extend(candidates);
    }

    /// Rebuild the queue from the first hit after a run of misses.
    ///
    /// Tries the other end of the run first, then drops the orientation guess
    /// and falls back to plain neighbors of every known hit.
    fn reseed(&mut self, tried: &HashSet<Coord>) {
        self.queue.clear();
        let Some(&first) = self.hits.first() else {
            *self = Self::default();
            return;
        };

        if let Some(orientation) = self.orientation {
            let ends = self.run_ends(first, orientation, tried);
            if !ends.is_empty() {
                self.queue.extend(ends);
                return;
            }
            self.orientation = None;
        }

        for &hit in &self.hits {
            for cell in Self::open_neighbors(hit, tried) {
                if !self.queue.contains(&cell) {
                    self.queue.push_back(cell);
                }
            }
        }

        if self.queue.is_empty() {
            *self = Self::default();
        }
    }

    fn record_hit(&mut self, coord: Coord, tried: &HashSet<Coord>) {
        self.hunting = true;
        self.hits.push(coord);

        if let [.., previous, latest] = self.hits[..] {
            if previous.row == latest.row {
                self.orientation = Some(Orientation::Horizontal);
            } else if previous.col == latest.col {
                self.orientation = Some(Orientation::Vertical);
            }
        }

        self.refill(tried);
    }
}

/// The scripted seat's decision maker
#[derive(Debug, Clone)]
pub struct Bot {
    targeting: Targeting,
    rng: StdRng,
}

impl Default for Bot {
    fn default() -> Self {
        Self::new()
    }
}

impl Bot {
    pub fn new() -> Self {
        Self {
            targeting: Targeting::default(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            targeting: Targeting::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn targeting(&self) -> &Targeting {
        &self.targeting
    }

    /// Drop any pursuit in progress
    pub fn reset(&mut self) {
        self.targeting = Targeting::default();
    }

    /// Lay out the scripted fleet
    pub fn place_fleet(&mut self, board: &mut Board) -> Result<(), MatchError> {
        board.place_random_fleet(&mut self.rng)
    }

    /// Pick the next cell to fire at, or `None` once every cell has been tried
    pub fn choose_target(&mut self, fired: &[FiredShot], target: &Board) -> Option<Coord> {
        let tried: HashSet<Coord> = fired.iter().map(FiredShot::coord).collect();

        while let Some(cell) = self.targeting.queue.pop_front() {
            if !tried.contains(&cell) {
                return Some(cell);
            }
        }

        if let Some(cell) = self.resume_unfinished(fired, target, &tried) {
            return Some(cell);
        }

        self.targeting = Targeting::default();
        self.random_untried(&tried)
    }

    /// Look for hits on vessels still afloat and pick up the pursuit there
    fn resume_unfinished(
        &mut self,
        fired: &[FiredShot],
        target: &Board,
        tried: &HashSet<Coord>,
    ) -> Option<Coord> {
        let unfinished = fired
            .iter()
            .filter(|shot| shot.hit)
            .map(FiredShot::coord)
            .filter(|&hit| target.vessel_at(hit).is_some_and(|v| !v.is_sunk()));

        for hit in unfinished {
            self.targeting = Targeting::seeded(hit);
            self.targeting.refill(tried);
            if let Some(cell) = self.targeting.queue.pop_front() {
                return Some(cell);
            }
        }

        None
    }

    /// Checkerboard scan, falling back to the full grid
    fn random_untried(&mut self, tried: &HashSet<Coord>) -> Option<Coord> {
        let parity: Vec<Coord> = Coord::all()
            .filter(|c| c.is_checkerboard() && !tried.contains(c))
            .collect();
        if let Some(&cell) = parity.choose(&mut self.rng) {
            return Some(cell);
        }

        let remaining: Vec<Coord> = Coord::all().filter(|c| !tried.contains(c)).collect();
        remaining.choose(&mut self.rng).copied()
    }

    /// Update pursuit state after one of the bot's own shots.
    ///
    /// `fired` must already include the shot being observed.
    pub fn observe(&mut self, outcome: &ShotOutcome, fired: &[FiredShot]) {
        let tried: HashSet<Coord> = fired.iter().map(FiredShot::coord).collect();

        if outcome.sunk.is_some() {
            self.reset();
        } else if outcome.hit {
            self.targeting.record_hit(outcome.coord(), &tried);
        } else if self.targeting.hunting && self.targeting.queue.is_empty() {
            self.targeting.reseed(&tried);
        }
    }
}
