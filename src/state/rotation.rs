//! Pica-pica rotation: inside a configured score window a team match splits
//! into one-on-one duels between rotating pairs of players.

use rand::{Rng, seq::SliceRandom};

use crate::state::ledger::TeamScores;

/// Two players facing each other in a duel, one from each side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    /// Player id on the nosotros side.
    pub first: String,
    /// Player id on the ellos side.
    pub second: String,
}

/// Observable state of the rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationState {
    /// Disabled, without pairings, or no score inside the window.
    Inactive,
    /// A duel is being played by the pairing at `pairing_index`.
    Active {
        /// Index into the configured pairings.
        pairing_index: usize,
    },
}

/// Rotation settings and the position of the cycle.
///
/// `current_index` counts window entries net of undo: a forward change that
/// enters the window advances it, a backward change that leaves the window
/// moves it back by one. Only entries that were counted are taken back, so
/// a window reached by installing the rotation or switching the target never
/// moves the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationConfig {
    /// Whether rotation applies to the match at all.
    pub enabled: bool,
    /// First score (inclusive) of the window.
    pub start_at: u32,
    /// Last score (inclusive) of the window.
    pub end_at: u32,
    /// Duels in rotation order.
    pub pairings: Vec<Pairing>,
    /// Index of the pairing currently playing.
    pub current_index: usize,
    /// Whether the last evaluation found a score inside the window.
    pub in_window: bool,
    /// Whether the current window stretch was entered by [`Self::advance`].
    pub entry_counted: bool,
}

impl RotationConfig {
    /// Enabled rotation over `[start_at, end_at]` (bounds are reordered if reversed).
    pub fn new(start_at: u32, end_at: u32, pairings: Vec<Pairing>) -> Self {
        let (start_at, end_at) = if start_at <= end_at {
            (start_at, end_at)
        } else {
            (end_at, start_at)
        };

        Self {
            enabled: true,
            start_at,
            end_at,
            pairings,
            current_index: 0,
            in_window: false,
            entry_counted: false,
        }
    }

    /// Pair the `i`-th player of each roster; extra players are left out.
    pub fn from_rosters(start_at: u32, end_at: u32, nosotros: &[String], ellos: &[String]) -> Self {
        let pairings = nosotros
            .iter()
            .zip(ellos)
            .map(|(first, second)| Pairing {
                first: first.clone(),
                second: second.clone(),
            })
            .collect();
        Self::new(start_at, end_at, pairings)
    }

    /// Randomize the order in which duels are played.
    pub fn shuffled<R: Rng + ?Sized>(mut self, rng: &mut R) -> Self {
        self.pairings.shuffle(rng);
        self
    }

    /// Same configuration with the cycle moved back to its first pairing.
    pub fn restarted(mut self) -> Self {
        self.current_index = 0;
        self.in_window = false;
        self.entry_counted = false;
        self
    }

    /// Current state of the cycle.
    pub fn state(&self) -> RotationState {
        if self.is_active() {
            RotationState::Active {
                pairing_index: self.current_index % self.pairings.len(),
            }
        } else {
            RotationState::Inactive
        }
    }

    /// Whether a duel is currently being played.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.pairings.is_empty() && self.in_window
    }

    /// Pairing playing right now, if the rotation is active.
    pub fn current_pairing(&self) -> Option<&Pairing> {
        match self.state() {
            RotationState::Active { pairing_index } => self.pairings.get(pairing_index),
            RotationState::Inactive => None,
        }
    }

    /// Re-evaluate after points were added. Returns `true` when the index advanced.
    pub fn advance(&mut self, scores: TeamScores) -> bool {
        let was_inside = self.in_window;
        self.in_window = self.window_hit(scores);

        if !was_inside && self.in_window {
            self.current_index = (self.current_index + 1) % self.pairings.len();
            self.entry_counted = true;
            return true;
        }
        false
    }

    /// Re-evaluate after points were removed. Returns `true` when the index moved back.
    pub fn retreat(&mut self, scores: TeamScores) -> bool {
        let was_inside = self.in_window;
        self.in_window = self.window_hit(scores);

        if was_inside && !self.in_window && self.entry_counted && !self.pairings.is_empty() {
            let len = self.pairings.len();
            self.current_index = (self.current_index % len + len - 1) % len;
            self.entry_counted = false;
            return true;
        }
        false
    }

    /// Re-evaluate without moving the cycle (configuration or target changes).
    pub fn resync(&mut self, scores: TeamScores) {
        let was_inside = self.in_window;
        self.in_window = self.window_hit(scores);
        if was_inside != self.in_window {
            self.entry_counted = false;
        }
        if !self.pairings.is_empty() {
            self.current_index %= self.pairings.len();
        }
    }

    fn contains(&self, score: u32) -> bool {
        (self.start_at..=self.end_at).contains(&score)
    }

    fn window_hit(&self, scores: TeamScores) -> bool {
        self.enabled
            && !self.pairings.is_empty()
            && (self.contains(scores.nosotros) || self.contains(scores.ellos))
    }
}
