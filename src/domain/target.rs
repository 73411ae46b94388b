/// Target kinds and their scoring properties.
/// Properties are queried via methods, not stored as flags,
/// so scoring semantics are centralized here.

use rand::Rng;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TargetKind {
    Normal,   // +10, 70% of spawns
    Special,  // +25, 20% of spawns
    Bomb,     // -15, 10% of spawns
}

/// Cumulative upper bounds of the spawn distribution on a uniform [0, 1) draw.
const NORMAL_BELOW: f64 = 0.7;
const SPECIAL_BELOW: f64 = 0.9;

impl TargetKind {
    /// Signed change applied to the score when this target is hit.
    pub fn score_delta(self) -> i32 {
        match self {
            TargetKind::Normal => 10,
            TargetKind::Special => 25,
            TargetKind::Bomb => -15,
        }
    }

    /// Apply this kind's delta to `score`, flooring at zero.
    pub fn apply_to(self, score: u32) -> u32 {
        let next = score as i64 + self.score_delta() as i64;
        next.clamp(0, u32::MAX as i64) as u32
    }

    /// Map a uniform draw in [0, 1) onto a kind: [0, .7) Normal, [.7, .9) Special, [.9, 1) Bomb.
    pub fn from_roll(roll: f64) -> TargetKind {
        if roll < NORMAL_BELOW {
            TargetKind::Normal
        } else if roll < SPECIAL_BELOW {
            TargetKind::Special
        } else {
            TargetKind::Bomb
        }
    }

    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> TargetKind {
        TargetKind::from_roll(rng.gen::<f64>())
    }

    pub fn is_hazard(self) -> bool {
        matches!(self, TargetKind::Bomb)
    }

    pub fn label(self) -> &'static str {
        match self {
            TargetKind::Normal => "normal",
            TargetKind::Special => "special",
            TargetKind::Bomb => "bomb",
        }
    }
}
