//! Player durability and power progression.

use barrage_core::PlayerTuning;

/// Power level, score and threshold reported after a pickup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PowerProgress {
    /// Current power level.
    pub level: u32,
    /// Score accumulated towards the next level.
    pub score: u32,
    /// Score required to leave the current level.
    pub threshold: u32,
}

/// Outcome of the player taking one hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HitOutcome {
    Damaged { hit_points: u32 },
    Defeated { hit_points: u32 },
    AlreadyDefeated,
}

#[derive(Clone, Debug)]
pub(crate) struct PlayerStats {
    pub(crate) hit_points: u32,
    pub(crate) power: u32,
    pub(crate) power_score: u32,
    defeated: bool,
}

impl PlayerStats {
    pub(crate) fn new(tuning: &PlayerTuning) -> Self {
        Self {
            hit_points: tuning.hit_points,
            power: 1,
            power_score: 0,
            defeated: tuning.hit_points == 0,
        }
    }

    pub(crate) const fn is_defeated(&self) -> bool {
        self.defeated
    }

    pub(crate) fn take_hit(&mut self) -> HitOutcome {
        if self.defeated {
            return HitOutcome::AlreadyDefeated;
        }

        self.hit_points = self.hit_points.saturating_sub(1);
        if self.hit_points == 0 {
            self.defeated = true;
            HitOutcome::Defeated {
                hit_points: self.hit_points,
            }
        } else {
            HitOutcome::Damaged {
                hit_points: self.hit_points,
            }
        }
    }

    /// Credits one pickup. Score stops accruing once the level is maxed.
    pub(crate) fn collect(&mut self, tuning: &PlayerTuning, value: u32) -> PowerProgress {
        if self.power < tuning.max_power {
            self.power_score = self.power_score.saturating_add(value);
            if self.power_score >= tuning.threshold_for(self.power) {
                self.power += 1;
                self.power_score = 0;
            }
        }
        self.progress(tuning)
    }

    pub(crate) fn progress(&self, tuning: &PlayerTuning) -> PowerProgress {
        let capped = self.power.min(tuning.max_power.saturating_sub(1));
        PowerProgress {
            level: self.power,
            score: self.power_score,
            threshold: tuning.threshold_for(capped),
        }
    }
}
