//! Turn & clock state machine.
//! Exactly one side's countdown is armed at a time. Remaining time floors at zero,
//! at which point the clock enters the terminal `Expired` phase.

use crate::piece::Side;
use serde::Serialize;

pub const DEFAULT_BUDGET_SECS: u32 = 300;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "side", rename_all = "lowercase")]
pub enum ClockPhase {
    Idle,
    Running(Side),
    /// Terminal: `side` ran out of time. Only `reset` leaves this phase.
    Expired(Side),
}

/// Read-only view handed to display code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TurnClockState {
    pub active_side: Side,
    pub white_remaining_secs: u32,
    pub black_remaining_secs: u32,
    pub phase: ClockPhase,
}

#[derive(Debug, Clone)]
pub struct TurnClock {
    budget: u32,
    active: Side,
    white: u32,
    black: u32,
    phase: ClockPhase,
    epoch: u64,
}

impl TurnClock {
    /// New clock with both sides at `budget_secs`, White running.
    pub fn new(budget_secs: u32) -> Self {
        let mut clock = TurnClock {
            budget: budget_secs,
            active: Side::White,
            white: budget_secs,
            black: budget_secs,
            phase: ClockPhase::Idle,
            epoch: 0,
        };
        clock.start(Side::White);
        clock
    }

    /// Restores both budgets and restarts White's countdown. The only way out of `Expired`.
    pub fn reset(&mut self) {
        self.white = self.budget;
        self.black = self.budget;
        self.phase = ClockPhase::Idle;
        self.start(Side::White);
    }

    /// Arms `side`'s countdown from its current remaining time, replacing any armed timer.
    /// Ignored once a flag has fallen.
    pub fn start(&mut self, side: Side) {
        if let ClockPhase::Expired(_) = self.phase {
            return;
        }
        self.active = side;
        self.epoch += 1;
        self.phase = if self.remaining(side) == 0 {
            ClockPhase::Expired(side)
        } else {
            ClockPhase::Running(side)
        };
    }

    /// Hands the move to the other side. Returns `false` when the clock has expired.
    pub fn switch_turn(&mut self) -> bool {
        if let ClockPhase::Expired(_) = self.phase {
            return false;
        }
        self.start(self.active.opponent());
        true
    }

    /// Disarms the running timer without changing whose turn it is.
    pub fn pause(&mut self) {
        if let ClockPhase::Running(_) = self.phase {
            self.phase = ClockPhase::Idle;
            self.epoch += 1;
        }
    }

    pub fn resume(&mut self) {
        if self.phase == ClockPhase::Idle {
            self.start(self.active);
        }
    }

    /// One elapsed second for the armed side. Returns the side whose flag fell on this tick.
    pub fn tick(&mut self) -> Option<Side> {
        let ClockPhase::Running(side) = self.phase else {
            return None;
        };
        let remaining = match side {
            Side::White => &mut self.white,
            Side::Black => &mut self.black,
        };
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.phase = ClockPhase::Expired(side);
            return Some(side);
        }
        None
    }

    /// `secs` ticks in a row.
    pub fn advance(&mut self, secs: u32) -> Option<Side> {
        let mut fallen = None;
        for _ in 0..secs {
            if let Some(side) = self.tick() {
                fallen = Some(side);
            }
        }
        fallen
    }

    pub fn remaining(&self, side: Side) -> u32 {
        match side {
            Side::White => self.white,
            Side::Black => self.black,
        }
    }

    pub fn active_side(&self) -> Side {
        self.active
    }

    pub fn phase(&self) -> ClockPhase {
        self.phase
    }

    /// The side whose timer is armed, if any.
    pub fn armed(&self) -> Option<Side> {
        match self.phase {
            ClockPhase::Running(side) => Some(side),
            _ => None,
        }
    }

    /// Bumped every time the armed timer is replaced or disarmed. Schedulers compare
    /// it to decide whether their pending tick still belongs to the current timer.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn state(&self) -> TurnClockState {
        TurnClockState {
            active_side: self.active,
            white_remaining_secs: self.white,
            black_remaining_secs: self.black,
            phase: self.phase,
        }
    }
}

impl Default for TurnClock {
    fn default() -> Self {
        TurnClock::new(DEFAULT_BUDGET_SECS)
    }
}

/// `m:ss`, e.g. 300 -> "5:00", 65 -> "1:05".
pub fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
