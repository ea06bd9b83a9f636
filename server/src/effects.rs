//! Delayed effects keyed to the match's logical clock.
//!
//! Nothing here uses wall-clock timers: the engine advances `now` by one tick
//! at a time and drains whatever has come due. Clearing the scheduler when a
//! match ends guarantees no effect can fire against a later match.

/// Something that should happen at a later logical time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimedEffect {
    /// Put a ball's restitution back after a powered-up kick. Dropped if the
    /// slot has been recreated since (generation mismatch).
    RestoreRestitution { slot: usize, generation: u32 },
    /// Announce a countdown value (3, 2, 1, then 0 for GO).
    Countdown { value: u8 },
    /// Recreate every ball after a two-ball countdown.
    RespawnBalls,
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    due: f32,
    seq: u64,
    effect: TimedEffect,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    pending: Vec<Scheduled>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: f32, effect: TimedEffect) {
        self.pending.push(Scheduled {
            due,
            seq: self.next_seq,
            effect,
        });
        self.next_seq += 1;
    }

    /// Drop every pending effect matching `pred`. Returns how many were removed.
    pub fn cancel_where(&mut self, pred: impl Fn(&TimedEffect) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(|s| !pred(&s.effect));
        before - self.pending.len()
    }

    /// Remove and return all effects due at or before `now`, oldest first.
    pub fn take_due(&mut self, now: f32) -> Vec<TimedEffect> {
        let mut due: Vec<Scheduled> = Vec::new();
        self.pending.retain(|s| {
            if s.due <= now {
                due.push(*s);
                false
            } else {
                true
            }
        });
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)));
        due.into_iter().map(|s| s.effect).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
