//! Time-indexed resource usage profile.
//!
//! Tracks how many units of the renewable resource are in use at every
//! time unit of `[0, horizon)`. A task occupying `[s, s + d)` must fit
//! entirely inside the profile, so the profile length doubles as the
//! latest allowed finish time.

/// Resource usage per time unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceProfile {
    capacity: i64,
    usage: Vec<i64>,
}

impl ResourceProfile {
    /// Creates an empty profile over `[0, horizon)`.
    pub fn new(capacity: i64, horizon: i64) -> Self {
        Self {
            capacity,
            usage: vec![0; horizon.max(0) as usize],
        }
    }

    /// Capacity per time unit.
    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    /// Profile length (the horizon).
    pub fn horizon(&self) -> i64 {
        self.usage.len() as i64
    }

    /// Units in use at time `t` (0 outside the profile).
    pub fn usage_at(&self, t: i64) -> i64 {
        if t < 0 {
            return 0;
        }
        self.usage.get(t as usize).copied().unwrap_or(0)
    }

    /// Whether a task fits at `start` without exceeding capacity or the horizon.
    pub fn fits(&self, start: i64, duration: i64, demand: i64) -> bool {
        start >= 0
            && start + duration <= self.horizon()
            && self.last_conflict(start, duration, demand).is_none()
    }

    /// Earliest start `≥ release` at which a task fits.
    ///
    /// Returns `None` if the task cannot finish by the horizon.
    pub fn earliest_fit(&self, release: i64, duration: i64, demand: i64) -> Option<i64> {
        let latest = self.horizon() - duration;
        let mut start = release.max(0);
        while start <= latest {
            match self.last_conflict(start, duration, demand) {
                // Any start up to the conflicting unit would overlap it.
                Some(t) => start = t + 1,
                None => return Some(start),
            }
        }
        None
    }

    /// Occupies `[start, start + duration)`.
    pub fn add(&mut self, start: i64, duration: i64, demand: i64) {
        for slot in &mut self.usage[start as usize..(start + duration) as usize] {
            *slot += demand;
        }
    }

    /// Releases `[start, start + duration)`.
    pub fn remove(&mut self, start: i64, duration: i64, demand: i64) {
        for slot in &mut self.usage[start as usize..(start + duration) as usize] {
            *slot -= demand;
        }
    }

    /// Total usage from time `t` to the horizon.
    pub fn load_from(&self, t: i64) -> i64 {
        let from = t.clamp(0, self.horizon()) as usize;
        self.usage[from..].iter().sum()
    }

    /// Highest usage at any time unit.
    pub fn peak(&self) -> i64 {
        self.usage.iter().copied().max().unwrap_or(0)
    }

    /// Last time unit within `[start, start + duration)` where `demand`
    /// more units would exceed capacity.
    fn last_conflict(&self, start: i64, duration: i64, demand: i64) -> Option<i64> {
        if demand == 0 {
            return None;
        }
        (start..start + duration)
            .rev()
            .find(|&t| self.usage_at(t) + demand > self.capacity)
    }
}
