//! Cooldown timers and stacking auras
//!
//! Both are plain values keyed on simulated time; nothing here runs in the
//! background. An aura only becomes inactive when [`Aura::check_expiration`]
//! is called with a timestamp at or past its expiry, so callers must check
//! after every time advance.

use std::time::Duration;

/// Ready-at timestamp for cooldown-style mechanics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    ready_at: Duration,
}

impl Timer {
    pub fn ready(&self, now: Duration) -> bool {
        now >= self.ready_at
    }

    pub fn remaining(&self, now: Duration) -> Duration {
        self.ready_at.saturating_sub(now)
    }

    /// Become ready `cooldown` after `now`.
    pub fn reset(&mut self, now: Duration, cooldown: Duration) {
        self.ready_at = now.saturating_add(cooldown);
    }

    pub fn force_ready(&mut self, now: Duration) {
        self.ready_at = now;
    }

    /// Pull the ready time earlier, never below zero.
    pub fn reduce(&mut self, amount: Duration) {
        self.ready_at = self.ready_at.saturating_sub(amount);
    }

    pub fn ready_at(&self) -> Duration {
        self.ready_at
    }
}

/// A state transition produced by an aura operation.
///
/// Returned instead of invoking callbacks; the simulation turns these into
/// combat log lines and dependent effects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuraChange {
    Gained { stacks: u32 },
    StacksChanged { from: u32, to: u32 },
    Refreshed,
    Expired { at: Duration },
}

/// A named, optionally stacking, optionally time-limited effect.
#[derive(Debug, Clone, PartialEq)]
pub struct Aura {
    label: &'static str,
    /// `None` means the aura lasts until cleared.
    duration: Option<Duration>,
    /// Zero means unbounded.
    max_stacks: u32,
    stacks: u32,
    active: bool,
    expires_at: Duration,
    value: f64,
}

impl Aura {
    pub fn new(label: &'static str, duration: Duration, max_stacks: u32) -> Self {
        Self {
            label,
            duration: Some(duration),
            max_stacks,
            stacks: 0,
            active: false,
            expires_at: Duration::ZERO,
            value: 0.0,
        }
    }

    /// An aura with no expiry; it ends only through `clear` or stack removal.
    pub fn indefinite(label: &'static str, max_stacks: u32) -> Self {
        Self {
            duration: None,
            ..Self::new(label, Duration::ZERO, max_stacks)
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Raw flag, ignoring expiry.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn active_at(&self, now: Duration) -> bool {
        if !self.active {
            return false;
        }
        match self.duration {
            None => true,
            Some(_) => now < self.expires_at,
        }
    }

    pub fn stacks(&self) -> u32 {
        self.stacks
    }

    pub fn max_stacks(&self) -> u32 {
        self.max_stacks
    }

    pub fn expires_at(&self) -> Duration {
        self.expires_at
    }

    /// Time left; `Duration::MAX` for an active indefinite aura.
    pub fn remaining(&self, now: Duration) -> Duration {
        if !self.active_at(now) {
            return Duration::ZERO;
        }
        match self.duration {
            None => Duration::MAX,
            Some(_) => self.expires_at - now,
        }
    }

    /// Magnitude captured when the aura was applied (e.g. bonus spell power).
    pub fn value(&self) -> f64 {
        if self.active {
            self.value
        } else {
            0.0
        }
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    /// Add (or remove, with a negative delta) stacks, clamped to `[0, max]`.
    ///
    /// Any non-zero delta refreshes the expiry. Reaching zero stacks
    /// deactivates the aura.
    pub fn add_stacks(&mut self, now: Duration, delta: i32) -> Option<AuraChange> {
        if delta == 0 {
            return None;
        }
        let was_active = self.active;
        let old = if was_active { self.stacks } else { 0 };
        let target = self.clamp(i64::from(old) + i64::from(delta));
        if target == 0 {
            return self.deactivate(now);
        }
        self.active = true;
        self.refresh_expiry(now);
        self.stacks = target;
        Some(self.transition(was_active, old, target))
    }

    /// Set the stack count directly; zero or less deactivates.
    pub fn set_stacks(&mut self, now: Duration, stacks: i32) -> Option<AuraChange> {
        if stacks <= 0 {
            return self.deactivate(now);
        }
        let was_active = self.active;
        let old = if was_active { self.stacks } else { 0 };
        let target = self.clamp(i64::from(stacks));
        self.active = true;
        self.refresh_expiry(now);
        self.stacks = target;
        Some(self.transition(was_active, old, target))
    }

    /// Activate with one stack for an explicit duration, overriding the
    /// configured one for this application only.
    pub fn apply_for(&mut self, now: Duration, duration: Duration) -> Option<AuraChange> {
        let was_active = self.active;
        let old = if was_active { self.stacks } else { 0 };
        self.active = true;
        self.stacks = old.max(1);
        self.expires_at = now.saturating_add(duration);
        Some(self.transition(was_active, old, self.stacks))
    }

    /// Consume one stack without touching the expiry.
    pub fn consume_stack(&mut self, now: Duration) -> Option<AuraChange> {
        if !self.active || self.stacks == 0 {
            return None;
        }
        let old = self.stacks;
        if old == 1 {
            return self.deactivate(now);
        }
        self.stacks = old - 1;
        Some(AuraChange::StacksChanged {
            from: old,
            to: self.stacks,
        })
    }

    /// Push the expiry further out without changing stacks.
    pub fn extend(&mut self, by: Duration) {
        if self.active && self.duration.is_some() {
            self.expires_at += by;
        }
    }

    pub fn clear(&mut self, now: Duration) -> Option<AuraChange> {
        self.deactivate(now)
    }

    /// Deactivate if expired at `now`; returns true when it did.
    pub fn check_expiration(&mut self, now: Duration) -> bool {
        if !self.active || self.duration.is_none() || now < self.expires_at {
            return false;
        }
        self.deactivate(now);
        true
    }

    fn clamp(&self, stacks: i64) -> u32 {
        let stacks = stacks.max(0);
        let stacks = if self.max_stacks > 0 {
            stacks.min(i64::from(self.max_stacks))
        } else {
            stacks
        };
        u32::try_from(stacks).unwrap_or(u32::MAX)
    }

    fn refresh_expiry(&mut self, now: Duration) {
        if let Some(duration) = self.duration {
            self.expires_at = now.saturating_add(duration);
        }
    }

    fn transition(&self, was_active: bool, from: u32, to: u32) -> AuraChange {
        if !was_active {
            AuraChange::Gained { stacks: to }
        } else if from != to {
            AuraChange::StacksChanged { from, to }
        } else {
            AuraChange::Refreshed
        }
    }

    fn deactivate(&mut self, now: Duration) -> Option<AuraChange> {
        if !self.active {
            return None;
        }
        let at = match self.duration {
            Some(_) if self.expires_at <= now => self.expires_at,
            _ => now,
        };
        self.active = false;
        self.stacks = 0;
        self.expires_at = Duration::ZERO;
        self.value = 0.0;
        Some(AuraChange::Expired { at })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn stacks_clamp_and_refresh_expiry() {
        let mut aura = Aura::new("test", secs(10), 3);
        assert_eq!(aura.add_stacks(secs(0), 1), Some(AuraChange::Gained { stacks: 1 }));
        assert_eq!(
            aura.add_stacks(secs(3), 5),
            Some(AuraChange::StacksChanged { from: 1, to: 3 })
        );
        assert!(aura.active_at(secs(3)));
        assert_eq!(aura.stacks(), 3);
        assert_eq!(aura.expires_at(), secs(13));

        assert!(aura.check_expiration(secs(13)));
        assert!(!aura.active_at(secs(13)));
        assert_eq!(aura.stacks(), 0);
        assert!(!aura.check_expiration(secs(14)));
    }

    #[test]
    fn removing_all_stacks_deactivates() {
        let mut aura = Aura::new("test", secs(10), 5);
        aura.add_stacks(secs(0), 2);
        let change = aura.add_stacks(secs(1), -4);
        assert_eq!(change, Some(AuraChange::Expired { at: secs(1) }));
        assert!(!aura.is_active());
        assert_eq!(aura.stacks(), 0);
    }

    #[test]
    fn set_stacks_non_positive_deactivates() {
        let mut aura = Aura::new("test", secs(10), 5);
        aura.set_stacks(secs(0), 4);
        assert_eq!(aura.stacks(), 4);
        aura.set_stacks(secs(2), 0);
        assert!(!aura.is_active());
        assert_eq!(aura.set_stacks(secs(3), -1), None);
    }

    #[test]
    fn expiry_is_lazy() {
        let mut aura = Aura::new("test", secs(5), 1);
        aura.set_stacks(secs(0), 1);
        assert!(aura.is_active());
        assert!(!aura.active_at(secs(6)));
        assert!(aura.is_active(), "flag only drops when checked");
        assert!(aura.check_expiration(secs(6)));
        assert!(!aura.is_active());
    }

    #[test]
    fn indefinite_aura_never_expires() {
        let mut aura = Aura::indefinite("dd", 1);
        aura.set_stacks(secs(0), 1);
        assert!(!aura.check_expiration(secs(10_000)));
        assert!(aura.active_at(secs(10_000)));
        assert_eq!(aura.remaining(secs(5)), Duration::MAX);
        aura.clear(secs(20));
        assert_eq!(aura.remaining(secs(21)), Duration::ZERO);
    }

    #[test]
    fn consuming_charges_keeps_expiry() {
        let mut aura = Aura::new("backdraft", secs(15), 3);
        aura.set_stacks(secs(0), 3);
        aura.consume_stack(secs(4));
        assert_eq!(aura.stacks(), 2);
        assert_eq!(aura.expires_at(), secs(15));
        aura.consume_stack(secs(5));
        assert_eq!(
            aura.consume_stack(secs(6)),
            Some(AuraChange::Expired { at: secs(6) })
        );
    }

    #[test]
    fn timer_reports_remaining() {
        let mut timer = Timer::default();
        assert!(timer.ready(Duration::ZERO));
        timer.reset(secs(2), secs(10));
        assert!(!timer.ready(secs(5)));
        assert_eq!(timer.remaining(secs(5)), secs(7));
        timer.reduce(secs(3));
        assert_eq!(timer.ready_at(), secs(9));
        timer.force_ready(secs(6));
        assert!(timer.ready(secs(6)));
        assert_eq!(timer.remaining(secs(8)), Duration::ZERO);
    }
}
