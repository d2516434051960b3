//! Iteration-local combat log

use crate::actor::AuraSlot;
use crate::aura::AuraChange;
use std::fmt;
use std::time::Duration;

/// Timestamped lines collected during one iteration and flushed afterwards.
#[derive(Debug, Default)]
pub(crate) struct CombatLog {
    lines: Vec<String>,
}

impl CombatLog {
    pub fn record(&mut self, at: Duration, message: impl fmt::Display) {
        self.lines
            .push(format!("[{:7.2}s] {}", at.as_secs_f64(), message));
    }

    /// Log an aura transition; expiries are stamped with their expiry time.
    pub fn record_change(&mut self, now: Duration, slot: AuraSlot, change: AuraChange) {
        let label = slot.label();
        match (slot, change) {
            (AuraSlot::Buff(_), AuraChange::Gained { stacks }) => {
                self.record(now, format_args!("BUFF_GAIN {label} (stacks={stacks})"))
            }
            (AuraSlot::Buff(_), AuraChange::StacksChanged { from, to }) => {
                self.record(now, format_args!("BUFF_UPDATE {label} (stacks {from}->{to})"))
            }
            (AuraSlot::Buff(_), AuraChange::Refreshed) => {
                self.record(now, format_args!("BUFF_UPDATE {label} (refreshed)"))
            }
            (AuraSlot::Buff(_), AuraChange::Expired { at }) => {
                self.record(at, format_args!("BUFF_EXPIRE {label}"))
            }
            (AuraSlot::Debuff(_), AuraChange::Gained { .. }) => {
                self.record(now, format_args!("DEBUFF_APPLY {label}"))
            }
            (AuraSlot::Debuff(_), AuraChange::StacksChanged { .. } | AuraChange::Refreshed) => {
                self.record(now, format_args!("DEBUFF_REFRESH {label}"))
            }
            (AuraSlot::Debuff(_), AuraChange::Expired { at }) => {
                self.record(at, format_args!("DOT_EXPIRE {label}"))
            }
        }
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Buff, Debuff};

    #[test]
    fn lines_are_timestamped() {
        let mut log = CombatLog::default();
        log.record(Duration::from_millis(12_500), "CAST_START Incinerate");
        log.record_change(
            Duration::from_secs(20),
            AuraSlot::Debuff(Debuff::Immolate),
            AuraChange::Expired { at: Duration::from_secs(15) },
        );
        log.record_change(
            Duration::from_secs(20),
            AuraSlot::Buff(Buff::Backdraft),
            AuraChange::StacksChanged { from: 3, to: 2 },
        );
        assert_eq!(
            log.into_lines(),
            vec![
                "[  12.50s] CAST_START Incinerate".to_string(),
                "[  15.00s] DOT_EXPIRE Immolate".to_string(),
                "[  20.00s] BUFF_UPDATE Backdraft (stacks 3->2)".to_string(),
            ]
        );
    }
}
