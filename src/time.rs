use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// One simulated second.
#[derive(Debug, Clone, Copy, Default, Ord, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd)]
pub struct Tick(pub u64);

impl Tick {
    pub const SECONDS_PER_DAY: u64 = 86_400;

    /// Ticks elapsed since `earlier`, zero if `earlier` lies in the future.
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn days(n: u64) -> u64 {
        n * Self::SECONDS_PER_DAY
    }
}

impl std::fmt::Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let days = self.0 / Self::SECONDS_PER_DAY;
        let remaining = self.0 % Self::SECONDS_PER_DAY;
        let hours = remaining / 3600;
        let mins = (remaining % 3600) / 60;
        let secs = remaining % 60;
        write!(f, "DAY{} {:02}:{:02}:{:02}", days + 1, hours, mins, secs)
    }
}

impl Add<u64> for Tick {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Tick(self.0 + rhs)
    }
}

impl AddAssign<u64> for Tick {
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_rolls_over_days() {
        assert_eq!("DAY1 00:00:05", Tick(5).to_string());
        assert_eq!("DAY2 01:01:01", Tick(86_400 + 3661).to_string());
    }

    #[test]
    fn test_since_saturates() {
        assert_eq!(0, Tick(3).since(Tick(10)));
        assert_eq!(7, Tick(10).since(Tick(3)));
    }
}
