use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, TimeDelta};

/// Look-back window used by every aggregate query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    Weekly,
    Biweekly,
    #[default]
    Monthly,
    Quarterly,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Período inválido. Use 'semanal', 'quinzenal', 'mensal' ou 'trimestral'.")]
pub struct InvalidPeriod;

impl Period {
    pub fn days(self) -> i64 {
        match self {
            Period::Weekly => 7,
            Period::Biweekly => 15,
            Period::Monthly => 30,
            Period::Quarterly => 90,
        }
    }

    /// First instant included in the window ending at `now`.
    pub fn start(self, now: NaiveDateTime) -> NaiveDateTime {
        now - TimeDelta::days(self.days())
    }

    pub fn label(self) -> &'static str {
        match self {
            Period::Weekly => "semanal",
            Period::Biweekly => "quinzenal",
            Period::Monthly => "mensal",
            Period::Quarterly => "trimestral",
        }
    }
}

impl FromStr for Period {
    type Err = InvalidPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "semanal" | "weekly" => Ok(Period::Weekly),
            "quinzenal" | "biweekly" => Ok(Period::Biweekly),
            "mensal" | "monthly" => Ok(Period::Monthly),
            "trimestral" | "quarterly" => Ok(Period::Quarterly),
            _ => Err(InvalidPeriod),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
