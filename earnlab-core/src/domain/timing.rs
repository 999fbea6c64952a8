//! Announcement timing relative to the trading session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// When an earnings announcement happened relative to the regular session.
///
/// `Unknown` is a legitimate verdict, not an error: it means no signal
/// provider could tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timing {
    /// Before market open: compare prior-day close to same-day close.
    #[serde(rename = "BMO")]
    BeforeOpen,
    /// After market close: compare same-day close to next-day close.
    #[serde(rename = "AMC")]
    AfterClose,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl Timing {
    pub fn is_known(self) -> bool {
        !matches!(self, Timing::Unknown)
    }

    /// `None` for `Unknown`, which is how records carry an undetermined timing.
    pub fn known(self) -> Option<Timing> {
        self.is_known().then_some(self)
    }

    pub fn code(self) -> &'static str {
        match self {
            Timing::BeforeOpen => "BMO",
            Timing::AfterClose => "AMC",
            Timing::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
