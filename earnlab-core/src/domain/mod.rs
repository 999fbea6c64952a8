//! Domain types for EarnLab

pub mod bar;
pub mod event;
pub mod profile;
pub mod reaction;
pub mod timing;

pub use bar::{Bar, PricePoint};
pub use event::{EarningsEvent, EventKey, TranscriptDate};
pub use profile::CompanyProfile;
pub use reaction::{
    is_four_decimal, is_significant, round4, PriceWindow, ReactionRecord,
    DEFAULT_SIGNIFICANCE_THRESHOLD,
};
pub use timing::Timing;
