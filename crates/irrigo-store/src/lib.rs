//! `irrigo-store`: SQLite persistence for operator state.
//!
//! Device address and listener settings live in the TOML config; everything
//! the operator can change at runtime lives here:
//!
//! | Table              | Owner            |
//! |--------------------|------------------|
//! | `schedule_entries` | [`ScheduleStore`] |
//! | `override_state`   | [`ScheduleStore`] |
//! | `valves`           | [`ScheduleStore`] |
//! | `action_log`       | [`ActionJournal`] |

pub mod db;
pub mod error;
pub mod journal;
pub mod store;

pub use error::{Result, StoreError};
pub use journal::ActionJournal;
pub use store::ScheduleStore;
