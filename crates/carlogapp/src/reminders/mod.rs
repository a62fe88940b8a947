//! # Maintenance Reminders
//!
//! Two halves:
//!
//! - [`status`]: pure due/overdue derivation, used for display.
//! - [`scheduler`]: keeps a platform notification centre in sync with an
//!   interval, through the [`notify::NotificationCenter`] port and the
//!   [`cooldown::CooldownStore`] port.
//!
//! Each interval owns six notification ids (see [`notify::NotificationIds`]).
//! A sync always cancels all of them first, then schedules what applies:
//!
//! | Channel | Condition | Notification |
//! |---------|-----------|--------------|
//! | date | due moment in the future | `due` at due date + fire time |
//! | date | warning moment in the future | `warning` lead days earlier |
//! | date | due moment passed, repeat set | `overdue` daily or in 7 days |
//! | mileage | km left within lead, cooldown elapsed | `mileage-now` immediately |
//! | mileage | km left within lead, repeat set | `mileage-repeat` daily or in 7 days |

pub mod cooldown;
pub mod notify;
pub mod scheduler;
pub mod status;

pub use cooldown::{CooldownStore, FsCooldowns, MemCooldowns};
pub use notify::{
    AuthorizationStatus, FireSpec, NotificationCenter, NotificationIds, NotificationRequest,
    RecordingCenter,
};
pub use scheduler::{sync_interval, ReminderContext, SkipReason, SyncReport};
pub use status::{current_km, derive_status, DueStatus, IntervalStatus};
