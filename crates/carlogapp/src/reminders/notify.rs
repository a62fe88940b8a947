//! Notification port.
//!
//! The scheduler never talks to a platform notification centre directly; it
//! goes through [`NotificationCenter`]. [`RecordingCenter`] is the in-memory
//! implementation used by tests and by callers that only want to inspect what
//! would be scheduled.

use crate::error::{CarlogError, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthorizationStatus {
    NotDetermined,
    Authorized,
    Denied,
    Provisional,
}

impl AuthorizationStatus {
    pub fn allows_delivery(&self) -> bool {
        matches!(self, Self::Authorized | Self::Provisional)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationOptions {
    pub alert: bool,
    pub sound: bool,
    pub badge: bool,
}

impl Default for AuthorizationOptions {
    fn default() -> Self {
        Self {
            alert: true,
            sound: true,
            badge: false,
        }
    }
}

/// When a notification fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FireSpec {
    Immediate,
    /// One-shot at a wall-clock moment.
    At { at: DateTime<FixedOffset> },
    /// One-shot after a delay.
    After { seconds: u64 },
    /// Repeats every day at the given local time.
    Daily { time: NaiveTime },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    /// Groups every notification of one interval together.
    pub thread_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub id: String,
    pub fire: FireSpec,
    pub content: NotificationContent,
}

/// The six deterministic notification identifiers owned by one interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationIds {
    /// Pre-v2 warning id. Never scheduled any more, only cancelled.
    pub legacy_warning: String,
    pub warning: String,
    pub due: String,
    pub overdue: String,
    pub mileage_now: String,
    pub mileage_repeat: String,
}

impl NotificationIds {
    pub fn for_interval(interval_id: &Uuid) -> Self {
        Self {
            legacy_warning: format!("maintenance.{interval_id}"),
            warning: format!("maintenance.warning.v2.{interval_id}"),
            due: format!("maintenance.due.{interval_id}"),
            overdue: format!("maintenance.overdue.{interval_id}"),
            mileage_now: format!("maintenance.mileage.now.{interval_id}"),
            mileage_repeat: format!("maintenance.mileage.repeat.{interval_id}"),
        }
    }

    pub fn all(&self) -> Vec<String> {
        vec![
            self.legacy_warning.clone(),
            self.warning.clone(),
            self.due.clone(),
            self.overdue.clone(),
            self.mileage_now.clone(),
            self.mileage_repeat.clone(),
        ]
    }
}

/// Cooldown key for the immediate mileage alert of one interval.
pub fn mileage_cooldown_key(interval_id: &Uuid) -> String {
    format!("maintenance.mileage.cooldown.{interval_id}")
}

#[async_trait]
pub trait NotificationCenter: Send + Sync {
    async fn authorization_status(&self) -> AuthorizationStatus;

    /// Returns whether delivery was granted.
    async fn request_authorization(&self, options: AuthorizationOptions) -> Result<bool>;

    /// Adds a request, replacing any pending one with the same id.
    async fn schedule(&self, request: NotificationRequest) -> Result<()>;

    async fn cancel_pending(&self, ids: &[String]) -> Result<()>;

    async fn cancel_delivered(&self, ids: &[String]) -> Result<()>;
}

#[derive(Debug)]
struct Recorded {
    status: AuthorizationStatus,
    grant_on_request: bool,
    fail_schedule: bool,
    pending: BTreeMap<String, NotificationRequest>,
    scheduled_log: Vec<String>,
    cancelled_delivered: Vec<String>,
}

/// In-memory notification centre.
///
/// Keeps pending requests keyed by id and a log of every schedule call, so
/// tests can assert on both the end state and what was fired along the way.
#[derive(Debug)]
pub struct RecordingCenter {
    inner: Mutex<Recorded>,
}

impl Default for RecordingCenter {
    fn default() -> Self {
        Self::with_status(AuthorizationStatus::Authorized)
    }
}

impl RecordingCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(status: AuthorizationStatus) -> Self {
        Self {
            inner: Mutex::new(Recorded {
                status,
                grant_on_request: true,
                fail_schedule: false,
                pending: BTreeMap::new(),
                scheduled_log: Vec::new(),
                cancelled_delivered: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Outcome of the next authorization request.
    pub fn set_grant_on_request(&self, grant: bool) {
        self.lock().grant_on_request = grant;
    }

    pub fn set_fail_schedule(&self, fail: bool) {
        self.lock().fail_schedule = fail;
    }

    pub fn status(&self) -> AuthorizationStatus {
        self.lock().status
    }

    pub fn pending(&self) -> Vec<NotificationRequest> {
        self.lock().pending.values().cloned().collect()
    }

    pub fn pending_request(&self, id: &str) -> Option<NotificationRequest> {
        self.lock().pending.get(id).cloned()
    }

    /// Ids of every successful schedule call, in order.
    pub fn scheduled_log(&self) -> Vec<String> {
        self.lock().scheduled_log.clone()
    }

    pub fn cancelled_delivered(&self) -> Vec<String> {
        self.lock().cancelled_delivered.clone()
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.lock().pending.keys().cloned().collect()
    }
}

#[async_trait]
impl NotificationCenter for RecordingCenter {
    async fn authorization_status(&self) -> AuthorizationStatus {
        self.status()
    }

    async fn request_authorization(&self, _options: AuthorizationOptions) -> Result<bool> {
        let mut inner = self.lock();
        inner.status = if inner.grant_on_request {
            AuthorizationStatus::Authorized
        } else {
            AuthorizationStatus::Denied
        };
        Ok(inner.grant_on_request)
    }

    async fn schedule(&self, request: NotificationRequest) -> Result<()> {
        let mut inner = self.lock();
        if inner.fail_schedule {
            return Err(CarlogError::Notification(format!(
                "Simulated schedule failure for {}",
                request.id
            )));
        }
        inner.scheduled_log.push(request.id.clone());
        inner.pending.insert(request.id.clone(), request);
        Ok(())
    }

    async fn cancel_pending(&self, ids: &[String]) -> Result<()> {
        let mut inner = self.lock();
        for id in ids {
            inner.pending.remove(id);
        }
        Ok(())
    }

    async fn cancel_delivered(&self, ids: &[String]) -> Result<()> {
        self.lock().cancelled_delivered.extend(ids.iter().cloned());
        Ok(())
    }
}
