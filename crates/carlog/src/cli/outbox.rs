//! Terminal notification centre.
//!
//! A terminal has no notification daemon, so the CLI keeps an outbox in
//! `notifications.json` inside the data directory. Scheduled requests stay
//! pending there; immediate ones are delivered by printing them once, which is
//! why they land in `delivered` instead.

use async_trait::async_trait;
use carlogapp::error::{CarlogError, Result};
use carlogapp::reminders::notify::AuthorizationOptions;
use carlogapp::reminders::{AuthorizationStatus, FireSpec, NotificationCenter, NotificationRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub const OUTBOX_FILE: &str = "notifications.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutboxState {
    status: AuthorizationStatus,
    #[serde(default)]
    pending: BTreeMap<String, NotificationRequest>,
    #[serde(default)]
    delivered: BTreeMap<String, NotificationRequest>,
}

impl Default for OutboxState {
    fn default() -> Self {
        Self {
            // Printing to our own terminal needs nobody's permission.
            status: AuthorizationStatus::Authorized,
            pending: BTreeMap::new(),
            delivered: BTreeMap::new(),
        }
    }
}

pub struct FileOutbox {
    path: PathBuf,
    state: Mutex<OutboxState>,
    /// Immediate alerts delivered during this run, to be printed.
    fresh: Mutex<Vec<NotificationRequest>>,
}

impl FileOutbox {
    pub fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(OUTBOX_FILE);
        let state = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            OutboxState::default()
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
            fresh: Mutex::new(Vec::new()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, OutboxState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn save(&self, state: &OutboxState) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_vec_pretty(state)?;
        fs::write(&self.path, content).map_err(|e| {
            CarlogError::Notification(format!("{}: {}", self.path.display(), e))
        })
    }

    pub fn pending(&self) -> Vec<NotificationRequest> {
        self.lock().pending.values().cloned().collect()
    }

    /// Immediate alerts delivered since the outbox was opened.
    pub fn take_fresh(&self) -> Vec<NotificationRequest> {
        let mut fresh = self
            .fresh
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *fresh)
    }
}

#[async_trait]
impl NotificationCenter for FileOutbox {
    async fn authorization_status(&self) -> AuthorizationStatus {
        self.lock().status
    }

    async fn request_authorization(&self, _options: AuthorizationOptions) -> Result<bool> {
        let mut state = self.lock();
        state.status = AuthorizationStatus::Authorized;
        self.save(&state)?;
        Ok(true)
    }

    async fn schedule(&self, request: NotificationRequest) -> Result<()> {
        let mut state = self.lock();
        if request.fire == FireSpec::Immediate {
            state.delivered.insert(request.id.clone(), request.clone());
            self.fresh
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(request);
        } else {
            state.pending.insert(request.id.clone(), request);
        }
        self.save(&state)
    }

    async fn cancel_pending(&self, ids: &[String]) -> Result<()> {
        let mut state = self.lock();
        for id in ids {
            state.pending.remove(id);
        }
        self.save(&state)
    }

    async fn cancel_delivered(&self, ids: &[String]) -> Result<()> {
        let mut state = self.lock();
        for id in ids {
            state.delivered.remove(id);
        }
        self.save(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carlogapp::reminders::notify::NotificationContent;

    fn request(id: &str, fire: FireSpec) -> NotificationRequest {
        NotificationRequest {
            id: id.to_string(),
            fire,
            content: NotificationContent {
                title: "Oil change".into(),
                body: "Due in 400 km".into(),
                thread_id: "maintenance.x".into(),
            },
        }
    }

    #[tokio::test]
    async fn test_outbox_persists_pending() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = FileOutbox::open(dir.path()).unwrap();
        outbox
            .schedule(request("a", FireSpec::After { seconds: 60 }))
            .await
            .unwrap();
        outbox
            .schedule(request("b", FireSpec::Immediate))
            .await
            .unwrap();

        assert_eq!(outbox.take_fresh().len(), 1);
        assert!(outbox.take_fresh().is_empty());

        let reopened = FileOutbox::open(dir.path()).unwrap();
        let pending: Vec<String> = reopened.pending().into_iter().map(|r| r.id).collect();
        assert_eq!(pending, vec!["a".to_string()]);

        reopened.cancel_pending(&["a".to_string()]).await.unwrap();
        assert!(FileOutbox::open(dir.path()).unwrap().pending().is_empty());
    }
}
