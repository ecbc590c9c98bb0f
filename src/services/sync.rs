use serde::Serialize;

/// How a store currently relates to its remote mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// No remote mirror configured.
    LocalOnly,
    /// Last remote call succeeded.
    Online,
    /// Last remote call failed; reads may be served from sample data.
    Degraded,
}

/// Mode plus the transient, dismissible error shown in the UI banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub mode: SyncMode,
    pub error: Option<String>,
}

impl SyncStatus {
    pub fn new(has_remote: bool) -> Self {
        Self {
            mode: if has_remote {
                SyncMode::Online
            } else {
                SyncMode::LocalOnly
            },
            error: None,
        }
    }

    pub(crate) fn remote_succeeded(&mut self) {
        self.mode = SyncMode::Online;
    }

    pub(crate) fn remote_failed(&mut self, message: impl Into<String>) {
        self.mode = SyncMode::Degraded;
        self.error = Some(message.into());
    }

    pub(crate) fn local_failed(&mut self, message: String) {
        self.error = Some(message);
    }

    pub(crate) fn clear_error(&mut self) {
        self.error = None;
    }
}

/// Result of a remote-aware read: the data plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<T> {
    pub data: T,
    pub sync: SyncStatus,
    /// True when `data` is the built-in sample set rather than real records.
    pub from_sample: bool,
}
