use chrono::{DateTime, Utc};

/// A participant's permission to persist engagement samples.
///
/// Absent consent is the default; nothing is recorded until it is granted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Consent {
    granted_at: Option<DateTime<Utc>>,
}

impl Consent {
    pub fn granted(at: DateTime<Utc>) -> Self {
        Self {
            granted_at: Some(at),
        }
    }

    pub fn withdraw(&mut self) {
        self.granted_at = None;
    }

    pub fn is_given(&self) -> bool {
        self.granted_at.is_some()
    }

    pub fn granted_at(&self) -> Option<DateTime<Utc>> {
        self.granted_at
    }
}
