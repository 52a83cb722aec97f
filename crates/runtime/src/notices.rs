use std::collections::VecDeque;

use tracing::warn;

/// Notices kept before the oldest are dropped.
pub const DEFAULT_NOTICE_CAPACITY: usize = 64;

/// Category of a user-facing, non-blocking notice.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    SourceFetchFailed,
    ProviderUnavailable,
    GeolocationFailed,
}

impl NoticeKind {
    pub fn label(self) -> &'static str {
        match self {
            NoticeKind::SourceFetchFailed => "source_fetch_failed",
            NoticeKind::ProviderUnavailable => "provider_unavailable",
            NoticeKind::GeolocationFailed => "geolocation_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// 0-based emission order.
    pub sequence: u64,
    pub kind: NoticeKind,
    /// What the notice is about, e.g. the hazard source name.
    pub subject: String,
    pub message: String,
}

/// Error channel for conditions the user should see but that never abort
/// the view. Every notice is also logged.
///
/// Holds at most `capacity` undrained notices; older ones are dropped
/// first. Sequence numbers keep counting across drops and drains.
#[derive(Debug)]
pub struct NoticeBus {
    next_sequence: u64,
    capacity: usize,
    notices: VecDeque<Notice>,
}

impl Default for NoticeBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_NOTICE_CAPACITY)
    }
}

impl NoticeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            next_sequence: 0,
            capacity,
            notices: VecDeque::with_capacity(capacity),
        }
    }

    pub fn emit(
        &mut self,
        kind: NoticeKind,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        let notice = Notice {
            sequence: self.next_sequence,
            kind,
            subject: subject.into(),
            message: message.into(),
        };
        self.next_sequence += 1;
        warn!(
            kind = notice.kind.label(),
            subject = %notice.subject,
            "{}",
            notice.message
        );
        if self.notices.len() == self.capacity {
            self.notices.pop_front();
        }
        self.notices.push_back(notice);
    }

    /// Undrained notices, oldest first.
    pub fn notices(&self) -> impl ExactSizeIterator<Item = &Notice> + '_ {
        self.notices.iter()
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    pub fn count(&self, kind: NoticeKind) -> usize {
        self.notices.iter().filter(|n| n.kind == kind).count()
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{NoticeBus, NoticeKind};

    #[test]
    fn records_notices_in_order() {
        let mut bus = NoticeBus::new();
        bus.emit(NoticeKind::SourceFetchFailed, "seismic", "HTTP 500");
        bus.emit(NoticeKind::GeolocationFailed, "geolocation", "timed out");
        let notices: Vec<_> = bus.notices().collect();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].sequence, 0);
        assert_eq!(notices[1].kind, NoticeKind::GeolocationFailed);
        assert_eq!(bus.count(NoticeKind::SourceFetchFailed), 1);
    }

    #[test]
    fn drain_clears_but_keeps_sequence() {
        let mut bus = NoticeBus::new();
        bus.emit(NoticeKind::ProviderUnavailable, "provider", "billing");
        assert_eq!(bus.drain().len(), 1);
        assert!(bus.is_empty());
        bus.emit(NoticeKind::ProviderUnavailable, "provider", "billing");
        assert_eq!(bus.notices().next().map(|n| n.sequence), Some(1));
    }

    #[test]
    fn oldest_notices_are_dropped_at_capacity() {
        let mut bus = NoticeBus::with_capacity(3);
        for i in 0..5 {
            bus.emit(NoticeKind::SourceFetchFailed, "flood", format!("attempt {i}"));
        }
        assert_eq!(bus.len(), 3);
        let sequences: Vec<u64> = bus.notices().map(|n| n.sequence).collect();
        assert_eq!(sequences, vec![2, 3, 4]);
    }
}
