//! Transient toast notifications

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    pub expires_at: Instant,
}

/// Toasts dismiss themselves once `ttl` has elapsed
#[derive(Debug)]
pub struct Toasts {
    items: Vec<Toast>,
    ttl: Duration,
}

impl Toasts {
    pub fn new(ttl: Duration) -> Self {
        Self { items: Vec::new(), ttl }
    }

    pub fn set_ttl(&mut self, ttl: Duration) {
        self.ttl = ttl;
    }

    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>, now: Instant) {
        self.items.push(Toast {
            kind,
            message: message.into(),
            expires_at: now + self.ttl,
        });
    }

    /// Drop expired toasts
    pub fn prune(&mut self, now: Instant) {
        self.items.retain(|t| t.expires_at > now);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Time until the next toast expires, for scheduling a repaint
    pub fn next_expiry(&self, now: Instant) -> Option<Duration> {
        self.items
            .iter()
            .map(|t| t.expires_at.saturating_duration_since(now))
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toasts_expire() {
        let start = Instant::now();
        let mut toasts = Toasts::new(Duration::from_secs(3));
        toasts.push(ToastKind::Success, "Included 2 contents", start);
        toasts.push(ToastKind::Error, "HTTP error: 500", start + Duration::from_secs(2));

        toasts.prune(start + Duration::from_secs(1));
        assert_eq!(toasts.len(), 2);

        toasts.prune(start + Duration::from_secs(3));
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts.iter().next().unwrap().kind, ToastKind::Error);

        toasts.prune(start + Duration::from_secs(6));
        assert!(toasts.is_empty());
    }

    #[test]
    fn test_next_expiry() {
        let start = Instant::now();
        let mut toasts = Toasts::new(Duration::from_secs(3));
        assert_eq!(toasts.next_expiry(start), None);
        toasts.push(ToastKind::Success, "ok", start);
        assert_eq!(toasts.next_expiry(start + Duration::from_secs(1)), Some(Duration::from_secs(2)));
    }
}
