use sift_types::{FocusTarget, SessionRequest};
use tokio::sync::mpsc;
use tracing::debug;

/// Cloneable handle plugins use to drive the session that owns them.
///
/// Requests are queued and applied by the router after the current
/// operation returns, so a plugin may call these from inside `search` or
/// `activate` without re-entering the router.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionRequest>,
}

impl SessionHandle {
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, request: SessionRequest) {
        if let Err(e) = self.tx.send(request) {
            debug!("Session closed, dropping request: {:?}", e.0);
        }
    }

    pub fn open(&self, text: impl Into<String>) {
        self.send(SessionRequest::Open { text: text.into() });
    }

    pub fn close(&self) {
        self.send(SessionRequest::Close);
    }

    pub fn focus(&self, target: FocusTarget) {
        self.send(SessionRequest::Focus { target });
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.send(SessionRequest::SetText { text: text.into() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_arrive_in_order() {
        let (session, mut rx) = SessionHandle::channel();
        session.set_text("abc");
        session.focus(FocusTarget::Entry);
        session.close();

        assert_eq!(
            rx.try_recv().unwrap(),
            SessionRequest::SetText {
                text: "abc".to_string()
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionRequest::Focus {
                target: FocusTarget::Entry
            }
        );
        assert_eq!(rx.try_recv().unwrap(), SessionRequest::Close);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_after_receiver_dropped_is_silent() {
        let (session, rx) = SessionHandle::channel();
        drop(rx);
        session.open("");
    }
}
