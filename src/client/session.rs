use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
struct SessionState {
    token: String,
    user_id: Option<Uuid>,
}

/// Authentication context shared by every view. Clones share one state:
/// set at login or signup, read by each authenticated call, cleared at logout.
#[derive(Debug, Clone, Default)]
pub struct Session {
    inner: Arc<RwLock<Option<SessionState>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<SessionState>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<SessionState>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Starts a session with a freshly issued token. The user id is not
    /// known until [`Session::set_user`].
    pub fn begin(&self, token: String) {
        *self.write() = Some(SessionState { token, user_id: None });
        debug!("session started");
    }

    /// No-op when signed out.
    pub fn set_user(&self, user_id: Uuid) {
        if let Some(state) = self.write().as_mut() {
            state.user_id = Some(user_id);
        }
    }

    pub fn end(&self) {
        if self.write().take().is_some() {
            debug!("session ended");
        }
    }

    pub fn token(&self) -> Option<String> {
        self.read().as_ref().map(|s| s.token.clone())
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.read().as_ref().and_then(|s| s.user_id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_one_lifecycle() {
        let session = Session::new();
        let view = session.clone();
        assert!(!view.is_authenticated());

        session.begin("tok".into());
        let id = Uuid::new_v4();
        session.set_user(id);
        assert!(view.is_authenticated());
        assert_eq!(view.token().as_deref(), Some("tok"));
        assert_eq!(view.user_id(), Some(id));

        view.end();
        assert!(!session.is_authenticated());
        assert_eq!(session.user_id(), None);
    }

    #[test]
    fn user_is_ignored_without_a_token() {
        let session = Session::new();
        session.set_user(Uuid::new_v4());
        assert_eq!(session.user_id(), None);
    }

    #[test]
    fn new_token_forgets_previous_user() {
        let session = Session::new();
        session.begin("a".into());
        session.set_user(Uuid::new_v4());
        session.begin("b".into());
        assert_eq!(session.user_id(), None);
    }
}
