use std::sync::Arc;
use tokio::sync::RwLock;

/// Current session credential. Signing in and out happens elsewhere; this
/// only carries the bearer token to the requests that need it.
#[derive(Clone, Default)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
}

impl Session {
    pub fn new(token: Option<String>) -> Self {
        let token = token.filter(|t| !t.trim().is_empty());
        Self {
            token: Arc::new(RwLock::new(token)),
        }
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    pub async fn clear(&self) {
        *self.token.write().await = None;
    }

    /// `Bearer <token>`, if signed in.
    pub async fn authorization(&self) -> Option<String> {
        self.token().await.map(|t| format!("Bearer {t}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blank_token_counts_as_signed_out() {
        let session = Session::new(Some("  ".to_string()));
        assert!(session.token().await.is_none());
        assert!(session.authorization().await.is_none());
    }

    #[tokio::test]
    async fn set_and_clear() {
        let session = Session::default();
        session.set_token("abc").await;
        assert_eq!(session.authorization().await.as_deref(), Some("Bearer abc"));
        session.clear().await;
        assert!(session.token().await.is_none());
    }
}
