// Bearer credential slot and the 401 interceptor contract.
//
// The token is a single process-wide value: concurrent writers are
// last-write-wins, readers take a cheap `Arc` snapshot per request.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use secrecy::SecretString;

/// Holds the bearer token attached to every outgoing request.
#[derive(Default)]
pub struct Credential {
    token: ArcSwapOption<SecretString>,
}

impl Credential {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current token.
    pub fn set(&self, token: SecretString) {
        self.token.store(Some(Arc::new(token)));
    }

    /// Snapshot of the current token, if any.
    pub fn get(&self) -> Option<Arc<SecretString>> {
        self.token.load_full()
    }

    pub fn is_present(&self) -> bool {
        self.token.load().is_some()
    }

    /// Drop the token. Returns `true` only if a token was actually held,
    /// so callers can tell a real teardown from a repeated one.
    pub fn clear(&self) -> bool {
        self.token.swap(None).is_some()
    }

    /// Drop the token only if it is still `token`. Returns `false` when the
    /// slot is empty or holds a newer token.
    pub fn clear_if(&self, token: &Arc<SecretString>) -> bool {
        let expected = Some(Arc::clone(token));
        let previous = self.token.compare_and_swap(&expected, None::<Arc<SecretString>>);
        matches!(&*previous, Some(held) if Arc::ptr_eq(held, token))
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("present", &self.is_present())
            .finish()
    }
}

/// Hook invoked by the request layer after a 401 has cleared the token.
///
/// Called at most once per held token: a 401 for a request sent without a
/// token, or with a token that has since been cleared or replaced, is
/// ignored.
pub trait ResponseInterceptor: Send + Sync {
    fn on_unauthorized(&self);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn clear_if_only_drops_the_matching_token() {
        let credential = Credential::new();
        credential.set(SecretString::from("old".to_owned()));
        let old = credential.get().unwrap();

        credential.set(SecretString::from("new".to_owned()));
        assert!(!credential.clear_if(&old));
        assert_eq!(credential.get().unwrap().expose_secret(), "new");

        let new = credential.get().unwrap();
        assert!(credential.clear_if(&new));
        assert!(!credential.is_present());
        assert!(!credential.clear_if(&new));
    }
}
