//! Process-wide session: current actor, sign-in/sign-out, subscriptions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use thiserror::Error;

use crate::store::{Actor, Credential, IdentityStore, ResolutionError};

/// Sign-in failure.
///
/// A failed attempt never alters existing session state: an already
/// signed-in actor stays signed in.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignInError {
    #[error("invalid credentials")]
    InvalidCredential,

    /// The credential resolved, but the account is deactivated.
    /// Deactivated actors are treated as unauthenticated.
    #[error("account is deactivated")]
    AccountInactive,
}

type Callback = Arc<dyn Fn(Option<&Actor>) + Send + Sync>;

struct SessionShared {
    store: Arc<dyn IdentityStore>,
    current: RwLock<Option<Actor>>,
    subscribers: Mutex<Vec<(u64, Callback)>>,
    next_subscriber_id: AtomicU64,
    /// Serializes sign-in/sign-out/refresh so subscribers observe a
    /// monotonically consistent sequence of session states.
    transition: Mutex<()>,
}

impl SessionShared {
    /// Replace the current actor and notify all subscribers.
    ///
    /// Caller must hold the `transition` lock. Callbacks are cloned out of
    /// the registry before invocation so a callback may subscribe or
    /// unsubscribe without deadlocking.
    fn transition_to(&self, next: Option<Actor>) {
        {
            let mut current = match self.current.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *current = next.clone();
        }

        let callbacks: Vec<Callback> = match self.subscribers.lock() {
            Ok(subs) => subs.iter().map(|(_, cb)| cb.clone()).collect(),
            Err(_) => Vec::new(),
        };
        for callback in callbacks {
            callback(next.as_ref());
        }
    }

    fn remove_subscriber(&self, id: u64) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|(sub_id, _)| *sub_id != id);
        }
    }
}

/// The current-actor value every consumer depends on.
///
/// Wraps an [`IdentityStore`] with explicit lifecycle (sign-in/sign-out) and
/// an observer interface. Consumers never read the storage mechanism
/// directly; they either query [`current_actor`](SessionResolver::current_actor)
/// or subscribe for transitions.
#[derive(Clone)]
pub struct SessionResolver {
    shared: Arc<SessionShared>,
}

impl SessionResolver {
    /// Build a resolver over `store`, resuming any persisted session.
    ///
    /// A store failure during resumption is logged and treated as "no
    /// actor"; it does not fail construction.
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        let resumed = match store.current_actor() {
            Ok(actor) => actor,
            Err(err) => {
                tracing::warn!(error = %err, "session resume failed, starting unauthenticated");
                None
            }
        };

        Self {
            shared: Arc::new(SessionShared {
                store,
                current: RwLock::new(resumed),
                subscribers: Mutex::new(Vec::new()),
                next_subscriber_id: AtomicU64::new(1),
                transition: Mutex::new(()),
            }),
        }
    }

    /// The current actor, or `None` when unauthenticated.
    ///
    /// Never fails for "no session".
    pub fn current_actor(&self) -> Option<Actor> {
        match self.shared.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Re-read the backing store and notify subscribers of the result.
    ///
    /// Bridges stores whose state can change underneath us (e.g. a shared
    /// persisted session). A [`ResolutionError`] leaves the session
    /// untouched and is returned for an optional transient notice.
    pub fn refresh(&self) -> Result<Option<Actor>, ResolutionError> {
        let _guard = self.lock_transitions();
        let actor = self.shared.store.current_actor()?;
        self.shared.transition_to(actor.clone());
        Ok(actor)
    }

    /// Authenticate `credential` and establish the session.
    ///
    /// Subscribers observe the new actor before this returns, so a caller
    /// that signs in and immediately re-queries never sees a stale value.
    pub fn sign_in(&self, credential: &Credential) -> Result<Actor, SignInError> {
        let _guard = self.lock_transitions();

        let actor = self
            .shared
            .store
            .authenticate(credential)
            .map_err(|_| SignInError::InvalidCredential)?;

        if !actor.is_active() {
            tracing::info!(email = %actor.email, "sign-in rejected: account deactivated");
            return Err(SignInError::AccountInactive);
        }

        tracing::info!(email = %actor.email, role = %actor.role, "signed in");
        self.shared.transition_to(Some(actor.clone()));
        Ok(actor)
    }

    /// Tear the session down. Idempotent: signing out while signed out is
    /// not an error. Subscribers are notified with `None`.
    pub fn sign_out(&self) {
        let _guard = self.lock_transitions();
        if self.current_actor().is_some() {
            tracing::info!("signed out");
        }
        self.shared.transition_to(None);
    }

    /// Subscribe to session transitions.
    ///
    /// `on_change` is invoked immediately with the current state (so
    /// dependents never render a stale frame), and again on every
    /// transition until the returned subscription is dropped or
    /// unsubscribed.
    pub fn subscribe(
        &self,
        on_change: impl Fn(Option<&Actor>) + Send + Sync + 'static,
    ) -> SessionSubscription {
        // Registration and the initial delivery are atomic with respect to
        // transitions, so the subscriber cannot miss or double-see a state.
        let _guard = self.lock_transitions();

        let id = self.shared.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let callback: Callback = Arc::new(on_change);

        if let Ok(mut subs) = self.shared.subscribers.lock() {
            subs.push((id, callback.clone()));
        }

        callback(self.current_actor().as_ref());

        SessionSubscription {
            shared: Arc::downgrade(&self.shared),
            id,
        }
    }

    fn lock_transitions(&self) -> std::sync::MutexGuard<'_, ()> {
        match self.shared.transition.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Handle to an active subscription.
///
/// `unsubscribe` is idempotent; dropping the handle unsubscribes too.
pub struct SessionSubscription {
    shared: Weak<SessionShared>,
    id: u64,
}

impl SessionSubscription {
    pub fn unsubscribe(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.remove_subscriber(self.id);
        }
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryIdentityStore;
    use fleetwise_auth::{Role, UserStatus};
    use fleetwise_core::UserId;
    use std::sync::atomic::AtomicUsize;

    fn directory() -> Arc<InMemoryIdentityStore> {
        let store = Arc::new(InMemoryIdentityStore::new());
        store.insert(
            Actor {
                id: UserId::new(),
                email: "admin@fleetwise.example".to_string(),
                role: Role::Admin,
                status: UserStatus::Active,
            },
            "password",
        );
        store.insert(
            Actor {
                id: UserId::new(),
                email: "driver@fleetwise.example".to_string(),
                role: Role::Driver,
                status: UserStatus::Active,
            },
            "password",
        );
        store.insert(
            Actor {
                id: UserId::new(),
                email: "inactive@fleetwise.example".to_string(),
                role: Role::Mechanic,
                status: UserStatus::Inactive,
            },
            "password",
        );
        store
    }

    fn credential(email: &str) -> Credential {
        Credential {
            email: email.to_string(),
            password: "password".to_string(),
        }
    }

    #[test]
    fn sign_in_is_immediately_visible() {
        let resolver = SessionResolver::new(directory());

        let actor = resolver
            .sign_in(&credential("admin@fleetwise.example"))
            .unwrap();

        // No stale-read window after sign-in.
        assert_eq!(resolver.current_actor(), Some(actor));
    }

    #[test]
    fn failed_sign_in_keeps_existing_session() {
        let resolver = SessionResolver::new(directory());
        resolver
            .sign_in(&credential("admin@fleetwise.example"))
            .unwrap();

        let err = resolver
            .sign_in(&Credential {
                email: "admin@fleetwise.example".to_string(),
                password: "wrong".to_string(),
            })
            .unwrap_err();
        assert_eq!(err, SignInError::InvalidCredential);

        let still = resolver.current_actor().unwrap();
        assert_eq!(still.email, "admin@fleetwise.example");
    }

    #[test]
    fn inactive_actor_cannot_sign_in() {
        let resolver = SessionResolver::new(directory());

        let err = resolver
            .sign_in(&credential("inactive@fleetwise.example"))
            .unwrap_err();
        assert_eq!(err, SignInError::AccountInactive);
        assert_eq!(resolver.current_actor(), None);
    }

    #[test]
    fn sign_out_is_idempotent() {
        let resolver = SessionResolver::new(directory());
        resolver
            .sign_in(&credential("driver@fleetwise.example"))
            .unwrap();

        resolver.sign_out();
        assert_eq!(resolver.current_actor(), None);

        // Second sign-out is not an error and the state is unchanged.
        resolver.sign_out();
        assert_eq!(resolver.current_actor(), None);
    }

    #[test]
    fn subscriber_gets_immediate_and_transition_deliveries() {
        let resolver = SessionResolver::new(directory());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_cb = seen.clone();
        let _sub = resolver.subscribe(move |actor| {
            seen_cb
                .lock()
                .unwrap()
                .push(actor.map(|a| a.email.clone()));
        });

        resolver
            .sign_in(&credential("admin@fleetwise.example"))
            .unwrap();
        resolver.sign_out();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                None,
                Some("admin@fleetwise.example".to_string()),
                None,
            ]
        );
    }

    #[test]
    fn unsubscribe_is_idempotent_and_scoped() {
        let resolver = SessionResolver::new(directory());

        let a_count = Arc::new(AtomicUsize::new(0));
        let b_count = Arc::new(AtomicUsize::new(0));

        let a_inner = a_count.clone();
        let sub_a = resolver.subscribe(move |_| {
            a_inner.fetch_add(1, Ordering::SeqCst);
        });
        let b_inner = b_count.clone();
        let _sub_b = resolver.subscribe(move |_| {
            b_inner.fetch_add(1, Ordering::SeqCst);
        });

        sub_a.unsubscribe();
        sub_a.unsubscribe(); // second call is a no-op

        resolver
            .sign_in(&credential("driver@fleetwise.example"))
            .unwrap();

        // a: immediate delivery only; b: immediate + transition.
        assert_eq!(a_count.load(Ordering::SeqCst), 1);
        assert_eq!(b_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn resume_failure_starts_unauthenticated() {
        let store = directory();
        store.set_unreachable(true);

        let resolver = SessionResolver::new(store.clone());
        assert_eq!(resolver.current_actor(), None);

        // Once the store is reachable again, refresh picks the session up.
        store.set_unreachable(false);
        store.set_resumable(Some(Actor {
            id: UserId::new(),
            email: "admin@fleetwise.example".to_string(),
            role: Role::Admin,
            status: UserStatus::Active,
        }));
        let resumed = resolver.refresh().unwrap();
        assert!(resumed.is_some());
        assert_eq!(resolver.current_actor(), resumed);
    }
}
