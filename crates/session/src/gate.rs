//! Access gate: the render decision for a protected view.
//!
//! Each protected view mounts one [`AccessGate`]. The gate subscribes to the
//! session, re-enters `Resolving` on every session transition, and settles
//! on one of `Unauthenticated` / `Forbidden` / `Granted`. Unauthenticated
//! triggers a redirect to the sign-in surface (which itself must never be
//! gated, so the redirect cannot loop); Forbidden renders in place with the
//! roles that would have granted access.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use fleetwise_auth::{Requirement, Role};

use crate::resolver::{SessionResolver, SessionSubscription};
use crate::store::Actor;

/// Settled access decision for an actor against a requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Unauthenticated,
    Forbidden { accepted_roles: Vec<Role> },
    Granted,
}

/// Observable gate state, including the transient resolution phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// Identity resolution in flight; render a loading indicator.
    Resolving,
    Unauthenticated,
    Forbidden { accepted_roles: Vec<Role> },
    Granted,
}

impl From<GateDecision> for GateState {
    fn from(decision: GateDecision) -> Self {
        match decision {
            GateDecision::Unauthenticated => GateState::Unauthenticated,
            GateDecision::Forbidden { accepted_roles } => GateState::Forbidden { accepted_roles },
            GateDecision::Granted => GateState::Granted,
        }
    }
}

/// Decide access for `actor` against `requirement`.
///
/// Pure. Unauthenticated takes precedence over Forbidden: with no actor, or
/// a deactivated one (deactivated actors count as unauthenticated), the
/// requirement is not even consulted.
pub fn decide(actor: Option<&Actor>, requirement: &Requirement) -> GateDecision {
    let Some(actor) = actor else {
        return GateDecision::Unauthenticated;
    };
    if !actor.is_active() {
        return GateDecision::Unauthenticated;
    }
    if requirement.allows(actor.role) {
        GateDecision::Granted
    } else {
        GateDecision::Forbidden {
            accepted_roles: requirement.accepted_roles().to_vec(),
        }
    }
}

/// Navigation side-effect sink.
///
/// The gate never renders the sign-in surface itself; it asks the navigator
/// to go there.
pub trait Navigator: Send + Sync {
    fn redirect_to_sign_in(&self);
}

struct GateInner {
    requirement: Requirement,
    navigator: Arc<dyn Navigator>,
    on_state: Box<dyn Fn(&GateState) + Send + Sync>,
    state: Mutex<GateState>,
    mounted: AtomicBool,
}

impl GateInner {
    fn emit(&self, next: GateState) {
        {
            let mut state = match self.state.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *state = next.clone();
        }
        (self.on_state)(&next);
    }

    fn on_session_change(&self, actor: Option<&Actor>) {
        // A torn-down view must see no further updates or navigation.
        if !self.mounted.load(Ordering::SeqCst) {
            return;
        }

        let was_unauthenticated = matches!(
            *match self.state.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            },
            GateState::Unauthenticated
        );

        // Every re-resolution shows the loading phase, even a fast one, so
        // dependents never flash the previous decision's content.
        self.emit(GateState::Resolving);

        let decision = decide(actor, &self.requirement);
        let is_unauthenticated = decision == GateDecision::Unauthenticated;
        let redirect = is_unauthenticated && !was_unauthenticated;
        self.emit(decision.into());

        if redirect {
            tracing::debug!("access gate redirecting to sign-in");
            self.navigator.redirect_to_sign_in();
        }
    }
}

/// Gate instance for one mounted protected view.
pub struct AccessGate {
    inner: Arc<GateInner>,
    subscription: SessionSubscription,
}

impl AccessGate {
    /// Mount a gate over `resolver` for a view guarded by `requirement`.
    ///
    /// `on_state` receives every state the view should render, starting with
    /// `Resolving`, then the settled decision, then again for each session
    /// transition while mounted.
    pub fn mount(
        resolver: &SessionResolver,
        requirement: Requirement,
        navigator: Arc<dyn Navigator>,
        on_state: impl Fn(&GateState) + Send + Sync + 'static,
    ) -> Self {
        let inner = Arc::new(GateInner {
            requirement,
            navigator,
            on_state: Box::new(on_state),
            state: Mutex::new(GateState::Resolving),
            mounted: AtomicBool::new(true),
        });

        let callback_inner = inner.clone();
        let subscription = resolver.subscribe(move |actor| {
            callback_inner.on_session_change(actor);
        });

        Self {
            inner,
            subscription,
        }
    }

    /// Current state, for pull-based rendering.
    pub fn state(&self) -> GateState {
        match self.inner.state.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Tear the gate down.
    ///
    /// Any session change that lands after this is a no-op for this
    /// instance: no state update, no navigation. Idempotent.
    pub fn unmount(&self) {
        self.inner.mounted.store(false, Ordering::SeqCst);
        self.subscription.unsubscribe();
    }
}

impl Drop for AccessGate {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::SessionResolver;
    use crate::store::{Credential, InMemoryIdentityStore};
    use fleetwise_auth::UserStatus;
    use fleetwise_core::UserId;
    use std::sync::atomic::AtomicUsize;

    struct RecordingNavigator {
        redirects: AtomicUsize,
    }

    impl RecordingNavigator {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                redirects: AtomicUsize::new(0),
            })
        }

        fn count(&self) -> usize {
            self.redirects.load(Ordering::SeqCst)
        }
    }

    impl Navigator for RecordingNavigator {
        fn redirect_to_sign_in(&self) {
            self.redirects.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn directory() -> Arc<InMemoryIdentityStore> {
        let store = Arc::new(InMemoryIdentityStore::new());
        for (email, role) in [
            ("admin@fleetwise.example", Role::Admin),
            ("driver@fleetwise.example", Role::Driver),
        ] {
            store.insert(
                Actor {
                    id: UserId::new(),
                    email: email.to_string(),
                    role,
                    status: UserStatus::Active,
                },
                "password",
            );
        }
        store
    }

    fn credential(email: &str) -> Credential {
        Credential {
            email: email.to_string(),
            password: "password".to_string(),
        }
    }

    fn states_log() -> (Arc<Mutex<Vec<GateState>>>, impl Fn(&GateState) + Send + Sync) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        (log, move |state: &GateState| {
            sink.lock().unwrap().push(state.clone());
        })
    }

    #[test]
    fn anonymous_visit_redirects_exactly_once() {
        let resolver = SessionResolver::new(directory());
        let navigator = RecordingNavigator::new();
        let (log, sink) = states_log();

        let gate = AccessGate::mount(
            &resolver,
            Requirement::any_authenticated(),
            navigator.clone(),
            sink,
        );

        assert_eq!(gate.state(), GateState::Unauthenticated);
        assert_eq!(navigator.count(), 1);
        assert_eq!(
            *log.lock().unwrap(),
            vec![GateState::Resolving, GateState::Unauthenticated]
        );

        // Repeated null notifications must not re-redirect (no loop).
        resolver.sign_out();
        assert_eq!(navigator.count(), 1);
    }

    #[test]
    fn role_mismatch_is_forbidden_in_place() {
        let resolver = SessionResolver::new(directory());
        resolver
            .sign_in(&credential("driver@fleetwise.example"))
            .unwrap();

        let navigator = RecordingNavigator::new();
        let (_log, sink) = states_log();
        let gate = AccessGate::mount(
            &resolver,
            Requirement::roles([Role::Admin, Role::Manager]),
            navigator.clone(),
            sink,
        );

        assert_eq!(
            gate.state(),
            GateState::Forbidden {
                accepted_roles: vec![Role::Admin, Role::Manager],
            }
        );
        // Forbidden renders in place, never redirects.
        assert_eq!(navigator.count(), 0);
    }

    #[test]
    fn granted_after_sign_in_and_resolving_between_transitions() {
        let resolver = SessionResolver::new(directory());
        let navigator = RecordingNavigator::new();
        let (log, sink) = states_log();

        let gate = AccessGate::mount(
            &resolver,
            Requirement::roles([Role::Admin]),
            navigator.clone(),
            sink,
        );
        assert_eq!(gate.state(), GateState::Unauthenticated);

        resolver
            .sign_in(&credential("admin@fleetwise.example"))
            .unwrap();
        assert_eq!(gate.state(), GateState::Granted);

        // Every settled state was preceded by a Resolving frame.
        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                GateState::Resolving,
                GateState::Unauthenticated,
                GateState::Resolving,
                GateState::Granted,
            ]
        );
    }

    #[test]
    fn empty_requirement_admits_any_signed_in_role() {
        let resolver = SessionResolver::new(directory());
        resolver
            .sign_in(&credential("driver@fleetwise.example"))
            .unwrap();

        let navigator = RecordingNavigator::new();
        let (_log, sink) = states_log();
        let gate = AccessGate::mount(
            &resolver,
            Requirement::any_authenticated(),
            navigator,
            sink,
        );

        assert_eq!(gate.state(), GateState::Granted);
    }

    #[test]
    fn unmounted_gate_ignores_later_transitions() {
        let resolver = SessionResolver::new(directory());
        let navigator = RecordingNavigator::new();
        let (log, sink) = states_log();

        let gate = AccessGate::mount(
            &resolver,
            Requirement::any_authenticated(),
            navigator.clone(),
            sink,
        );
        let redirects_before = navigator.count();
        gate.unmount();

        resolver
            .sign_in(&credential("admin@fleetwise.example"))
            .unwrap();
        resolver.sign_out();

        // No state emissions, no navigation after teardown.
        assert_eq!(gate.state(), GateState::Unauthenticated);
        assert_eq!(navigator.count(), redirects_before);
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_role() -> impl Strategy<Value = Role> {
            prop::sample::select(Role::ALL.to_vec())
        }

        fn active_actor(role: Role) -> Actor {
            Actor {
                id: UserId::new(),
                email: format!("{role}@fleetwise.example"),
                role,
                status: UserStatus::Active,
            }
        }

        proptest! {
            /// Granted iff requirement empty or role is a member; anonymous
            /// is always Unauthenticated regardless of the requirement.
            #[test]
            fn decision_matches_membership(
                role in any_role(),
                required in prop::collection::vec(any_role(), 0..4),
            ) {
                let requirement = Requirement::roles(required.clone());

                let anonymous = decide(None, &requirement);
                prop_assert_eq!(anonymous, GateDecision::Unauthenticated);

                let actor = active_actor(role);
                let decision = decide(Some(&actor), &requirement);
                if required.is_empty() || required.contains(&role) {
                    prop_assert_eq!(decision, GateDecision::Granted);
                } else {
                    let is_forbidden = matches!(decision, GateDecision::Forbidden { .. });
                    prop_assert!(is_forbidden);
                }
            }

            /// A deactivated actor is unauthenticated, never forbidden.
            #[test]
            fn inactive_actor_is_unauthenticated(
                role in any_role(),
                required in prop::collection::vec(any_role(), 0..4),
            ) {
                let mut actor = active_actor(role);
                actor.status = UserStatus::Inactive;
                let requirement = Requirement::roles(required);
                prop_assert_eq!(
                    decide(Some(&actor), &requirement),
                    GateDecision::Unauthenticated
                );
            }
        }
    }
}
