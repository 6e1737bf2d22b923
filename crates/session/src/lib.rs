//! `fleetwise-session` — session state, identity resolution, and access gating.
//!
//! The session is the single process-wide association between the running
//! application and the current actor. Every consumer goes through
//! [`SessionResolver`]; nothing reads the backing identity store directly.

pub mod gate;
pub mod resolver;
pub mod store;

pub use gate::{AccessGate, GateDecision, GateState, Navigator, decide};
pub use resolver::{SessionResolver, SessionSubscription, SignInError};
pub use store::{
    Actor, Credential, IdentityStore, InMemoryIdentityStore, InvalidCredentialError,
    ResolutionError,
};
