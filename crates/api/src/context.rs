use fleetwise_session::Actor;

/// Authenticated actor context for a request.
///
/// Inserted by the auth middleware after the bearer session token has been
/// resolved against the user directory, so role and status are always the
/// directory's current values, not the values at sign-in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    actor: Actor,
}

impl ActorContext {
    pub fn new(actor: Actor) -> Self {
        Self { actor }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }
}
