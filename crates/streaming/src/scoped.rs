use std::ops::{Deref, DerefMut};

use kafka_admin_broker::ConsumerSession;

/// Owns a consumer session and closes it when dropped.
///
/// Dropping covers every way a delivery policy can end, including the
/// surrounding future being cancelled mid-pull.
#[derive(Debug)]
pub struct ScopedSession<S: ConsumerSession> {
    session: S,
}

impl<S: ConsumerSession> ScopedSession<S> {
    /// Takes ownership of an open session.
    pub const fn new(session: S) -> Self {
        Self { session }
    }
}

impl<S: ConsumerSession> Deref for ScopedSession<S> {
    type Target = S;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl<S: ConsumerSession> DerefMut for ScopedSession<S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.session
    }
}

impl<S: ConsumerSession> Drop for ScopedSession<S> {
    fn drop(&mut self) {
        self.session.close();
    }
}
