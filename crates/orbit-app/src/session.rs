use uuid::Uuid;

/// Supplies the identity of the current actor, or none for anonymous
/// reads. Authentication itself lives outside this layer.
pub trait ViewerSession {
    fn current_viewer(&self) -> Option<Uuid>;
}

/// No signed-in viewer.
pub struct Anonymous;

impl ViewerSession for Anonymous {
    fn current_viewer(&self) -> Option<Uuid> {
        None
    }
}

/// A session with a fixed signed-in viewer.
pub struct SignedIn(pub Uuid);

impl ViewerSession for SignedIn {
    fn current_viewer(&self) -> Option<Uuid> {
        Some(self.0)
    }
}
