use std::fmt;

/// Lifecycle phase of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    ClientsStarted,
    Registered,
    RequestsSubmitted,
    AwaitingCompletion,
    Unregistering,
    Terminated,
}

impl Phase {
    /// Allowed transitions. The forward path is strictly sequential; unregistering may
    /// start from any phase after registration, and termination from anywhere.
    pub fn can_transition(self, to: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, to),
            (Created, ClientsStarted)
                | (ClientsStarted, Registered)
                | (Registered, RequestsSubmitted)
                | (RequestsSubmitted, AwaitingCompletion)
                | (Registered | RequestsSubmitted | AwaitingCompletion, Unregistering)
        ) || (to == Terminated && self != Terminated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Created => "created",
            Phase::ClientsStarted => "clients_started",
            Phase::Registered => "registered",
            Phase::RequestsSubmitted => "requests_submitted",
            Phase::AwaitingCompletion => "awaiting_completion",
            Phase::Unregistering => "unregistering",
            Phase::Terminated => "terminated",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Phase::*;

    #[test]
    fn forward_path_is_sequential() {
        assert!(Created.can_transition(ClientsStarted));
        assert!(ClientsStarted.can_transition(Registered));
        assert!(Registered.can_transition(RequestsSubmitted));
        assert!(RequestsSubmitted.can_transition(AwaitingCompletion));
        assert!(AwaitingCompletion.can_transition(Unregistering));
        assert!(Unregistering.can_transition(Terminated));

        assert!(!Created.can_transition(Registered));
        assert!(!Registered.can_transition(AwaitingCompletion));
        assert!(!AwaitingCompletion.can_transition(RequestsSubmitted));
    }

    #[test]
    fn unregister_requires_registration() {
        assert!(!Created.can_transition(Unregistering));
        assert!(!ClientsStarted.can_transition(Unregistering));
        assert!(Registered.can_transition(Unregistering));
    }

    #[test]
    fn terminated_is_final() {
        assert!(ClientsStarted.can_transition(Terminated));
        assert!(!Terminated.can_transition(Terminated));
        assert!(!Terminated.can_transition(Created));
    }
}
