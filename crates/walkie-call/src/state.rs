//! The call state machine.
//!
//! One explicit enum, one pure transition function. Every user action and
//! every inbound call-control message goes through [`apply`]; the returned
//! [`Transition`] carries the next state plus the effects the caller must
//! execute (send a control message, start negotiating, tear down). Inputs
//! that are not valid in the current state produce an empty transition, so
//! stray or duplicate messages can never corrupt the call.
//!
//! Offerer selection: the side that RECEIVES `call-accept` (the original
//! caller) creates the SDP offer. The accepting side sends `call-accept`
//! and answers the offer when it arrives. A duplicate `call-accept`
//! delivered while already `Connected` is a no-op, so at most one offer is
//! ever generated per accepted call.

/// Lifecycle of a 1:1 call. Initial state is `Idle`; every path cycles back
/// to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallState {
    #[default]
    Idle,
    /// Caller awaiting the remote accept.
    Calling,
    /// Callee awaiting the local accept/decline decision.
    Receiving,
    Connected,
}

/// Everything that can drive the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallInput {
    /// User requests a call.
    Request,
    /// User accepts an incoming call.
    Accept,
    /// User declines an incoming call.
    Decline,
    /// User cancels an outgoing call attempt.
    Cancel,
    /// User hangs up.
    End,
    /// Received `call-request` from the remote peer.
    RemoteRequest,
    /// Received `call-accept` from the remote peer.
    RemoteAccept,
    /// Received `call-end` from the remote peer.
    RemoteEnd,
    /// The signaling channel closed. Equivalent to a call end.
    ChannelClosed,
}

/// Side effects the caller must execute after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    SendCallRequest,
    SendCallAccept,
    SendCallEnd,
    /// Begin peer negotiation as the offerer.
    StartOfferer,
    /// Tear down the peer session and clear call-scoped state.
    Teardown,
}

/// Result of applying one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: CallState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(next: CallState, effects: Vec<Effect>) -> Self {
        Self { next, effects }
    }

    fn stay(state: CallState) -> Self {
        Self {
            next: state,
            effects: Vec::new(),
        }
    }

    /// True when the input was ignored.
    pub fn is_noop(&self, from: CallState) -> bool {
        self.next == from && self.effects.is_empty()
    }
}

/// Apply one input to the current state.
pub fn apply(state: CallState, input: CallInput) -> Transition {
    use CallInput as In;
    use CallState as St;
    use Effect as Fx;

    match (state, input) {
        // Channel loss ends whatever was in flight.
        (_, In::ChannelClosed) => Transition::to(St::Idle, vec![Fx::Teardown]),

        (St::Idle, In::Request) => Transition::to(St::Calling, vec![Fx::SendCallRequest]),
        (St::Idle, In::RemoteRequest) => Transition::to(St::Receiving, vec![]),

        (St::Receiving, In::Accept) => Transition::to(St::Connected, vec![Fx::SendCallAccept]),
        (St::Receiving, In::Decline) => Transition::to(St::Idle, vec![Fx::Teardown]),

        (St::Calling, In::RemoteAccept) => Transition::to(St::Connected, vec![Fx::StartOfferer]),
        (St::Calling, In::Cancel) => Transition::to(St::Idle, vec![Fx::Teardown]),

        (St::Connected, In::End) => {
            Transition::to(St::Idle, vec![Fx::SendCallEnd, Fx::Teardown])
        }
        (St::Connected, In::RemoteEnd) => Transition::to(St::Idle, vec![Fx::Teardown]),

        // A remote hang-up before the call connected also resets.
        (St::Calling | St::Receiving, In::RemoteEnd) => {
            Transition::to(St::Idle, vec![Fx::Teardown])
        }

        // Everything else is out of place in the current state: ignore.
        (state, _) => Transition::stay(state),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CallInput as In;
    use CallState as St;
    use Effect as Fx;

    #[test]
    fn caller_happy_path() {
        let t = apply(St::Idle, In::Request);
        assert_eq!(t.next, St::Calling);
        assert_eq!(t.effects, vec![Fx::SendCallRequest]);

        let t = apply(St::Calling, In::RemoteAccept);
        assert_eq!(t.next, St::Connected);
        assert_eq!(t.effects, vec![Fx::StartOfferer]);

        let t = apply(St::Connected, In::End);
        assert_eq!(t.next, St::Idle);
        assert_eq!(t.effects, vec![Fx::SendCallEnd, Fx::Teardown]);
    }

    #[test]
    fn callee_happy_path() {
        let t = apply(St::Idle, In::RemoteRequest);
        assert_eq!(t.next, St::Receiving);
        assert!(t.effects.is_empty());

        // The acceptor does not offer; it sends the accept and waits.
        let t = apply(St::Receiving, In::Accept);
        assert_eq!(t.next, St::Connected);
        assert_eq!(t.effects, vec![Fx::SendCallAccept]);

        let t = apply(St::Connected, In::RemoteEnd);
        assert_eq!(t.next, St::Idle);
        assert_eq!(t.effects, vec![Fx::Teardown]);
    }

    #[test]
    fn decline_and_cancel_reset_to_idle() {
        let t = apply(St::Receiving, In::Decline);
        assert_eq!(t.next, St::Idle);
        assert_eq!(t.effects, vec![Fx::Teardown]);

        let t = apply(St::Calling, In::Cancel);
        assert_eq!(t.next, St::Idle);
        assert_eq!(t.effects, vec![Fx::Teardown]);
    }

    #[test]
    fn channel_close_resets_from_every_state() {
        for state in [St::Idle, St::Calling, St::Receiving, St::Connected] {
            let t = apply(state, In::ChannelClosed);
            assert_eq!(t.next, St::Idle);
            assert_eq!(t.effects, vec![Fx::Teardown]);
        }
    }

    #[test]
    fn duplicate_accept_is_ignored_once_connected() {
        let t = apply(St::Connected, In::RemoteAccept);
        assert!(t.is_noop(St::Connected));
    }

    #[test]
    fn offer_trigger_appears_exactly_once_on_accept_receipt() {
        // Only Calling + RemoteAccept yields StartOfferer; no other
        // state/input pair does.
        let inputs = [
            In::Request,
            In::Accept,
            In::Decline,
            In::Cancel,
            In::End,
            In::RemoteRequest,
            In::RemoteAccept,
            In::RemoteEnd,
            In::ChannelClosed,
        ];
        let states = [St::Idle, St::Calling, St::Receiving, St::Connected];

        let mut offer_triggers = 0;
        for state in states {
            for input in inputs {
                if apply(state, input).effects.contains(&Fx::StartOfferer) {
                    assert_eq!((state, input), (St::Calling, In::RemoteAccept));
                    offer_triggers += 1;
                }
            }
        }
        assert_eq!(offer_triggers, 1);
    }

    #[test]
    fn connected_requires_an_accept() {
        // Exhaustive: the only ways into Connected are Receiving+Accept and
        // Calling+RemoteAccept.
        let inputs = [
            In::Request,
            In::Accept,
            In::Decline,
            In::Cancel,
            In::End,
            In::RemoteRequest,
            In::RemoteAccept,
            In::RemoteEnd,
            In::ChannelClosed,
        ];
        for state in [St::Idle, St::Calling, St::Receiving, St::Connected] {
            for input in inputs {
                let t = apply(state, input);
                if t.next == St::Connected && state != St::Connected {
                    assert!(
                        (state, input) == (St::Receiving, In::Accept)
                            || (state, input) == (St::Calling, In::RemoteAccept),
                        "unexpected path into Connected: {state:?} + {input:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn arbitrary_action_sequences_never_reach_invalid_pairs() {
        // Drive the machine through every sequence of user/remote actions up
        // to depth 4 and check the reachable-set invariants hold.
        let inputs = [
            In::Request,
            In::Accept,
            In::Decline,
            In::Cancel,
            In::End,
            In::RemoteRequest,
            In::RemoteAccept,
            In::RemoteEnd,
        ];

        fn walk(state: St, inputs: &[In], depth: usize) {
            if depth == 0 {
                return;
            }
            for &input in inputs {
                let t = apply(state, input);
                // Teardown must accompany every drop out of Connected.
                if state == St::Connected && t.next == St::Idle {
                    assert!(t.effects.contains(&Fx::Teardown));
                }
                // SendCallAccept only ever leaves Receiving.
                if t.effects.contains(&Fx::SendCallAccept) {
                    assert_eq!(state, St::Receiving);
                }
                walk(t.next, inputs, depth - 1);
            }
        }

        walk(St::Idle, &inputs, 4);
    }

    #[test]
    fn remote_end_before_connect_resets() {
        assert_eq!(apply(St::Calling, In::RemoteEnd).next, St::Idle);
        assert_eq!(apply(St::Receiving, In::RemoteEnd).next, St::Idle);
        // But in Idle there is nothing to end.
        assert!(apply(St::Idle, In::RemoteEnd).is_noop(St::Idle));
    }
}
