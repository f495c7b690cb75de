use crate::orders::OrderStatus;

/// Validates order status transitions.
///
/// The forward path is linear: pending → confirmed → preparing → ready →
/// delivered. Cancellation is reachable from any non-terminal state.
/// Delivered and cancelled are terminal.
pub struct StatusMachine;

impl StatusMachine {
    /// Check whether a transition is valid.
    ///
    /// Same-status transitions are accepted as idempotent no-ops so that a
    /// retried admin request does not fail.
    pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        if from == to {
            return true;
        }

        match (from, to) {
            (OrderStatus::Pending, OrderStatus::Confirmed) => true,
            (OrderStatus::Confirmed, OrderStatus::Preparing) => true,
            (OrderStatus::Preparing, OrderStatus::Ready) => true,
            (OrderStatus::Ready, OrderStatus::Delivered) => true,

            // Any non-terminal state can be cancelled.
            (from, OrderStatus::Cancelled) => !from.is_terminal(),

            _ => false,
        }
    }

    /// Attempt a transition, returning the new status or a message
    /// describing why it is illegal.
    pub fn transition(from: OrderStatus, to: OrderStatus) -> Result<OrderStatus, String> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(format!("Invalid status transition from {} to {}", from, to))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path() {
        assert!(StatusMachine::is_valid_transition(
            OrderStatus::Pending,
            OrderStatus::Confirmed
        ));
        assert!(StatusMachine::is_valid_transition(
            OrderStatus::Confirmed,
            OrderStatus::Preparing
        ));
        assert!(StatusMachine::is_valid_transition(
            OrderStatus::Preparing,
            OrderStatus::Ready
        ));
        assert!(StatusMachine::is_valid_transition(
            OrderStatus::Ready,
            OrderStatus::Delivered
        ));
    }

    #[test]
    fn test_cancel_from_non_terminal() {
        for from in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
        ] {
            assert!(StatusMachine::is_valid_transition(
                from,
                OrderStatus::Cancelled
            ));
        }
    }

    #[test]
    fn test_delivered_cannot_be_cancelled() {
        assert!(!StatusMachine::is_valid_transition(
            OrderStatus::Delivered,
            OrderStatus::Cancelled
        ));
    }

    #[test]
    fn test_no_backward_transitions() {
        assert!(!StatusMachine::is_valid_transition(
            OrderStatus::Delivered,
            OrderStatus::Pending
        ));
        assert!(!StatusMachine::is_valid_transition(
            OrderStatus::Confirmed,
            OrderStatus::Pending
        ));
        assert!(!StatusMachine::is_valid_transition(
            OrderStatus::Ready,
            OrderStatus::Preparing
        ));
    }

    #[test]
    fn test_no_skipping_forward() {
        assert!(!StatusMachine::is_valid_transition(
            OrderStatus::Pending,
            OrderStatus::Preparing
        ));
        assert!(!StatusMachine::is_valid_transition(
            OrderStatus::Pending,
            OrderStatus::Delivered
        ));
        assert!(!StatusMachine::is_valid_transition(
            OrderStatus::Confirmed,
            OrderStatus::Ready
        ));
    }

    #[test]
    fn test_cancelled_is_terminal() {
        for to in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivered,
        ] {
            assert!(!StatusMachine::is_valid_transition(
                OrderStatus::Cancelled,
                to
            ));
        }
    }

    #[test]
    fn test_same_status_is_noop() {
        assert!(StatusMachine::is_valid_transition(
            OrderStatus::Preparing,
            OrderStatus::Preparing
        ));
        assert!(StatusMachine::is_valid_transition(
            OrderStatus::Cancelled,
            OrderStatus::Cancelled
        ));
    }

    #[test]
    fn test_transition_result() {
        let ok = StatusMachine::transition(OrderStatus::Pending, OrderStatus::Confirmed);
        assert_eq!(ok.unwrap(), OrderStatus::Confirmed);

        let err = StatusMachine::transition(OrderStatus::Delivered, OrderStatus::Pending);
        assert!(err.unwrap_err().contains("Invalid status transition"));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn order_status_strategy() -> impl Strategy<Value = OrderStatus> {
        prop_oneof![
            Just(OrderStatus::Pending),
            Just(OrderStatus::Confirmed),
            Just(OrderStatus::Preparing),
            Just(OrderStatus::Ready),
            Just(OrderStatus::Delivered),
            Just(OrderStatus::Cancelled),
        ]
    }

    /// Terminal states accept nothing but their own status.
    #[test]
    fn prop_terminal_states_reject_everything() {
        proptest!(|(to in order_status_strategy())| {
            for terminal in [OrderStatus::Delivered, OrderStatus::Cancelled] {
                if to != terminal {
                    prop_assert!(!StatusMachine::is_valid_transition(terminal, to));
                }
            }
        });
    }

    /// Every non-terminal state can be cancelled.
    #[test]
    fn prop_non_terminal_can_cancel() {
        proptest!(|(from in order_status_strategy())| {
            if !from.is_terminal() {
                prop_assert!(StatusMachine::is_valid_transition(from, OrderStatus::Cancelled));
            }
        });
    }

    /// transition() agrees with is_valid_transition().
    #[test]
    fn prop_transition_consistency() {
        proptest!(|(
            from in order_status_strategy(),
            to in order_status_strategy()
        )| {
            let is_valid = StatusMachine::is_valid_transition(from, to);
            let result = StatusMachine::transition(from, to);

            if is_valid {
                prop_assert_eq!(result.unwrap(), to);
            } else {
                prop_assert!(result.is_err());
            }
        });
    }
}
