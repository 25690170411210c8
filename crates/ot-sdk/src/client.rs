//! Client synchronization state machine.
//!
//! Keeps at most one operation in flight: edits made while waiting for the
//! server's acknowledgement are composed into a buffer and sent once the
//! outstanding operation is confirmed. Operations arriving from the server
//! are transformed past whatever is still pending locally.

use crate::error::{Result, SdkError};
use ot_core::{Operation, OperationalTransform};
use tracing::debug;

/// The two things the state machine asks of its surroundings.
pub trait Collaborator<O> {
    /// Ship an operation to the server.
    fn send_operation(&mut self, operation: &O) -> Result<()>;

    /// Apply an operation coming from the server to the local document.
    fn apply_operation(&mut self, operation: &O) -> Result<()>;
}

/// Where the client stands with respect to the server.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientState<O = Operation> {
    /// Nothing sent that has not been acknowledged.
    Synchronized,
    /// One operation (the outstanding one) awaits acknowledgement.
    AwaitingConfirm(O),
    /// An outstanding operation awaits acknowledgement, and local edits made
    /// since are buffered.
    AwaitingWithBuffer(O, O),
}

impl<O: OperationalTransform> ClientState<O> {
    pub fn is_synchronized(&self) -> bool {
        matches!(self, ClientState::Synchronized)
    }

    pub fn is_awaiting_confirm(&self) -> bool {
        matches!(self, ClientState::AwaitingConfirm(_))
    }

    pub fn is_awaiting_with_buffer(&self) -> bool {
        matches!(self, ClientState::AwaitingWithBuffer(..))
    }

    /// The operation sent but not yet acknowledged, if any.
    pub fn outstanding(&self) -> Option<&O> {
        match self {
            ClientState::Synchronized => None,
            ClientState::AwaitingConfirm(outstanding)
            | ClientState::AwaitingWithBuffer(outstanding, _) => Some(outstanding),
        }
    }

    /// Local edits held back until the outstanding operation is confirmed.
    pub fn buffer(&self) -> Option<&O> {
        match self {
            ClientState::AwaitingWithBuffer(_, buffer) => Some(buffer),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClientState::Synchronized => "synchronized",
            ClientState::AwaitingConfirm(_) => "awaiting-confirm",
            ClientState::AwaitingWithBuffer(..) => "awaiting-with-buffer",
        }
    }

    /// The state after the user made `operation`.
    pub fn apply_client<C: Collaborator<O>>(
        &self,
        collaborator: &mut C,
        operation: O,
    ) -> Result<ClientState<O>> {
        match self {
            ClientState::Synchronized => {
                collaborator.send_operation(&operation)?;
                Ok(ClientState::AwaitingConfirm(operation))
            }
            ClientState::AwaitingConfirm(outstanding) => Ok(ClientState::AwaitingWithBuffer(
                outstanding.clone(),
                operation,
            )),
            ClientState::AwaitingWithBuffer(outstanding, buffer) => Ok(
                ClientState::AwaitingWithBuffer(outstanding.clone(), buffer.compose(&operation)?),
            ),
        }
    }

    /// The state after the server delivered `operation` from another client.
    pub fn apply_server<C: Collaborator<O>>(
        &self,
        collaborator: &mut C,
        operation: &O,
    ) -> Result<ClientState<O>> {
        match self {
            ClientState::Synchronized => {
                collaborator.apply_operation(operation)?;
                Ok(ClientState::Synchronized)
            }
            ClientState::AwaitingConfirm(outstanding) => {
                let (outstanding_prime, operation_prime) = outstanding.transform(operation)?;
                collaborator.apply_operation(&operation_prime)?;
                Ok(ClientState::AwaitingConfirm(outstanding_prime))
            }
            ClientState::AwaitingWithBuffer(outstanding, buffer) => {
                let (outstanding_prime, operation1) = outstanding.transform(operation)?;
                let (buffer_prime, operation2) = buffer.transform(&operation1)?;
                collaborator.apply_operation(&operation2)?;
                Ok(ClientState::AwaitingWithBuffer(outstanding_prime, buffer_prime))
            }
        }
    }

    /// The state after the server acknowledged the outstanding operation.
    pub fn server_ack<C: Collaborator<O>>(&self, collaborator: &mut C) -> Result<ClientState<O>> {
        match self {
            ClientState::Synchronized => Err(no_outstanding("acknowledgement")),
            ClientState::AwaitingConfirm(_) => Ok(ClientState::Synchronized),
            ClientState::AwaitingWithBuffer(_, buffer) => {
                collaborator.send_operation(buffer)?;
                Ok(ClientState::AwaitingConfirm(buffer.clone()))
            }
        }
    }

    /// The state after the server asked for the outstanding operation again.
    pub fn server_retry<C: Collaborator<O>>(&self, collaborator: &mut C) -> Result<ClientState<O>> {
        match self {
            ClientState::Synchronized => Err(no_outstanding("retry")),
            ClientState::AwaitingConfirm(outstanding) => {
                collaborator.send_operation(outstanding)?;
                Ok(self.clone())
            }
            ClientState::AwaitingWithBuffer(outstanding, buffer) => {
                let merged = outstanding.compose(buffer)?;
                collaborator.send_operation(&merged)?;
                Ok(ClientState::AwaitingConfirm(merged))
            }
        }
    }
}

fn no_outstanding(event: &str) -> SdkError {
    SdkError::PreconditionViolation(format!(
        "server {} received with no outstanding operation",
        event
    ))
}

/// Owns a [`ClientState`] and swaps it on every successful transition.
///
/// A failed transition leaves the state as it was.
#[derive(Clone, Debug)]
pub struct Client<O = Operation> {
    state: ClientState<O>,
}

impl<O: OperationalTransform> Default for Client<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: OperationalTransform> Client<O> {
    pub fn new() -> Self {
        Self {
            state: ClientState::Synchronized,
        }
    }

    pub fn state(&self) -> &ClientState<O> {
        &self.state
    }

    pub fn is_synchronized(&self) -> bool {
        self.state.is_synchronized()
    }

    pub fn is_awaiting_confirm(&self) -> bool {
        self.state.is_awaiting_confirm()
    }

    pub fn is_awaiting_with_buffer(&self) -> bool {
        self.state.is_awaiting_with_buffer()
    }

    /// Handle a local edit.
    pub fn apply_client<C: Collaborator<O>>(
        &mut self,
        collaborator: &mut C,
        operation: O,
    ) -> Result<()> {
        let next = self.state.apply_client(collaborator, operation)?;
        self.transition("local edit", next);
        Ok(())
    }

    /// Handle an operation from another client, in server order.
    pub fn apply_server<C: Collaborator<O>>(
        &mut self,
        collaborator: &mut C,
        operation: &O,
    ) -> Result<()> {
        let next = self.state.apply_server(collaborator, operation)?;
        self.transition("remote operation", next);
        Ok(())
    }

    /// Handle the server's acknowledgement of the outstanding operation.
    pub fn server_ack<C: Collaborator<O>>(&mut self, collaborator: &mut C) -> Result<()> {
        let next = self.state.server_ack(collaborator)?;
        self.transition("ack", next);
        Ok(())
    }

    /// Handle the server's request to resend the outstanding operation.
    pub fn server_retry<C: Collaborator<O>>(&mut self, collaborator: &mut C) -> Result<()> {
        let next = self.state.server_retry(collaborator)?;
        self.transition("retry", next);
        Ok(())
    }

    fn transition(&mut self, event: &'static str, next: ClientState<O>) {
        if self.state.name() != next.name() {
            debug!(event, from = self.state.name(), to = next.name(), "client state transition");
        }
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records everything the state machine asks for.
    #[derive(Default)]
    struct Recorder {
        sent: Vec<Operation>,
        applied: Vec<Operation>,
        fail_sends: bool,
    }

    impl Collaborator<Operation> for Recorder {
        fn send_operation(&mut self, operation: &Operation) -> Result<()> {
            if self.fail_sends {
                return Err(SdkError::Database("offline".to_string()));
            }
            self.sent.push(operation.clone());
            Ok(())
        }

        fn apply_operation(&mut self, operation: &Operation) -> Result<()> {
            self.applied.push(operation.clone());
            Ok(())
        }
    }

    fn insert_at(at: usize, text: &str, len: usize) -> Operation {
        let mut op = Operation::new();
        op.retain(at).insert(text).retain(len - at);
        op
    }

    #[test]
    fn test_send_buffer_ack_sequence() {
        let mut client = Client::new();
        let mut recorder = Recorder::default();

        let op1 = insert_at(0, "a", 0);
        let op2 = insert_at(1, "b", 1);

        client.apply_client(&mut recorder, op1.clone()).unwrap();
        assert_eq!(client.state(), &ClientState::AwaitingConfirm(op1.clone()));
        assert_eq!(recorder.sent, vec![op1.clone()]);

        client.apply_client(&mut recorder, op2.clone()).unwrap();
        assert_eq!(
            client.state(),
            &ClientState::AwaitingWithBuffer(op1.clone(), op2.clone())
        );
        assert_eq!(recorder.sent.len(), 1);

        client.server_ack(&mut recorder).unwrap();
        assert_eq!(client.state(), &ClientState::AwaitingConfirm(op2.clone()));
        assert_eq!(recorder.sent, vec![op1, op2]);

        client.server_ack(&mut recorder).unwrap();
        assert!(client.is_synchronized());
    }

    #[test]
    fn test_buffer_composes_local_edits() {
        let mut client = Client::new();
        let mut recorder = Recorder::default();

        client.apply_client(&mut recorder, insert_at(0, "a", 0)).unwrap();
        client.apply_client(&mut recorder, insert_at(1, "b", 1)).unwrap();
        client.apply_client(&mut recorder, insert_at(2, "c", 2)).unwrap();

        let buffer = client.state().buffer().unwrap();
        assert_eq!(buffer.apply("a").unwrap(), "abc");
    }

    #[test]
    fn test_remote_operation_while_synchronized() {
        let mut client = Client::new();
        let mut recorder = Recorder::default();

        let remote = insert_at(0, "r", 0);
        client.apply_server(&mut recorder, &remote).unwrap();

        assert!(client.is_synchronized());
        assert_eq!(recorder.applied, vec![remote]);
    }

    #[test]
    fn test_remote_operation_transforms_outstanding_and_buffer() {
        let mut client = Client::new();
        let mut recorder = Recorder::default();

        // Document "xy": local "A" at 0 (sent), then "B" at 3 (buffered).
        client.apply_client(&mut recorder, insert_at(0, "A", 2)).unwrap();
        client.apply_client(&mut recorder, insert_at(3, "B", 3)).unwrap();

        // Server delivers "R" inserted at 1 by someone else.
        let remote = insert_at(1, "R", 2);
        client.apply_server(&mut recorder, &remote).unwrap();

        // Locally "AxyB" -> "AxRyB".
        let applied = &recorder.applied[0];
        assert_eq!(applied.apply("AxyB").unwrap(), "AxRyB");

        // The server has "xRy"; outstanding then buffer must produce "AxRyB".
        let outstanding = client.state().outstanding().unwrap().clone();
        let buffer = client.state().buffer().unwrap().clone();
        let after_outstanding = outstanding.apply("xRy").unwrap();
        assert_eq!(buffer.apply(&after_outstanding).unwrap(), "AxRyB");
    }

    #[test]
    fn test_retry_resends() {
        let mut client = Client::new();
        let mut recorder = Recorder::default();

        let op1 = insert_at(0, "a", 0);
        client.apply_client(&mut recorder, op1.clone()).unwrap();
        client.server_retry(&mut recorder).unwrap();

        assert_eq!(recorder.sent, vec![op1.clone(), op1.clone()]);
        assert_eq!(client.state(), &ClientState::AwaitingConfirm(op1));
    }

    #[test]
    fn test_retry_with_buffer_merges() {
        let mut client = Client::new();
        let mut recorder = Recorder::default();

        client.apply_client(&mut recorder, insert_at(0, "a", 0)).unwrap();
        client.apply_client(&mut recorder, insert_at(1, "b", 1)).unwrap();
        client.server_retry(&mut recorder).unwrap();

        let merged = recorder.sent.last().unwrap();
        assert_eq!(merged.apply("").unwrap(), "ab");
        assert_eq!(client.state(), &ClientState::AwaitingConfirm(merged.clone()));
    }

    #[test]
    fn test_ack_without_outstanding_is_rejected() {
        let mut client: Client = Client::new();
        let mut recorder = Recorder::default();

        assert!(matches!(
            client.server_ack(&mut recorder),
            Err(SdkError::PreconditionViolation(_))
        ));
        assert!(matches!(
            client.server_retry(&mut recorder),
            Err(SdkError::PreconditionViolation(_))
        ));
        assert!(client.is_synchronized());
    }

    #[test]
    fn test_failed_send_keeps_state() {
        let mut client = Client::new();
        let mut recorder = Recorder {
            fail_sends: true,
            ..Default::default()
        };

        assert!(client.apply_client(&mut recorder, insert_at(0, "a", 0)).is_err());
        assert!(client.is_synchronized());
    }

    #[test]
    fn test_mismatched_remote_operation_keeps_state() {
        let mut client = Client::new();
        let mut recorder = Recorder::default();

        client.apply_client(&mut recorder, insert_at(0, "a", 2)).unwrap();
        let before = client.state().clone();

        let bogus = insert_at(0, "r", 5);
        assert!(client.apply_server(&mut recorder, &bogus).is_err());
        assert_eq!(client.state(), &before);
        assert!(recorder.applied.is_empty());
    }
}
