use alloc::vec::Vec;
use core::fmt::{Debug, Formatter};

use log::{debug, info, warn};

use crate::config::command;
use crate::descriptors::AttributeHandle;
use crate::gatt_connection::ConnectionId;
use crate::mtu::Mtu;
use crate::stack::{GattInterface, StackRequest};

/// The command interpreter behind the UART channel.
///
/// `on_result` is expected to be called with the response text before `execute` returns; a
/// call that never produces a result simply yields no notification.
pub trait CommandExecutor {
  fn execute(&mut self, command: &[u8], on_result: &mut dyn FnMut(&[u8]));
}

impl<F> CommandExecutor for F
where
  F: FnMut(&[u8], &mut dyn FnMut(&[u8])),
{
  fn execute(&mut self, command: &[u8], on_result: &mut dyn FnMut(&[u8])) {
    (self)(command, on_result)
  }
}

/// Most recent executor output, newline terminated, waiting to be pushed to the peer.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingResponse(Vec<u8>);

impl PendingResponse {
  fn from_result(result: &[u8]) -> Self {
    let mut buf = Vec::with_capacity(result.len() + 1);
    buf.extend_from_slice(result);
    buf.push(b'\n');
    Self(buf)
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }

  pub fn into_bytes(self) -> Vec<u8> {
    self.0
  }
}

impl Debug for PendingResponse {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    write!(f, "PendingResponse({:?})", Text(&self.0))
  }
}

/// Whether a write carries a command at all: prepared writes and very short payloads do not.
pub fn is_command_write(is_prepare: bool, value: &[u8]) -> bool {
  !is_prepare && value.len() >= command::MIN_LENGTH
}

/// The command text is the payload up to its first NUL, if any.
pub fn command_text(value: &[u8]) -> &[u8] {
  value
    .iter()
    .position(|&b| b == 0)
    .map_or(value, |end| &value[..end])
}

/// Where a command's response has to go.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TxRoute {
  pub interface: GattInterface,
  pub conn_id: ConnectionId,
  pub handle: AttributeHandle,
  pub mtu: Mtu,
}

/// Runs commands written to RX and turns each result into one TX notification.
pub struct CommandExchange<E> {
  executor: E,
  pending: Option<PendingResponse>,
}

impl<E: CommandExecutor> CommandExchange<E> {
  pub fn new(executor: E) -> Self {
    Self {
      executor,
      pending: None,
    }
  }

  pub fn executor(&self) -> &E {
    &self.executor
  }

  /// Execute `value` and build the notification carrying the result.  Returns `None` when the
  /// executor produced nothing.
  pub fn execute(&mut self, value: &[u8], route: TxRoute) -> Option<StackRequest> {
    let command = command_text(value);

    let pending = &mut self.pending;
    self.executor.execute(command, &mut |result: &[u8]| {
      if pending.is_some() {
        debug!("Executor replaced an earlier result");
      }
      *pending = Some(PendingResponse::from_result(result));
    });

    // Taking the slot here is the single release point of the response buffer: it moves into the
    // request and is dropped once submitted.
    let Some(response) = self.pending.take() else {
      warn!("Bluetooth: {:?} produced no result, nothing to notify", Text(command));
      return None;
    };
    info!("Bluetooth: {:?} => {:?}", Text(command), response);

    if !route.mtu.fits(response.as_bytes().len()) {
      warn!(
        "Response of {} bytes exceeds usable MTU {} and will be truncated",
        response.as_bytes().len(),
        route.mtu.usable_value()
      );
    }

    Some(StackRequest::SendIndication {
      interface: route.interface,
      conn_id: route.conn_id,
      handle: route.handle,
      payload: response.into_bytes(),
      need_confirmation: false,
    })
  }

  pub fn has_pending(&self) -> bool {
    self.pending.is_some()
  }
}

impl<E> Debug for CommandExchange<E> {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("CommandExchange")
      .field("pending", &self.pending)
      .finish_non_exhaustive()
  }
}

/// Debug rendering of command text that falls back to raw bytes.
struct Text<'a>(&'a [u8]);

impl Debug for Text<'_> {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    match core::str::from_utf8(self.0) {
      Ok(s) => write!(f, "{s:?}"),
      Err(_) => write!(f, "{:02x?}", self.0),
    }
  }
}

#[cfg(test)]
mod tests {
  extern crate std;

  use alloc::vec;
  use std::cell::RefCell;
  use std::rc::Rc;

  use super::*;

  fn route() -> TxRoute {
    TxRoute {
      interface: GattInterface(3),
      conn_id: ConnectionId(7),
      handle: AttributeHandle::new(44).unwrap(),
      mtu: Mtu::new(500),
    }
  }

  #[test]
  fn test_is_command_write() {
    assert!(!is_command_write(false, b"ON"));
    assert!(is_command_write(false, b"ON\0"));
    assert!(!is_command_write(true, b"STATUS"));
  }

  #[test]
  fn test_command_text_stops_at_nul() {
    assert_eq!(command_text(b"ON\0junk"), b"ON");
    assert_eq!(command_text(b"STATUS"), b"STATUS");
  }

  #[test]
  fn test_result_notified_with_newline() {
    let seen = Rc::new(RefCell::new(vec![]));
    let log = seen.clone();
    let mut exchange = CommandExchange::new(move |cmd: &[u8], on_result: &mut dyn FnMut(&[u8])| {
      log.borrow_mut().push(cmd.to_vec());
      on_result(b"light on");
    });

    let request = exchange.execute(b"ON\0", route());

    assert_eq!(seen.borrow().as_slice(), [b"ON".to_vec()]);
    assert_eq!(
      request,
      Some(StackRequest::SendIndication {
        interface: GattInterface(3),
        conn_id: ConnectionId(7),
        handle: AttributeHandle::new(44).unwrap(),
        payload: b"light on\n".to_vec(),
        need_confirmation: false,
      })
    );
    assert!(!exchange.has_pending());
  }

  #[test]
  fn test_no_result_no_notification() {
    let mut exchange = CommandExchange::new(|_: &[u8], _: &mut dyn FnMut(&[u8])| {});

    assert_eq!(exchange.execute(b"NOP", route()), None);
    assert!(!exchange.has_pending());
  }

  #[test]
  fn test_last_result_wins() {
    let mut exchange = CommandExchange::new(|_: &[u8], on_result: &mut dyn FnMut(&[u8])| {
      on_result(b"first");
      on_result(b"second");
    });

    match exchange.execute(b"TWICE", route()) {
      Some(StackRequest::SendIndication { payload, .. }) => assert_eq!(payload, b"second\n"),
      other => panic!("unexpected {other:?}"),
    }
  }
}
