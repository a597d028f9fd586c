use alloc::vec::Vec;

use heapless::spsc::Consumer;
use log::{error, trace};

use crate::config::PeripheralConfig;
use crate::exchange::CommandExecutor;
use crate::gatt_server::GattServer;
use crate::gatt_server_cb::{GattServerCallback, StackEvent};
use crate::stack::{BleStack, StackRequest};

/// Single-consumer queue for handing stack events from callback context to the task that owns
/// the [Peripheral].  Holds `N - 1` events.
pub type EventQueue<const N: usize> = heapless::spsc::Queue<StackEvent, N>;

/// Drives a [GattServer] against a concrete [BleStack].
///
/// All handlers run on whichever context calls [Peripheral::on_event] or [Peripheral::drain];
/// they are not reentrant, so stack adapters that receive callbacks on another thread must go
/// through an [EventQueue].
#[derive(Debug)]
pub struct Peripheral<S, E> {
  stack: S,
  server: GattServer<E>,
}

impl<S: BleStack, E: CommandExecutor> Peripheral<S, E> {
  pub fn new(stack: S, config: PeripheralConfig, executor: E) -> Self {
    Self {
      stack,
      server: GattServer::new(config, executor),
    }
  }

  /// Submit the bring-up requests.  The rest of the setup is driven by stack events.
  pub fn start(&mut self) -> usize {
    let requests = self.server.start();
    self.submit(requests)
  }

  /// Disconnect the active peer, if any.
  pub fn close(&mut self) -> usize {
    let requests = self.server.close();
    self.submit(requests)
  }

  /// Handle every queued event in order.  Returns the number of events handled.
  pub fn drain<const N: usize>(&mut self, events: &mut Consumer<'_, StackEvent, N>) -> usize {
    let mut handled = 0;
    while let Some(event) = events.dequeue() {
      self.on_event(event);
      handled += 1;
    }
    handled
  }

  pub fn server(&self) -> &GattServer<E> {
    &self.server
  }

  pub fn stack(&self) -> &S {
    &self.stack
  }

  pub fn stack_mut(&mut self) -> &mut S {
    &mut self.stack
  }

  /// Submit `requests` in order.  A refused request is logged and skipped; the remaining ones
  /// are still submitted.  Returns the number of refused requests.
  fn submit(&mut self, requests: Vec<StackRequest>) -> usize {
    let mut failures = 0;
    for request in requests {
      let name = request.name();
      trace!("submit: {request:?}");
      if let Err(e) = request.submit_to(&mut self.stack) {
        error!("{name} failed: {e:?}");
        failures += 1;
      }
    }
    failures
  }
}

impl<S: BleStack, E: CommandExecutor> GattServerCallback for Peripheral<S, E> {
  fn on_event(&mut self, event: StackEvent) {
    trace!("event: {event:?}");
    let requests = self.server.handle_event(event);
    self.submit(requests);
  }
}
