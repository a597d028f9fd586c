use core::fmt::{Display, Formatter};
use core::time::Duration;

use log::{debug, info, warn};

use crate::bluetooth_address::BluetoothAddress;
use crate::bluetooth_error::BluetoothError;
use crate::config::duration_to_units;
use crate::mtu::Mtu;
use crate::stack::{GattInterface, StackRequest};

const CONN_INTERVAL_UNIT_US: u64 = 1250;
const SUPERVISION_TIMEOUT_UNIT_US: u64 = 10_000;

/// Stack-assigned identifier of a GATT connection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u16);

impl Display for ConnectionId {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Link-layer connection parameters, either proposed by us or reported by the controller.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
  pub interval_min: Duration,
  pub interval_max: Duration,

  /// Connection events the peripheral may skip.
  pub latency: u16,

  pub supervision_timeout: Duration,
}

impl ConnectionParams {
  /// Interval bounds in 1.25 ms units, as the controller expects them.
  pub fn interval_units(&self) -> (u16, u16) {
    (
      duration_to_units(self.interval_min, CONN_INTERVAL_UNIT_US),
      duration_to_units(self.interval_max, CONN_INTERVAL_UNIT_US),
    )
  }

  /// Supervision timeout in 10 ms units.
  pub fn timeout_units(&self) -> u16 {
    duration_to_units(self.supervision_timeout, SUPERVISION_TIMEOUT_UNIT_US)
  }
}

/// The one connection this peripheral serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSession {
  pub conn_id: ConnectionId,
  pub peer: BluetoothAddress,

  /// Proposed parameters until the controller reports what it actually applied.
  pub params: ConnectionParams,

  /// Interface all sends for this session are routed through.
  pub interface: GattInterface,

  pub mtu: Mtu,

  /// Set once a local disconnect has been requested, so repeated closes stay silent.
  pub close_requested: bool,
}

/// Single-slot holder for the active [ConnectionSession].
#[derive(Debug, Default)]
pub struct SessionSlot {
  active: Option<ConnectionSession>,
}

impl SessionSlot {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn active(&self) -> Option<&ConnectionSession> {
    self.active.as_ref()
  }

  pub fn is_active(&self, conn_id: ConnectionId) -> bool {
    self.active.as_ref().is_some_and(|s| s.conn_id == conn_id)
  }

  /// Open a session for a new link and propose our preferred parameters.  A second link while
  /// one is active is refused by closing it; the active session is left untouched.
  pub fn on_connect(
    &mut self,
    conn_id: ConnectionId,
    peer: BluetoothAddress,
    interface: GattInterface,
    preferred: ConnectionParams,
  ) -> StackRequest {
    if let Some(active) = &self.active {
      warn!(
        "Rejecting connection {conn_id} from {peer}: already serving {} ({})",
        active.conn_id, active.peer
      );
      return StackRequest::CloseConnection { interface, conn_id };
    }

    info!("Client {peer} connected (conn_id={conn_id})");
    self.active = Some(ConnectionSession {
      conn_id,
      peer,
      params: preferred,
      interface,
      mtu: Mtu::default(),
      close_requested: false,
    });
    StackRequest::UpdateConnectionParams {
      peer,
      params: preferred,
    }
  }

  /// Clears the session if `conn_id` is the active one.  Returns whether advertising should be
  /// re-armed, which is the case unless another session is still being served.
  pub fn on_disconnect(&mut self, conn_id: ConnectionId, reason: BluetoothError) -> bool {
    match &self.active {
      Some(active) if active.conn_id != conn_id => {
        debug!("Rejected connection {conn_id} went away: {reason}");
        false
      }
      Some(_) => {
        info!("Bluetooth disconnected (conn_id={conn_id}): {reason}");
        self.active = None;
        true
      }
      None => {
        info!("Bluetooth disconnected (conn_id={conn_id}, no session): {reason}");
        true
      }
    }
  }

  pub fn on_mtu_changed(&mut self, conn_id: ConnectionId, mtu: Mtu) {
    match self.active.as_mut() {
      Some(session) if session.conn_id == conn_id => {
        info!("MTU changed on {conn_id}: mtu={mtu}");
        session.mtu = mtu;
      }
      _ => debug!("Ignoring MTU {mtu} for inactive connection {conn_id}"),
    }
  }

  pub fn on_params_updated(&mut self, peer: BluetoothAddress, params: ConnectionParams) {
    match self.active.as_mut() {
      Some(session) if session.peer == peer => {
        debug!("Connection parameters for {peer}: {params:?}");
        session.params = params;
      }
      _ => debug!("Ignoring parameter update for {peer}"),
    }
  }

  /// Request a local disconnect of the active session.  A no-op without one, and after the
  /// first call until the disconnect event arrives.
  pub fn close(&mut self) -> Option<StackRequest> {
    let session = self.active.as_mut()?;
    if session.close_requested {
      return None;
    }
    session.close_requested = true;
    Some(StackRequest::CloseConnection {
      interface: session.interface,
      conn_id: session.conn_id,
    })
  }
}
