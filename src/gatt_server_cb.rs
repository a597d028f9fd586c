use alloc::vec::Vec;

use crate::bluetooth_address::BluetoothAddress;
use crate::bluetooth_error::BluetoothError;
use crate::descriptors::{AttributeHandle, UUID};
use crate::error::{StackError, StackStatus};
use crate::gatt_connection::{ConnectionId, ConnectionParams};
use crate::mtu::Mtu;
use crate::stack::GattInterface;

/// Receiver of stack events.  The stack adapter must call this from one context at a time.
pub trait GattServerCallback {
  fn on_event(&mut self, event: StackEvent);
}

/// Everything the stack delivers, split by the handler it is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEvent {
  Gap(GapEvent),

  /// `interface` is `None` for events the stack broadcasts to every registered application.
  Gatt {
    interface: Option<GattInterface>,
    event: GattServerEvent,
  },
}

impl StackEvent {
  pub fn gatt(interface: GattInterface, event: GattServerEvent) -> Self {
    Self::Gatt {
      interface: Some(interface),
      event,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GapEvent {
  /// Raw advertising payload upload completed.
  AdvertisingDataSet { status: StackStatus },

  /// Raw scan response payload upload completed.
  ScanResponseDataSet { status: StackStatus },

  AdvertisingStarted { status: StackStatus },
  AdvertisingStopped { status: StackStatus },

  /// The controller applied (or refused) a connection parameter update.
  ConnectionParamsUpdated {
    status: StackStatus,
    peer: BluetoothAddress,
    params: ConnectionParams,
  },

  /// Event the stack defines but this peripheral has no handler for.
  Unknown { code: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GattServerEvent {
  /// Application registration completed; `interface` on the enclosing [StackEvent] is the one
  /// the stack assigned.
  Registered { status: StackStatus, app_id: u16 },

  ReadRequest {
    conn_id: ConnectionId,
    trans_id: u32,
    handle: AttributeHandle,
  },

  WriteRequest {
    conn_id: ConnectionId,
    trans_id: u32,
    handle: AttributeHandle,
    offset: u16,

    /// The peer expects a write response (as opposed to write-without-response).
    need_response: bool,

    /// Part of a prepared write sequence committed later by [GattServerEvent::ExecuteWrite].
    is_prepare: bool,

    value: Vec<u8>,
  },

  /// Commit or cancel of a prepared write sequence.
  ExecuteWrite {
    conn_id: ConnectionId,
    trans_id: u32,
    action: ExecWriteAction,
  },

  MtuChanged { conn_id: ConnectionId, mtu: Mtu },

  ServiceCreated {
    result: Result<AttributeHandle, StackError>,
    uuid: UUID,
  },

  ServiceStarted {
    status: StackStatus,
    service_handle: AttributeHandle,
  },

  CharacteristicAdded {
    result: Result<AttributeHandle, StackError>,
    service_handle: AttributeHandle,
    uuid: UUID,
  },

  DescriptorAdded {
    result: Result<AttributeHandle, StackError>,
    service_handle: AttributeHandle,
    uuid: UUID,
  },

  Connected {
    conn_id: ConnectionId,
    peer: BluetoothAddress,
  },

  Disconnected {
    conn_id: ConnectionId,
    peer: BluetoothAddress,
    reason: BluetoothError,
  },

  /// The peer confirmed an indication.
  Confirmed {
    conn_id: ConnectionId,
    status: StackStatus,
  },

  /// Events that need no action here.
  Ignored(IgnoredGattEvent),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IgnoredGattEvent {
  Unregistered,
  IncludedServiceAdded,
  ServiceDeleted,
  ServiceStopped,
  Open,
  CancelOpen,
  Close,
  Listen,
  Congest,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExecWriteAction {
  /// Commit the prepared writes.
  Commit,

  /// Cancel and cleanup memory associated with the prepared writes.
  Cancel,
}
