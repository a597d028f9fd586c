use alloc::vec::Vec;
use core::fmt::{Debug, Display, Formatter};

use enumset::EnumSet;

use crate::advertisement::{AdvertisementPayload, AdvertisingParams, ScanResponsePayload};
use crate::att_error::GattResponse;
use crate::bluetooth_address::BluetoothAddress;
use crate::descriptors::{
  AttributeHandle, GattCharacteristicPermission, GattCharacteristicProperty,
  GattDescriptorPermission, UUID,
};
use crate::gatt_connection::{ConnectionId, ConnectionParams};

/// Interface handle the stack hands out when the GATT application registers.  Events and sends
/// of one registered application all carry the same interface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GattInterface(pub u8);

impl Display for GattInterface {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Every primitive this peripheral asks of the transport stack.  Issuing one only submits it;
/// completion (where the stack reports one) arrives later as a separate event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackRequest {
  RegisterApp {
    app_id: u16,
  },
  SetLocalMtu {
    mtu: u16,
  },
  SetDeviceName {
    name: &'static str,
  },
  ConfigAdvertisingData {
    payload: AdvertisementPayload,
  },
  ConfigScanResponseData {
    payload: ScanResponsePayload,
  },
  StartAdvertising {
    params: AdvertisingParams,
  },
  CreateService {
    interface: GattInterface,
    uuid: UUID,
    primary: bool,
    num_handles: u16,
  },
  StartService {
    service_handle: AttributeHandle,
  },
  AddCharacteristic {
    service_handle: AttributeHandle,
    uuid: UUID,
    permissions: EnumSet<GattCharacteristicPermission>,
    properties: EnumSet<GattCharacteristicProperty>,
  },
  AddDescriptor {
    service_handle: AttributeHandle,
    uuid: UUID,
    permissions: EnumSet<GattDescriptorPermission>,
  },
  SendResponse {
    interface: GattInterface,
    conn_id: ConnectionId,
    trans_id: u32,
    status: GattResponse,
  },
  /// Server initiated push.  With `need_confirmation` false the stack sends an unconfirmed
  /// notification.
  SendIndication {
    interface: GattInterface,
    conn_id: ConnectionId,
    handle: AttributeHandle,
    payload: Vec<u8>,
    need_confirmation: bool,
  },
  UpdateConnectionParams {
    peer: BluetoothAddress,
    params: ConnectionParams,
  },
  CloseConnection {
    interface: GattInterface,
    conn_id: ConnectionId,
  },
}

impl StackRequest {
  pub fn name(&self) -> &'static str {
    match self {
      Self::RegisterApp { .. } => "register app",
      Self::SetLocalMtu { .. } => "set local MTU",
      Self::SetDeviceName { .. } => "set device name",
      Self::ConfigAdvertisingData { .. } => "config raw adv data",
      Self::ConfigScanResponseData { .. } => "config raw scan rsp data",
      Self::StartAdvertising { .. } => "start advertising",
      Self::CreateService { .. } => "create service",
      Self::StartService { .. } => "start service",
      Self::AddCharacteristic { .. } => "add characteristic",
      Self::AddDescriptor { .. } => "add char descr",
      Self::SendResponse { .. } => "send response",
      Self::SendIndication { .. } => "send indication",
      Self::UpdateConnectionParams { .. } => "update conn params",
      Self::CloseConnection { .. } => "close connection",
    }
  }

  /// Hand the request to `stack`.  Consumes the request so any payload it owns is released once
  /// the stack call returns, whatever the outcome.
  pub fn submit_to<S: BleStack + ?Sized>(self, stack: &mut S) -> Result<(), S::Error> {
    match self {
      Self::RegisterApp { app_id } => stack.register_app(app_id),
      Self::SetLocalMtu { mtu } => stack.set_local_mtu(mtu),
      Self::SetDeviceName { name } => stack.set_device_name(name),
      Self::ConfigAdvertisingData { payload } => stack.config_advertising_data(&payload),
      Self::ConfigScanResponseData { payload } => stack.config_scan_response_data(&payload),
      Self::StartAdvertising { params } => stack.start_advertising(&params),
      Self::CreateService {
        interface,
        uuid,
        primary,
        num_handles,
      } => stack.create_service(interface, uuid, primary, num_handles),
      Self::StartService { service_handle } => stack.start_service(service_handle),
      Self::AddCharacteristic {
        service_handle,
        uuid,
        permissions,
        properties,
      } => stack.add_characteristic(service_handle, uuid, permissions, properties),
      Self::AddDescriptor {
        service_handle,
        uuid,
        permissions,
      } => stack.add_descriptor(service_handle, uuid, permissions),
      Self::SendResponse {
        interface,
        conn_id,
        trans_id,
        status,
      } => stack.send_response(interface, conn_id, trans_id, status),
      Self::SendIndication {
        interface,
        conn_id,
        handle,
        payload,
        need_confirmation,
      } => stack.send_indication(interface, conn_id, handle, &payload, need_confirmation),
      Self::UpdateConnectionParams { peer, params } => {
        stack.update_connection_params(peer, &params)
      }
      Self::CloseConnection { interface, conn_id } => stack.close_connection(interface, conn_id),
    }
  }
}

/// Low-level mapping of the GAP/GATT server primitives of a vendor BLE stack.  Each method only
/// submits; an `Err` means the stack refused the submission outright.
///
/// Implementations must deliver their completion and connection events back through a single
/// consumer (see [crate::peripheral::Peripheral]) so that handlers never run concurrently.
pub trait BleStack {
  type Error: Debug;

  fn register_app(&mut self, app_id: u16) -> Result<(), Self::Error>;
  fn set_local_mtu(&mut self, mtu: u16) -> Result<(), Self::Error>;
  fn set_device_name(&mut self, name: &str) -> Result<(), Self::Error>;
  fn config_advertising_data(&mut self, raw: &[u8]) -> Result<(), Self::Error>;
  fn config_scan_response_data(&mut self, raw: &[u8]) -> Result<(), Self::Error>;
  fn start_advertising(&mut self, params: &AdvertisingParams) -> Result<(), Self::Error>;

  fn create_service(
    &mut self,
    interface: GattInterface,
    uuid: UUID,
    primary: bool,
    num_handles: u16,
  ) -> Result<(), Self::Error>;

  fn start_service(&mut self, service_handle: AttributeHandle) -> Result<(), Self::Error>;

  fn add_characteristic(
    &mut self,
    service_handle: AttributeHandle,
    uuid: UUID,
    permissions: EnumSet<GattCharacteristicPermission>,
    properties: EnumSet<GattCharacteristicProperty>,
  ) -> Result<(), Self::Error>;

  fn add_descriptor(
    &mut self,
    service_handle: AttributeHandle,
    uuid: UUID,
    permissions: EnumSet<GattDescriptorPermission>,
  ) -> Result<(), Self::Error>;

  fn send_response(
    &mut self,
    interface: GattInterface,
    conn_id: ConnectionId,
    trans_id: u32,
    status: GattResponse,
  ) -> Result<(), Self::Error>;

  fn send_indication(
    &mut self,
    interface: GattInterface,
    conn_id: ConnectionId,
    handle: AttributeHandle,
    payload: &[u8],
    need_confirmation: bool,
  ) -> Result<(), Self::Error>;

  fn update_connection_params(
    &mut self,
    peer: BluetoothAddress,
    params: &ConnectionParams,
  ) -> Result<(), Self::Error>;

  fn close_connection(
    &mut self,
    interface: GattInterface,
    conn_id: ConnectionId,
  ) -> Result<(), Self::Error>;
}
