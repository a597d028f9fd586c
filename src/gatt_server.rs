use alloc::vec;
use alloc::vec::Vec;

use log::{debug, error, info, trace, warn};

use crate::advertisement::{cage_advertising_data, cage_scan_response};
use crate::advertising::{AdvertisingController, PayloadKind};
use crate::att_error::AttError;
use crate::config::PeripheralConfig;
use crate::descriptors::{
  uart_service, AttributeHandle, GattService, RX_CHARACTERISTIC_UUID, TX_CHARACTERISTIC_UUID, UUID,
};
use crate::error::{StackError, StackStatus};
use crate::exchange::{is_command_write, CommandExchange, CommandExecutor, TxRoute};
use crate::gatt_connection::{ConnectionId, SessionSlot};
use crate::gatt_server_cb::{GapEvent, GattServerEvent, StackEvent};
use crate::stack::{GattInterface, StackRequest};

/// Progress of the service table creation.  Each state waits on exactly one stack completion;
/// there are no backward transitions.
///
/// Registration, device naming and the advertising uploads all happen while handling the
/// registration event, so the first state after `Unregistered` is already `ServiceCreating`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SetupState {
  Unregistered,
  ServiceCreating,
  ServiceStarting,
  RxCharAdding,
  TxCharAdding,
  DescriptorAdding,
  Ready,
}

/// The UART peripheral.  Owns all peripheral state and turns each stack event into the requests
/// the stack should carry out next, without calling the stack itself.
#[derive(Debug)]
pub struct GattServer<E> {
  config: PeripheralConfig,
  state: SetupState,

  /// Interface of our registered application; `None` until registration succeeds.
  interface: Option<GattInterface>,

  service: GattService,
  advertising: AdvertisingController,
  session: SessionSlot,
  exchange: CommandExchange<E>,
}

impl<E: CommandExecutor> GattServer<E> {
  pub fn new(config: PeripheralConfig, executor: E) -> Self {
    Self {
      advertising: AdvertisingController::new(config.advertising.clone()),
      config,
      state: SetupState::Unregistered,
      interface: None,
      service: uart_service(),
      session: SessionSlot::new(),
      exchange: CommandExchange::new(executor),
    }
  }

  /// Bring-up requests: register the application and ask for a larger local MTU.  Everything
  /// else follows from the registration completion.
  pub fn start(&self) -> Vec<StackRequest> {
    vec![
      StackRequest::RegisterApp {
        app_id: self.config.app_id,
      },
      StackRequest::SetLocalMtu {
        mtu: self.config.local_mtu,
      },
    ]
  }

  pub fn state(&self) -> SetupState {
    self.state
  }

  pub fn interface(&self) -> Option<GattInterface> {
    self.interface
  }

  pub fn service(&self) -> &GattService {
    &self.service
  }

  pub fn session(&self) -> &SessionSlot {
    &self.session
  }

  pub fn advertising(&self) -> &AdvertisingController {
    &self.advertising
  }

  pub fn exchange(&self) -> &CommandExchange<E> {
    &self.exchange
  }

  /// Disconnect the active peer, if any.  Repeated calls before the disconnect completes
  /// produce nothing.
  pub fn close(&mut self) -> Vec<StackRequest> {
    self.session.close().into_iter().collect()
  }

  pub fn handle_event(&mut self, event: StackEvent) -> Vec<StackRequest> {
    match event {
      StackEvent::Gap(event) => self.on_gap_event(event),
      StackEvent::Gatt {
        interface,
        event: GattServerEvent::Registered { status, app_id },
      } => self.on_registered(interface, status, app_id),
      // Reads are refused even before registration, on whatever interface they came in on.
      StackEvent::Gatt {
        interface,
        event:
          GattServerEvent::ReadRequest {
            conn_id,
            trans_id,
            handle,
          },
      } if self.interface.is_none() => self.reject_read(interface, conn_id, trans_id, handle),
      StackEvent::Gatt { interface, event } => {
        if interface.is_some() && interface != self.interface {
          trace!("Dropping event for interface {interface:?}: {event:?}");
          return Vec::new();
        }
        self.on_gatt_event(event)
      }
    }
  }

  fn on_gap_event(&mut self, event: GapEvent) -> Vec<StackRequest> {
    match event {
      GapEvent::AdvertisingDataSet { status } => self
        .advertising
        .on_config_uploaded(PayloadKind::AdvertisingData, status)
        .into_iter()
        .collect(),
      GapEvent::ScanResponseDataSet { status } => self
        .advertising
        .on_config_uploaded(PayloadKind::ScanResponse, status)
        .into_iter()
        .collect(),
      GapEvent::AdvertisingStarted { status } => {
        self.advertising.on_advertise_start_result(status);
        Vec::new()
      }
      GapEvent::AdvertisingStopped { status } => {
        self.advertising.on_advertise_stop_result(status);
        Vec::new()
      }
      GapEvent::ConnectionParamsUpdated {
        status,
        peer,
        params,
      } => {
        match status {
          Ok(()) => self.session.on_params_updated(peer, params),
          Err(e) => warn!("Connection parameter update for {peer} failed: {e}"),
        }
        Vec::new()
      }
      GapEvent::Unknown { code } => {
        error!("undefined event: {code}");
        Vec::new()
      }
    }
  }

  fn on_registered(
    &mut self,
    interface: Option<GattInterface>,
    status: StackStatus,
    app_id: u16,
  ) -> Vec<StackRequest> {
    if let Err(e) = status {
      error!("GATT app {app_id} registration failed: {e}");
      return Vec::new();
    }
    if app_id != self.config.app_id {
      debug!("Registration of foreign app {app_id}");
      return Vec::new();
    }
    let Some(interface) = interface else {
      error!("GATT app {app_id} registered without an interface");
      return Vec::new();
    };
    if self.state != SetupState::Unregistered {
      warn!("Duplicate registration on interface {interface} ignored");
      return Vec::new();
    }

    info!("GATT app {app_id} registered on interface {interface}");
    self.interface = Some(interface);

    let mut requests = vec![StackRequest::SetDeviceName {
      name: self.config.device_name,
    }];

    // Both uploads gate advertising; one that cannot be built stays pending.
    self.advertising.arm(PayloadKind::AdvertisingData);
    self.advertising.arm(PayloadKind::ScanResponse);

    match cage_advertising_data(&self.config) {
      Ok(payload) => requests.push(StackRequest::ConfigAdvertisingData { payload }),
      Err(e) => error!("config raw adv data failed: {e}"),
    }
    match cage_scan_response(self.service.uuid) {
      Ok(payload) => requests.push(StackRequest::ConfigScanResponseData { payload }),
      Err(e) => error!("config raw scan rsp data failed: {e}"),
    }

    requests.push(StackRequest::CreateService {
      interface,
      uuid: self.service.uuid,
      primary: self.service.primary,
      num_handles: self.service.num_handles(),
    });
    self.state = SetupState::ServiceCreating;
    requests
  }

  fn on_gatt_event(&mut self, event: GattServerEvent) -> Vec<StackRequest> {
    match event {
      // Routed through on_registered before the interface filter.
      GattServerEvent::Registered { .. } => Vec::new(),
      GattServerEvent::ServiceCreated { result, uuid } => self.on_service_created(result, uuid),
      GattServerEvent::ServiceStarted {
        status,
        service_handle,
      } => self.on_service_started(status, service_handle),
      GattServerEvent::CharacteristicAdded {
        result,
        service_handle,
        uuid,
      } => self.on_characteristic_added(result, service_handle, uuid),
      GattServerEvent::DescriptorAdded {
        result,
        service_handle,
        uuid,
      } => self.on_descriptor_added(result, service_handle, uuid),
      GattServerEvent::ReadRequest {
        conn_id,
        trans_id,
        handle,
      } => self.reject_read(self.interface, conn_id, trans_id, handle),
      GattServerEvent::WriteRequest {
        conn_id,
        trans_id,
        handle,
        offset,
        need_response,
        is_prepare,
        value,
      } => self.on_write(conn_id, trans_id, handle, offset, need_response, is_prepare, &value),
      GattServerEvent::ExecuteWrite {
        conn_id,
        trans_id,
        action,
      } => {
        debug!("Execute write on {conn_id}: {action:?}");
        self.respond(conn_id, trans_id, Ok(()))
      }
      GattServerEvent::MtuChanged { conn_id, mtu } => {
        self.session.on_mtu_changed(conn_id, mtu);
        Vec::new()
      }
      GattServerEvent::Connected { conn_id, peer } => match self.interface {
        Some(interface) => {
          let preferred = self.config.connection;
          vec![self.session.on_connect(conn_id, peer, interface, preferred)]
        }
        None => {
          warn!("Connection {conn_id} from {peer} before registration");
          Vec::new()
        }
      },
      GattServerEvent::Disconnected {
        conn_id,
        peer,
        reason,
      } => {
        debug!("Disconnect of {peer}");
        if self.session.on_disconnect(conn_id, reason) {
          vec![self.advertising.restart()]
        } else {
          Vec::new()
        }
      }
      GattServerEvent::Confirmed { conn_id, status } => {
        if let Err(e) = status {
          warn!("Indication on {conn_id} not confirmed: {e}");
        }
        Vec::new()
      }
      GattServerEvent::Ignored(kind) => {
        trace!("Ignoring {kind:?}");
        Vec::new()
      }
    }
  }

  fn on_service_created(
    &mut self,
    result: Result<AttributeHandle, StackError>,
    uuid: UUID,
  ) -> Vec<StackRequest> {
    if self.state != SetupState::ServiceCreating || uuid != self.service.uuid {
      warn!("Unexpected service creation of {uuid} in {:?}", self.state);
      return Vec::new();
    }
    let service_handle = match result {
      Ok(handle) => handle,
      Err(e) => {
        error!("Failed to create service {uuid}: {e}");
        return Vec::new();
      }
    };

    info!("Service {uuid} created: handle={service_handle}");
    self.service.handle = Some(service_handle);
    self.state = SetupState::ServiceStarting;
    vec![StackRequest::StartService { service_handle }]
  }

  fn on_service_started(
    &mut self,
    status: StackStatus,
    service_handle: AttributeHandle,
  ) -> Vec<StackRequest> {
    if self.state != SetupState::ServiceStarting || self.service.handle != Some(service_handle) {
      warn!("Unexpected start of service {service_handle} in {:?}", self.state);
      return Vec::new();
    }
    if let Err(e) = status {
      error!("Failed to start service {service_handle}: {e}");
      return Vec::new();
    }

    self.state = SetupState::RxCharAdding;
    self.add_characteristic_request(service_handle, RX_CHARACTERISTIC_UUID)
  }

  fn on_characteristic_added(
    &mut self,
    result: Result<AttributeHandle, StackError>,
    service_handle: AttributeHandle,
    uuid: UUID,
  ) -> Vec<StackRequest> {
    let expected = match self.state {
      SetupState::RxCharAdding => RX_CHARACTERISTIC_UUID,
      SetupState::TxCharAdding => TX_CHARACTERISTIC_UUID,
      state => {
        warn!("Unexpected characteristic {uuid} in {state:?}");
        return Vec::new();
      }
    };
    if uuid != expected || self.service.handle != Some(service_handle) {
      warn!("Unexpected characteristic {uuid} on {service_handle}, waiting for {expected}");
      return Vec::new();
    }
    let handle = match result {
      Ok(handle) => handle,
      Err(e) => {
        error!("Failed to create characteristic {uuid}: {e}");
        return Vec::new();
      }
    };

    debug!("Characteristic {uuid}: handle={handle}");
    let Some(characteristic) = self.service.characteristic_mut(uuid) else {
      return Vec::new();
    };
    characteristic.handle = Some(handle);

    if self.state == SetupState::RxCharAdding {
      self.state = SetupState::TxCharAdding;
      return self.add_characteristic_request(service_handle, TX_CHARACTERISTIC_UUID);
    }

    match characteristic.descriptor.as_ref().map(|d| (d.uuid, d.permissions)) {
      Some((uuid, permissions)) => {
        self.state = SetupState::DescriptorAdding;
        vec![StackRequest::AddDescriptor {
          service_handle,
          uuid,
          permissions,
        }]
      }
      None => {
        self.mark_ready();
        Vec::new()
      }
    }
  }

  fn on_descriptor_added(
    &mut self,
    result: Result<AttributeHandle, StackError>,
    service_handle: AttributeHandle,
    uuid: UUID,
  ) -> Vec<StackRequest> {
    if self.state != SetupState::DescriptorAdding || self.service.handle != Some(service_handle) {
      warn!("Unexpected descriptor {uuid} in {:?}", self.state);
      return Vec::new();
    }
    let descriptor = self
      .service
      .characteristic_mut(TX_CHARACTERISTIC_UUID)
      .and_then(|c| c.descriptor.as_mut())
      .filter(|d| d.uuid == uuid);
    let Some(descriptor) = descriptor else {
      warn!("Unexpected descriptor {uuid}");
      return Vec::new();
    };
    match result {
      Ok(handle) => {
        debug!("Descriptor {uuid}: handle={handle}");
        descriptor.handle = Some(handle);
        self.mark_ready();
      }
      Err(e) => error!("add char descr failed: {e}"),
    }
    Vec::new()
  }

  fn mark_ready(&mut self) {
    info!("UART service ready");
    self.state = SetupState::Ready;
  }

  fn add_characteristic_request(
    &self,
    service_handle: AttributeHandle,
    uuid: UUID,
  ) -> Vec<StackRequest> {
    match self.service.characteristic(uuid) {
      Some(c) => vec![StackRequest::AddCharacteristic {
        service_handle,
        uuid: c.uuid,
        permissions: c.permissions,
        properties: c.properties,
      }],
      None => Vec::new(),
    }
  }

  #[allow(clippy::too_many_arguments)]
  fn on_write(
    &mut self,
    conn_id: ConnectionId,
    trans_id: u32,
    handle: AttributeHandle,
    offset: u16,
    need_response: bool,
    is_prepare: bool,
    value: &[u8],
  ) -> Vec<StackRequest> {
    let mut requests = Vec::new();

    if self.service.handle_of(RX_CHARACTERISTIC_UUID) != Some(handle) {
      debug!("Write of {} bytes to {handle} acknowledged only", value.len());
    } else if !is_command_write(is_prepare, value) {
      debug!("Ignoring write of {} bytes (prepare={is_prepare})", value.len());
    } else if let Some(route) = self.tx_route(conn_id) {
      if offset > 0 {
        warn!("Ignoring write offset={offset}");
      }
      requests.extend(self.exchange.execute(value, route));
    }

    if need_response && !is_prepare {
      requests.extend(self.respond(conn_id, trans_id, Ok(())));
    }
    requests
  }

  fn tx_route(&self, conn_id: ConnectionId) -> Option<TxRoute> {
    let Some(session) = self.session.active().filter(|s| s.conn_id == conn_id) else {
      warn!("Command from {conn_id} without an active session");
      return None;
    };
    let Some(handle) = self.service.handle_of(TX_CHARACTERISTIC_UUID) else {
      warn!("Command from {conn_id} before TX characteristic exists");
      return None;
    };
    Some(TxRoute {
      interface: session.interface,
      conn_id,
      handle,
      mtu: session.mtu,
    })
  }

  fn reject_read(
    &self,
    interface: Option<GattInterface>,
    conn_id: ConnectionId,
    trans_id: u32,
    handle: AttributeHandle,
  ) -> Vec<StackRequest> {
    error!("Read event is not supported (handle={handle})");
    self.respond_on(interface, conn_id, trans_id, Err(AttError::RequestNotSupported))
  }

  fn respond(
    &self,
    conn_id: ConnectionId,
    trans_id: u32,
    status: Result<(), AttError>,
  ) -> Vec<StackRequest> {
    self.respond_on(self.interface, conn_id, trans_id, status)
  }

  fn respond_on(
    &self,
    interface: Option<GattInterface>,
    conn_id: ConnectionId,
    trans_id: u32,
    status: Result<(), AttError>,
  ) -> Vec<StackRequest> {
    match interface {
      Some(interface) => vec![StackRequest::SendResponse {
        interface,
        conn_id,
        trans_id,
        status,
      }],
      None => {
        warn!("Cannot respond to {conn_id} without an interface");
        Vec::new()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  extern crate std;

  use alloc::vec;
  use alloc::vec::Vec;
  use enumset::enum_set;

  use super::*;
  use crate::advertisement::AdvertisingParams;
  use crate::bluetooth_address::BluetoothAddress;
  use crate::bluetooth_error::BluetoothError;
  use crate::config::uuids;
  use crate::descriptors::{CLIENT_CONFIG_UUID, GattCharacteristicPermission, GattCharacteristicProperty};
  use crate::gatt_server_cb::{ExecWriteAction, IgnoredGattEvent};
  use crate::mtu::Mtu;

  const IFACE: GattInterface = GattInterface(3);
  const PEER: BluetoothAddress = BluetoothAddress([0xc0, 0xff, 0xee, 0, 0, 1]);
  const SERVICE_UUID: UUID = UUID::Long(uuids::SERVICE);

  #[derive(Default)]
  struct RecordingExecutor {
    commands: Vec<Vec<u8>>,
    reply: Option<&'static [u8]>,
  }

  impl CommandExecutor for RecordingExecutor {
    fn execute(&mut self, command: &[u8], on_result: &mut dyn FnMut(&[u8])) {
      self.commands.push(command.to_vec());
      if let Some(reply) = self.reply {
        on_result(reply);
      }
    }
  }

  fn handle(raw: u16) -> AttributeHandle {
    AttributeHandle::new(raw).unwrap()
  }

  fn gatt(event: GattServerEvent) -> StackEvent {
    StackEvent::gatt(IFACE, event)
  }

  fn server() -> GattServer<RecordingExecutor> {
    GattServer::new(
      PeripheralConfig::default(),
      RecordingExecutor {
        reply: Some(&b"OK ON"[..]),
        ..Default::default()
      },
    )
  }

  fn registered() -> StackEvent {
    gatt(GattServerEvent::Registered {
      status: Ok(()),
      app_id: 0,
    })
  }

  fn service_created() -> StackEvent {
    gatt(GattServerEvent::ServiceCreated {
      result: Ok(handle(40)),
      uuid: SERVICE_UUID,
    })
  }

  fn service_started() -> StackEvent {
    gatt(GattServerEvent::ServiceStarted {
      status: Ok(()),
      service_handle: handle(40),
    })
  }

  fn char_added(uuid: UUID, raw: u16) -> StackEvent {
    gatt(GattServerEvent::CharacteristicAdded {
      result: Ok(handle(raw)),
      service_handle: handle(40),
      uuid,
    })
  }

  fn descr_added() -> StackEvent {
    gatt(GattServerEvent::DescriptorAdded {
      result: Ok(handle(45)),
      service_handle: handle(40),
      uuid: CLIENT_CONFIG_UUID,
    })
  }

  fn connected(conn_id: u16) -> StackEvent {
    gatt(GattServerEvent::Connected {
      conn_id: ConnectionId(conn_id),
      peer: PEER,
    })
  }

  fn disconnected(conn_id: u16) -> StackEvent {
    gatt(GattServerEvent::Disconnected {
      conn_id: ConnectionId(conn_id),
      peer: PEER,
      reason: BluetoothError::ClosedByPeer(crate::bluetooth_error::RemoteShutdownReason::NoneGiven),
    })
  }

  fn rx_write(conn_id: u16, value: &[u8], need_response: bool, is_prepare: bool) -> StackEvent {
    gatt(GattServerEvent::WriteRequest {
      conn_id: ConnectionId(conn_id),
      trans_id: 99,
      handle: handle(42),
      offset: 0,
      need_response,
      is_prepare,
      value: value.to_vec(),
    })
  }

  fn ready_server() -> GattServer<RecordingExecutor> {
    let mut server = server();
    for event in [
      registered(),
      service_created(),
      service_started(),
      char_added(RX_CHARACTERISTIC_UUID, 42),
      char_added(TX_CHARACTERISTIC_UUID, 44),
      descr_added(),
    ] {
      server.handle_event(event);
    }
    assert_eq!(server.state(), SetupState::Ready);
    server
  }

  fn ok_response(conn_id: u16) -> StackRequest {
    StackRequest::SendResponse {
      interface: IFACE,
      conn_id: ConnectionId(conn_id),
      trans_id: 99,
      status: Ok(()),
    }
  }

  fn start_advertising() -> StackRequest {
    StackRequest::StartAdvertising {
      params: AdvertisingParams::default(),
    }
  }

  #[test]
  fn test_start_registers_app() {
    assert_eq!(
      server().start(),
      vec![
        StackRequest::RegisterApp { app_id: 0 },
        StackRequest::SetLocalMtu { mtu: 500 },
      ]
    );
  }

  #[test]
  fn test_registration_configures_and_creates_service() {
    let mut server = server();
    let requests = server.handle_event(registered());

    let names: Vec<&str> = requests.iter().map(StackRequest::name).collect();
    assert_eq!(
      names,
      [
        "set device name",
        "config raw adv data",
        "config raw scan rsp data",
        "create service"
      ]
    );
    assert_eq!(requests[0], StackRequest::SetDeviceName { name: "CAGE" });
    assert_eq!(
      requests[3],
      StackRequest::CreateService {
        interface: IFACE,
        uuid: SERVICE_UUID,
        primary: true,
        num_handles: 6,
      }
    );
    assert_eq!(server.interface(), Some(IFACE));
    assert_eq!(server.state(), SetupState::ServiceCreating);
  }

  #[test]
  fn test_failed_registration_stays_unregistered() {
    let mut server = server();
    let requests = server.handle_event(gatt(GattServerEvent::Registered {
      status: Err(StackError::new(0x85)),
      app_id: 0,
    }));

    assert!(requests.is_empty());
    assert_eq!(server.interface(), None);
    assert_eq!(server.state(), SetupState::Unregistered);
  }

  #[test]
  fn test_full_setup_sequence() {
    let mut server = server();
    server.handle_event(registered());

    assert_eq!(
      server.handle_event(service_created()),
      vec![StackRequest::StartService {
        service_handle: handle(40)
      }]
    );
    assert_eq!(server.state(), SetupState::ServiceStarting);

    assert_eq!(
      server.handle_event(service_started()),
      vec![StackRequest::AddCharacteristic {
        service_handle: handle(40),
        uuid: RX_CHARACTERISTIC_UUID,
        permissions: enum_set!(GattCharacteristicPermission::Write),
        properties: enum_set!(
          GattCharacteristicProperty::Write | GattCharacteristicProperty::WriteNoResponse
        ),
      }]
    );

    assert_eq!(
      server.handle_event(char_added(RX_CHARACTERISTIC_UUID, 42)),
      vec![StackRequest::AddCharacteristic {
        service_handle: handle(40),
        uuid: TX_CHARACTERISTIC_UUID,
        permissions: enum_set!(
          GattCharacteristicPermission::Read | GattCharacteristicPermission::Write
        ),
        properties: enum_set!(GattCharacteristicProperty::Notify),
      }]
    );

    assert_eq!(
      server.handle_event(char_added(TX_CHARACTERISTIC_UUID, 44)),
      vec![StackRequest::AddDescriptor {
        service_handle: handle(40),
        uuid: CLIENT_CONFIG_UUID,
        permissions: enum_set!(
          GattCharacteristicPermission::Read | GattCharacteristicPermission::Write
        ),
      }]
    );
    assert_eq!(server.state(), SetupState::DescriptorAdding);

    assert!(server.handle_event(descr_added()).is_empty());
    assert_eq!(server.state(), SetupState::Ready);
    assert_eq!(server.service().handle_of(RX_CHARACTERISTIC_UUID), Some(handle(42)));
    assert_eq!(server.service().handle_of(TX_CHARACTERISTIC_UUID), Some(handle(44)));
    let cccd = server.service().characteristics[1].descriptor.as_ref().unwrap();
    assert_eq!(cccd.handle, Some(handle(45)));
  }

  #[test]
  fn test_characteristics_wait_for_service_start() {
    let mut server = server();
    server.handle_event(registered());

    // Nothing may be added before the service exists and has started.
    assert!(server.handle_event(service_started()).is_empty());
    assert!(server.handle_event(char_added(RX_CHARACTERISTIC_UUID, 42)).is_empty());
    assert_eq!(server.state(), SetupState::ServiceCreating);

    server.handle_event(service_created());
    assert!(server.handle_event(char_added(RX_CHARACTERISTIC_UUID, 42)).is_empty());
    assert_eq!(server.state(), SetupState::ServiceStarting);
    assert_eq!(server.service().handle_of(RX_CHARACTERISTIC_UUID), None);
  }

  #[test]
  fn test_descriptor_waits_for_tx_characteristic() {
    let mut server = server();
    server.handle_event(registered());
    server.handle_event(service_created());
    server.handle_event(service_started());

    assert!(server.handle_event(char_added(TX_CHARACTERISTIC_UUID, 44)).is_empty());
    assert!(server.handle_event(descr_added()).is_empty());
    assert_eq!(server.state(), SetupState::RxCharAdding);

    let requests = server.handle_event(char_added(RX_CHARACTERISTIC_UUID, 42));
    assert!(matches!(
      requests.as_slice(),
      [StackRequest::AddCharacteristic { uuid, .. }] if *uuid == TX_CHARACTERISTIC_UUID
    ));
  }

  #[test]
  fn test_characteristic_failure_stalls() {
    let mut server = server();
    server.handle_event(registered());
    server.handle_event(service_created());
    server.handle_event(service_started());

    let requests = server.handle_event(gatt(GattServerEvent::CharacteristicAdded {
      result: Err(StackError::new(0x87)),
      service_handle: handle(40),
      uuid: RX_CHARACTERISTIC_UUID,
    }));
    assert!(requests.is_empty());
    assert_eq!(server.state(), SetupState::RxCharAdding);
  }

  #[test]
  fn test_foreign_interface_dropped() {
    let mut server = ready_server();
    let requests = server.handle_event(StackEvent::gatt(
      GattInterface(9),
      GattServerEvent::Connected {
        conn_id: ConnectionId(1),
        peer: PEER,
      },
    ));
    assert!(requests.is_empty());
    assert!(server.session().active().is_none());
  }

  #[test]
  fn test_advertising_gated_on_both_uploads() {
    let mut server = server();
    server.handle_event(registered());

    let adv_done = StackEvent::Gap(GapEvent::AdvertisingDataSet { status: Ok(()) });
    assert!(server.handle_event(adv_done).is_empty());

    let rsp_done = StackEvent::Gap(GapEvent::ScanResponseDataSet { status: Ok(()) });
    assert_eq!(server.handle_event(rsp_done.clone()), vec![start_advertising()]);
    assert!(server.handle_event(rsp_done).is_empty());
  }

  #[test]
  fn test_unbuildable_payload_keeps_advertising_gated() {
    let config = PeripheralConfig {
      device_name: "CAGE-LONG-DEVICE-NAME",
      ..Default::default()
    };
    let mut server = GattServer::new(config, RecordingExecutor::default());

    let requests = server.handle_event(registered());
    let names: Vec<&str> = requests.iter().map(StackRequest::name).collect();
    assert_eq!(names, ["set device name", "config raw scan rsp data", "create service"]);
    assert!(server.advertising().is_pending(PayloadKind::AdvertisingData));

    let rsp_done = StackEvent::Gap(GapEvent::ScanResponseDataSet { status: Ok(()) });
    assert!(server.handle_event(rsp_done).is_empty());
    assert!(server.advertising().is_pending(PayloadKind::AdvertisingData));
  }

  #[test]
  fn test_read_rejected_in_every_state() {
    let read = || {
      gatt(GattServerEvent::ReadRequest {
        conn_id: ConnectionId(7),
        trans_id: 5,
        handle: handle(44),
      })
    };
    let rejection = StackRequest::SendResponse {
      interface: IFACE,
      conn_id: ConnectionId(7),
      trans_id: 5,
      status: Err(AttError::RequestNotSupported),
    };

    let mut server = server();
    for event in [
      registered(),
      service_created(),
      service_started(),
      char_added(RX_CHARACTERISTIC_UUID, 42),
      char_added(TX_CHARACTERISTIC_UUID, 44),
      descr_added(),
      connected(7),
    ] {
      assert_eq!(server.handle_event(read()), vec![rejection.clone()]);
      server.handle_event(event);
    }
    assert_eq!(server.handle_event(read()), vec![rejection]);
  }

  #[test]
  fn test_connect_writes_and_notifies() {
    let mut server = ready_server();

    let requests = server.handle_event(connected(7));
    assert_eq!(
      requests,
      vec![StackRequest::UpdateConnectionParams {
        peer: PEER,
        params: PeripheralConfig::default().connection,
      }]
    );

    let requests = server.handle_event(rx_write(7, b"ON\0", true, false));
    assert_eq!(server.exchange().executor().commands, [b"ON".to_vec()]);
    assert_eq!(
      requests,
      vec![
        StackRequest::SendIndication {
          interface: IFACE,
          conn_id: ConnectionId(7),
          handle: handle(44),
          payload: b"OK ON\n".to_vec(),
          need_confirmation: false,
        },
        ok_response(7),
      ]
    );
    assert!(!server.exchange().has_pending());
  }

  #[test]
  fn test_short_write_only_acknowledged() {
    let mut server = ready_server();
    server.handle_event(connected(7));

    assert_eq!(server.handle_event(rx_write(7, b"ON", true, false)), vec![ok_response(7)]);
    assert!(server.handle_event(rx_write(7, b"ON", false, false)).is_empty());
    assert!(server.exchange().executor().commands.is_empty());
  }

  #[test]
  fn test_prepared_write_not_executed() {
    let mut server = ready_server();
    server.handle_event(connected(7));

    assert!(server.handle_event(rx_write(7, b"STATUS", true, true)).is_empty());
    let execute = gatt(GattServerEvent::ExecuteWrite {
      conn_id: ConnectionId(7),
      trans_id: 99,
      action: ExecWriteAction::Commit,
    });
    assert_eq!(server.handle_event(execute), vec![ok_response(7)]);
    assert!(server.exchange().executor().commands.is_empty());
  }

  #[test]
  fn test_write_without_session_not_executed() {
    let mut server = ready_server();

    assert_eq!(server.handle_event(rx_write(7, b"STATUS", true, false)), vec![ok_response(7)]);
    assert!(server.exchange().executor().commands.is_empty());
  }

  #[test]
  fn test_cccd_write_acknowledged_only() {
    let mut server = ready_server();
    server.handle_event(connected(7));

    let requests = server.handle_event(gatt(GattServerEvent::WriteRequest {
      conn_id: ConnectionId(7),
      trans_id: 99,
      handle: handle(45),
      offset: 0,
      need_response: true,
      is_prepare: false,
      value: vec![0x01, 0x00, 0x00],
    }));
    assert_eq!(requests, vec![ok_response(7)]);
    assert!(server.exchange().executor().commands.is_empty());
  }

  #[test]
  fn test_executor_without_result_sends_no_notification() {
    let mut server = GattServer::new(PeripheralConfig::default(), RecordingExecutor::default());
    for event in [
      registered(),
      service_created(),
      service_started(),
      char_added(RX_CHARACTERISTIC_UUID, 42),
      char_added(TX_CHARACTERISTIC_UUID, 44),
      descr_added(),
      connected(7),
    ] {
      server.handle_event(event);
    }

    assert_eq!(server.handle_event(rx_write(7, b"ON\0", true, false)), vec![ok_response(7)]);
    assert_eq!(server.exchange().executor().commands.len(), 1);
  }

  #[test]
  fn test_disconnect_resets_and_readvertises() {
    let mut server = ready_server();
    server.handle_event(connected(7));

    assert_eq!(server.handle_event(disconnected(7)), vec![start_advertising()]);
    assert!(server.session().active().is_none());
    assert!(server.close().is_empty());
  }

  #[test]
  fn test_second_connect_rejected() {
    let mut server = ready_server();
    server.handle_event(connected(7));

    assert_eq!(
      server.handle_event(connected(8)),
      vec![StackRequest::CloseConnection {
        interface: IFACE,
        conn_id: ConnectionId(8)
      }]
    );
    assert!(server.handle_event(disconnected(8)).is_empty());
    assert!(server.session().is_active(ConnectionId(7)));
  }

  #[test]
  fn test_close_idempotent() {
    let mut server = ready_server();
    assert!(server.close().is_empty());

    server.handle_event(connected(7));
    assert_eq!(
      server.close(),
      vec![StackRequest::CloseConnection {
        interface: IFACE,
        conn_id: ConnectionId(7)
      }]
    );
    assert!(server.close().is_empty());
  }

  #[test]
  fn test_mtu_event_updates_session() {
    let mut server = ready_server();
    server.handle_event(connected(7));
    server.handle_event(gatt(GattServerEvent::MtuChanged {
      conn_id: ConnectionId(7),
      mtu: Mtu::new(247),
    }));
    assert_eq!(server.session().active().unwrap().mtu, Mtu::new(247));
  }

  #[test]
  fn test_ignored_events_issue_nothing() {
    let mut server = ready_server();
    assert!(server
      .handle_event(gatt(GattServerEvent::Ignored(IgnoredGattEvent::Congest)))
      .is_empty());
    assert!(server
      .handle_event(StackEvent::Gap(GapEvent::Unknown { code: 42 }))
      .is_empty());
  }
}
