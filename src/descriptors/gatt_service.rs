use alloc::vec;
use alloc::vec::Vec;

use enumset::enum_set;

use crate::config::uuids;
use crate::descriptors::attribute_handle::AttributeHandle;
use crate::descriptors::gatt_characteristic::{
  GattCharacteristic, GattCharacteristicPermission, GattCharacteristicProperty,
};
use crate::descriptors::gatt_descriptor::GattDescriptor;
use crate::descriptors::uuid::UUID;

pub const RX_CHARACTERISTIC_UUID: UUID = UUID::Long(uuids::RX_CHARACTERISTIC);
pub const TX_CHARACTERISTIC_UUID: UUID = UUID::Long(uuids::TX_CHARACTERISTIC);
pub const CLIENT_CONFIG_UUID: UUID = UUID::Short(uuids::CLIENT_CONFIG);

#[derive(Debug, Clone, PartialEq)]
pub struct GattService {
  pub uuid: UUID,
  /// Secondary services are only reachable through an include.
  pub primary: bool,

  /// Assigned by the create-service completion.
  pub handle: Option<AttributeHandle>,

  /// Created in order; a characteristic is only requested once its predecessor exists.
  pub characteristics: Vec<GattCharacteristic>,
}

impl Default for GattService {
  fn default() -> Self {
    Self {
      uuid: UUID::Long(0),
      primary: true,
      handle: None,
      characteristics: Vec::new(),
    }
  }
}

impl GattService {
  /// Handles to reserve in the create-service request: the service declaration plus whatever
  /// each characteristic needs.
  pub fn num_handles(&self) -> u16 {
    1 + self.characteristics.iter().map(GattCharacteristic::num_handles).sum::<u16>()
  }

  pub fn characteristic(&self, uuid: UUID) -> Option<&GattCharacteristic> {
    self.characteristics.iter().find(|c| c.uuid == uuid)
  }

  pub fn characteristic_mut(&mut self, uuid: UUID) -> Option<&mut GattCharacteristic> {
    self.characteristics.iter_mut().find(|c| c.uuid == uuid)
  }

  pub fn handle_of(&self, uuid: UUID) -> Option<AttributeHandle> {
    self.characteristic(uuid).and_then(|c| c.handle)
  }
}

/// The UART service: RX accepts command writes, TX carries responses as notifications and owns
/// the CCCD that lets a client enable them.
pub fn uart_service() -> GattService {
  GattService {
    uuid: UUID::Long(uuids::SERVICE),
    characteristics: vec![
      GattCharacteristic {
        uuid: RX_CHARACTERISTIC_UUID,
        properties: enum_set!(
          GattCharacteristicProperty::Write | GattCharacteristicProperty::WriteNoResponse
        ),
        permissions: enum_set!(GattCharacteristicPermission::Write),
        ..Default::default()
      },
      GattCharacteristic {
        uuid: TX_CHARACTERISTIC_UUID,
        properties: enum_set!(GattCharacteristicProperty::Notify),
        permissions: enum_set!(
          GattCharacteristicPermission::Read | GattCharacteristicPermission::Write
        ),
        descriptor: Some(GattDescriptor {
          uuid: CLIENT_CONFIG_UUID,
          permissions: enum_set!(
            GattCharacteristicPermission::Read | GattCharacteristicPermission::Write
          ),
          handle: None,
        }),
        ..Default::default()
      },
    ],
    ..Default::default()
  }
}
