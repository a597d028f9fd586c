use enumset::EnumSet;

use crate::descriptors::attribute_handle::AttributeHandle;
use crate::descriptors::gatt_descriptor::GattDescriptor;
use crate::descriptors::uuid::UUID;

/// One characteristic of the service table.  `handle` stays `None` until the stack reports the
/// add-characteristic completion.
#[derive(Debug, Clone, PartialEq)]
pub struct GattCharacteristic {
  pub uuid: UUID,
  pub properties: EnumSet<GattCharacteristicProperty>,
  pub permissions: EnumSet<GattCharacteristicPermission>,
  pub handle: Option<AttributeHandle>,

  /// Only created once `handle` is known.
  pub descriptor: Option<GattDescriptor>,
}

impl Default for GattCharacteristic {
  fn default() -> Self {
    Self {
      uuid: UUID::Long(0),
      properties: EnumSet::new(),
      permissions: EnumSet::new(),
      handle: None,
      descriptor: None,
    }
  }
}

impl GattCharacteristic {
  /// Attribute handles consumed in the service: declaration, value and any descriptor.
  pub fn num_handles(&self) -> u16 {
    2 + u16::from(self.descriptor.is_some())
  }

  pub fn is_created(&self) -> bool {
    self.handle.is_some()
  }
}

#[derive(Debug, enumset::EnumSetType)]
pub enum GattCharacteristicProperty {
  Broadcast,
  ExtendedProps,
  Indicate,

  /// The client enables delivery through the CCCD, which must be part of the table.
  Notify,

  Read,
  Write,
  WriteSigned,
  WriteNoResponse,
}

impl GattCharacteristicProperty {
  /// Bit in the characteristic declaration's properties field.
  pub fn bit(self) -> u8 {
    match self {
      Self::Broadcast => 0x01,
      Self::Read => 0x02,
      Self::WriteNoResponse => 0x04,
      Self::Write => 0x08,
      Self::Notify => 0x10,
      Self::Indicate => 0x20,
      Self::WriteSigned => 0x40,
      Self::ExtendedProps => 0x80,
    }
  }

  pub fn declaration_bits(set: EnumSet<Self>) -> u8 {
    set.iter().fold(0, |bits, p| bits | p.bit())
  }
}

#[derive(Debug, enumset::EnumSetType)]
pub enum GattCharacteristicPermission {
  Read,
  ReadEncrypted,
  Write,
  WriteEncrypted,
  WriteEncryptedMitm,
  WriteSigned,
  WriteSignedMitm,
}
