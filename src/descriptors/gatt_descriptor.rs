use enumset::EnumSet;

use crate::descriptors::attribute_handle::AttributeHandle;
use crate::descriptors::uuid::UUID;
use crate::prelude::GattCharacteristicPermission;

#[derive(Debug, Clone, PartialEq)]
pub struct GattDescriptor {
  pub uuid: UUID,
  pub permissions: EnumSet<GattDescriptorPermission>,
  pub handle: Option<AttributeHandle>,
}

impl Default for GattDescriptor {
  fn default() -> Self {
    Self {
      uuid: UUID::Short(0),
      permissions: EnumSet::new(),
      handle: None,
    }
  }
}

pub type GattDescriptorPermission = GattCharacteristicPermission;
