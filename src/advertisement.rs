use core::fmt::{Display, Formatter};
use core::ops::Deref;
use core::time::Duration;

use crate::config::{advertising, duration_to_units, units_to_duration, PeripheralConfig};
use crate::descriptors::UUID;

/// Length of one advertising interval unit in microseconds.
const ADV_INTERVAL_UNIT_US: u64 = 625;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingParams {
  /// Minimum advertising interval.  Acceptable values are in the range [20ms, 10,485s].
  pub interval_min: Duration,

  /// Maximum advertising interval.  Acceptable values are in the range [20ms, 10,485s].
  pub interval_max: Duration,

  pub connect_mode: ConnectMode,
  pub own_address: OwnAddressType,

  /// Advertise on channels 37, 38 and 39 when true.
  pub all_channels: bool,

  /// Scan and connect requests are accepted from any peer when true (no filter accept list).
  pub allow_any_peer: bool,
}

impl AdvertisingParams {
  /// Build from interval bounds in 0.625 ms units, connectable by anyone on all channels.
  pub const fn from_units(interval_min: u16, interval_max: u16) -> Self {
    Self {
      interval_min: units_to_duration(interval_min, ADV_INTERVAL_UNIT_US),
      interval_max: units_to_duration(interval_max, ADV_INTERVAL_UNIT_US),
      connect_mode: ConnectMode::Undirected,
      own_address: OwnAddressType::Public,
      all_channels: true,
      allow_any_peer: true,
    }
  }

  pub fn interval_min_units(&self) -> u16 {
    duration_to_units(self.interval_min, ADV_INTERVAL_UNIT_US)
  }

  pub fn interval_max_units(&self) -> u16 {
    duration_to_units(self.interval_max, ADV_INTERVAL_UNIT_US)
  }
}

impl Default for AdvertisingParams {
  fn default() -> Self {
    Self::from_units(advertising::INTERVAL_MIN_UNITS, advertising::INTERVAL_MAX_UNITS)
  }
}

/// Whether and how this peripheral is connectable.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectMode {
  /// Connections from any address are allowed (`ADV_IND`).
  Undirected,

  /// Connections are allowed only from a specific address (`ADV_DIRECT_IND`).
  Directed,

  /// Scannable but not connectable (`ADV_SCAN_IND`).
  None,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OwnAddressType {
  Public,
  Random,
}

/// Company id, device tag, serial number and status byte carried in the manufacturer record, e.g.
/// `59 00 "CAGE 000000 F"`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ManufacturerTag {
  pub serial: [u8; 6],
  pub status: u8,
}

impl ManufacturerTag {
  /// Body of the manufacturer record following the company id.
  pub fn encode<const N: usize>(&self, device_tag: &str) -> Result<heapless::Vec<u8, N>, PushError> {
    let status = [self.status];
    let parts: [&[u8]; 5] = [device_tag.as_bytes(), b" ", &self.serial, b" ", &status];
    let mut out = heapless::Vec::new();
    for part in parts {
      out
        .extend_from_slice(part)
        .map_err(|_| PushError::CapacityExceeded)?;
    }
    Ok(out)
  }
}

pub type AdvertisementPayloadBuilder = RawAdvertisementBuilder<LEGACY_PDU_LEN>;

/// Maximum payload of a legacy advertising or scan response PDU.
pub const LEGACY_PDU_LEN: usize = 31;

/// Helper to facilitate creating correctly structured advertisement PDUs.
#[derive(Debug, Default, Clone)]
pub struct RawAdvertisementBuilder<const N: usize> {
  raw: heapless::Vec<u8, N>,
  flags: Option<u8>,
  has_set_flags: bool,
}

impl<const N: usize> RawAdvertisementBuilder<N> {
  pub fn new() -> Self {
    Default::default()
  }

  /// Set the discover mode.  The flags record is written out in front of the next record pushed.
  pub fn set_discover_mode(mut self, discover_mode: DiscoverMode) -> Self {
    let flags = self.flags.get_or_insert(0);
    *flags = (*flags & !DISCOVER_MODE_MASK) | (discover_mode as u8 & DISCOVER_MODE_MASK);
    self
  }

  /// Indicate that Bluetooth Classic (BR/EDR) is _NOT_ supported.
  pub fn set_classic_not_supported(mut self, classic_not_supported: bool) -> Self {
    let flags = self.flags.get_or_insert(0);
    if classic_not_supported {
      *flags |= CLASSIC_NOT_SUPPORTED_MASK;
    } else {
      *flags &= !CLASSIC_NOT_SUPPORTED_MASK;
    }
    self
  }

  /// Omit the flags record entirely.  Flags belong in the advertising PDU only, never in a scan
  /// response.
  pub fn without_flags(mut self) -> Self {
    self.flags = None;
    self.has_set_flags = true;
    self
  }

  pub fn push_manufacturer_data(
    mut self,
    manufacturer_id: u16,
    data: &[u8],
  ) -> Result<Self, PushError> {
    self = self.push_start_record(AdType::ManufacturerData as _, 2 + data.len())?;
    self.extend(&manufacturer_id.to_le_bytes())?;
    self.extend(data)?;
    Ok(self)
  }

  /// Push the complete list of service UUIDs.  All entries must be the same width.
  pub fn push_complete_service_uuids(mut self, uuids: &[UUID]) -> Result<Self, PushError> {
    let size_of_item = Self::require_equal_size(uuids)?;
    let ad_type = match size_of_item {
      2 => AdType::CompleteServiceUuids16,
      _ => AdType::CompleteServiceUuids128,
    };

    self = self.push_start_record(ad_type as _, size_of_item * uuids.len())?;
    for uuid in uuids {
      uuid
        .push_into(&mut self.raw)
        .map_err(|_| PushError::CapacityExceeded)?;
    }

    Ok(self)
  }

  fn require_equal_size(uuids: &[UUID]) -> Result<usize, PushError> {
    let mut num_bytes = None;
    for uuid in uuids {
      let size_of = uuid.byte_len();
      if num_bytes.get_or_insert(size_of) != &size_of {
        return Err(PushError::UuidInputError);
      }
    }
    num_bytes.ok_or(PushError::UuidInputError)
  }

  /// Push the complete local name.  Centrals show this before connecting, then read the GAP
  /// device name characteristic afterwards.
  pub fn push_local_name(mut self, name: &str) -> Result<Self, PushError> {
    self = self.push_start_record(AdType::CompleteLocalName as _, name.len())?;
    self.extend(name.as_bytes())?;
    Ok(self)
  }

  pub fn push_raw_ad_type(mut self, ad_type: u8, data: &[u8]) -> Result<Self, PushError> {
    self = self.push_start_record(ad_type, data.len())?;
    self.extend(data)?;

    if ad_type == AdType::Flags as _ {
      self.has_set_flags = true;
    }

    Ok(self)
  }

  fn push_start_record(mut self, ad_type: u8, remaining_size: usize) -> Result<Self, PushError> {
    self = self.flush_pending_record()?;

    if self.raw.len() + 2 + remaining_size > N {
      return Err(PushError::CapacityExceeded);
    }

    let length = u8::try_from(remaining_size + 1).map_err(|_| PushError::CapacityExceeded)?;
    self.extend(&[length, ad_type])?;
    Ok(self)
  }

  fn extend(&mut self, data: &[u8]) -> Result<(), PushError> {
    self
      .raw
      .extend_from_slice(data)
      .map_err(|_| PushError::CapacityExceeded)
  }

  pub fn build(mut self) -> Result<RawAdvertisement<N>, PushError> {
    self = self.ensure_defaults_set()?;
    self = self.flush_pending_record()?;
    Ok(RawAdvertisement(self.raw))
  }

  fn flush_pending_record(mut self) -> Result<Self, PushError> {
    if let Some(flags) = self.flags.take() {
      self = self.push_raw_ad_type(AdType::Flags as _, &[flags])?;
    }
    Ok(self)
  }

  fn ensure_defaults_set(mut self) -> Result<Self, PushError> {
    if !self.has_set_flags && self.flags.is_none() {
      self = self.set_discover_mode(DiscoverMode::General);
      self = self.set_classic_not_supported(true);
    }
    Ok(self)
  }
}

/// Advertisements consist of one or more ad type units in an LTV format.  Only the types this
/// peripheral emits are listed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum AdType {
  Flags = 0x01,
  CompleteServiceUuids16 = 0x03,
  CompleteServiceUuids128 = 0x07,
  CompleteLocalName = 0x09,
  ManufacturerData = 0xff,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PushError {
  CapacityExceeded,
  UuidInputError,
}

impl Display for PushError {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    match self {
      Self::CapacityExceeded => write!(f, "advertising payload capacity exceeded"),
      Self::UuidInputError => write!(f, "service UUID list empty or of mixed widths"),
    }
  }
}

const DISCOVER_MODE_MASK: u8 = 0b0000_0011;
const CLASSIC_NOT_SUPPORTED_MASK: u8 = 0b0000_0100;

/// Whether and how this peripheral is discovered.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum DiscoverMode {
  /// This device can only be discovered when a central device is following the limited
  /// discovery procedure.
  Limited = 0b0000_0001,

  /// General discovery.  This is the normal discovery mode that most customers would use.
  General = 0b0000_0010,

  /// Device is not discoverable (whether the device is connectable is determined independently).
  None = 0b0000_0000,
}

/// Represents the raw payload for an advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAdvertisement<const N: usize>(pub heapless::Vec<u8, N>);

impl<const N: usize> Deref for RawAdvertisement<N> {
  type Target = [u8];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

pub type AdvertisementPayload = RawAdvertisement<LEGACY_PDU_LEN>;
pub type ScanResponsePayload = RawAdvertisement<LEGACY_PDU_LEN>;

/// Advertising data: complete local name, flags (limited discoverable, no BR/EDR) and the
/// manufacturer record.
pub fn cage_advertising_data(config: &PeripheralConfig) -> Result<AdvertisementPayload, PushError> {
  let tag: heapless::Vec<u8, LEGACY_PDU_LEN> =
    config.manufacturer_tag.encode(config.device_name)?;
  AdvertisementPayloadBuilder::new()
    .push_local_name(config.device_name)?
    .set_discover_mode(DiscoverMode::Limited)
    .set_classic_not_supported(true)
    .push_manufacturer_data(advertising::MANUFACTURER_ID, &tag)?
    .build()
}

/// Scan response: the complete list of 128-bit service UUIDs, which is just the UART service.
pub fn cage_scan_response(service_uuid: UUID) -> Result<ScanResponsePayload, PushError> {
  AdvertisementPayloadBuilder::new()
    .without_flags()
    .push_complete_service_uuids(&[service_uuid])?
    .build()
}
