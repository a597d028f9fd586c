//! Static configuration of the CAGE UART peripheral.

use core::time::Duration;

use crate::advertisement::{AdvertisingParams, ManufacturerTag};
use crate::gatt_connection::ConnectionParams;

/// Device identity.
pub mod device {
  /// Name assigned through GAP and carried in the advertising payload.
  pub const NAME: &str = "CAGE";

  /// Application id used when registering the GATT server profile.
  pub const APP_ID: u16 = 0;

  /// Local ATT MTU requested at bring-up.  The peer may still negotiate lower.
  pub const LOCAL_MTU: u16 = 500;
}

/// 128-bit identifiers of the Nordic UART service layout.
pub mod uuids {
  pub const SERVICE: u128 = 0x6E40_0001_B5A3_F393_E0A9_E50E_24DC_CA9E;
  /// Central writes commands here.
  pub const RX_CHARACTERISTIC: u128 = 0x6E40_0002_B5A3_F393_E0A9_E50E_24DC_CA9E;
  /// Peripheral pushes responses here.
  pub const TX_CHARACTERISTIC: u128 = 0x6E40_0003_B5A3_F393_E0A9_E50E_24DC_CA9E;
  /// Client Characteristic Configuration Descriptor (SIG assigned).
  pub const CLIENT_CONFIG: u16 = 0x2902;
}

pub mod advertising {
  /// 0.625 ms units (20 ms).
  pub const INTERVAL_MIN_UNITS: u16 = 0x20;
  /// 0.625 ms units (40 ms).
  pub const INTERVAL_MAX_UNITS: u16 = 0x40;

  /// Company identifier placed in front of the manufacturer data record.
  pub const MANUFACTURER_ID: u16 = 0x0059;

  /// Serial number placeholder until provisioning writes a real one.
  pub const SERIAL_PLACEHOLDER: [u8; 6] = *b"000000";
  pub const STATUS: u8 = b'F';
}

pub mod connection {
  /// 1.25 ms units (20 ms).
  pub const INTERVAL_MIN_UNITS: u16 = 0x10;
  /// 1.25 ms units (40 ms).
  pub const INTERVAL_MAX_UNITS: u16 = 0x20;
  pub const LATENCY: u16 = 0;
  /// 10 ms units (4000 ms).
  pub const SUPERVISION_TIMEOUT_UNITS: u16 = 400;
}

pub mod command {
  /// Writes shorter than this are dropped without running the executor.
  pub const MIN_LENGTH: usize = 3;
}

/// Runtime view of the constants above.  [Default] yields exactly the values compiled in, other
/// values are mostly useful to tests and bench setups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralConfig {
  pub device_name: &'static str,
  pub app_id: u16,
  pub local_mtu: u16,
  pub manufacturer_tag: ManufacturerTag,
  pub advertising: AdvertisingParams,
  pub connection: ConnectionParams,
}

impl Default for PeripheralConfig {
  fn default() -> Self {
    Self {
      device_name: device::NAME,
      app_id: device::APP_ID,
      local_mtu: device::LOCAL_MTU,
      manufacturer_tag: ManufacturerTag {
        serial: advertising::SERIAL_PLACEHOLDER,
        status: advertising::STATUS,
      },
      advertising: AdvertisingParams::from_units(
        advertising::INTERVAL_MIN_UNITS,
        advertising::INTERVAL_MAX_UNITS,
      ),
      connection: ConnectionParams {
        interval_min: units_to_duration(connection::INTERVAL_MIN_UNITS, 1250),
        interval_max: units_to_duration(connection::INTERVAL_MAX_UNITS, 1250),
        latency: connection::LATENCY,
        supervision_timeout: units_to_duration(connection::SUPERVISION_TIMEOUT_UNITS, 10_000),
      },
    }
  }
}

/// Converts a count of stack time units, each `unit_us` microseconds long.
pub(crate) const fn units_to_duration(units: u16, unit_us: u64) -> Duration {
  Duration::from_micros(units as u64 * unit_us)
}

/// Inverse of [units_to_duration], saturating at `u16::MAX`.
pub(crate) fn duration_to_units(duration: Duration, unit_us: u64) -> u16 {
  let units = duration.as_micros() / u128::from(unit_us);
  u16::try_from(units).unwrap_or(u16::MAX)
}
