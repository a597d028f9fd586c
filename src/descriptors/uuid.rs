use core::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UUID {
  /// For use only with SIG defined services (i.e. registered and publicly well known services).
  Short(u16),

  /// All other BLE UUIDs must be 128-bit
  Long(u128),
}

impl UUID {
  pub fn as_u128(&self) -> u128 {
    match *self {
      UUID::Short(u) => u.into(),
      UUID::Long(u) => u,
    }
  }

  /// Number of bytes this UUID occupies on the air.
  pub fn byte_len(&self) -> usize {
    match self {
      UUID::Short(_) => 2,
      UUID::Long(_) => 16,
    }
  }

  /// Append the little-endian wire encoding.  Fails without writing anything if `out` lacks room.
  pub fn push_into<const N: usize>(&self, out: &mut heapless::Vec<u8, N>) -> Result<(), ()> {
    match *self {
      UUID::Short(u) => out.extend_from_slice(&u.to_le_bytes()),
      UUID::Long(u) => out.extend_from_slice(&u.to_le_bytes()),
    }
  }
}

impl Display for UUID {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    match *self {
      UUID::Short(u) => write!(f, "{u:04x}"),
      UUID::Long(u) => write!(
        f,
        "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
        u >> 96,
        (u >> 80) & 0xffff,
        (u >> 64) & 0xffff,
        (u >> 48) & 0xffff,
        u & 0xffff_ffff_ffff
      ),
    }
  }
}

#[cfg(test)]
mod tests {
  extern crate std;

  use std::string::ToString;

  use super::*;

  #[test]
  fn test_long_uuid_wire_order() {
    let mut out = heapless::Vec::<u8, 16>::new();
    UUID::Long(crate::config::uuids::SERVICE).push_into(&mut out).unwrap();
    assert_eq!(
      out.as_slice(),
      [
        0x9e, 0xca, 0xdc, 0x24, 0x0e, 0xe5, 0xa9, 0xe0, 0x93, 0xf3, 0xa3, 0xb5, 0x01, 0x00, 0x40,
        0x6e,
      ]
    );
  }

  #[test]
  fn test_push_without_room() {
    let mut out = heapless::Vec::<u8, 4>::new();
    assert!(UUID::Long(1).push_into(&mut out).is_err());
    assert!(out.is_empty());
  }

  #[test]
  fn test_display() {
    assert_eq!(
      UUID::Long(crate::config::uuids::TX_CHARACTERISTIC).to_string(),
      "6e400003-b5a3-f393-e0a9-e50e24dcca9e"
    );
    assert_eq!(UUID::Short(0x2902).to_string(), "2902");
  }
}
