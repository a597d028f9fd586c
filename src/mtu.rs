use core::fmt::{Display, Formatter};

/// ATT header bytes that come out of every notification.
const ATT_HEADER_LEN: u16 = 3;

/// Holder type to clarify a frequent gotcha with BLE around the true ATT MTU size.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Mtu {
  negotiated_mtu: u16,
}

impl Default for Mtu {
  /// Minimum ATT MTU every LE link starts with before an exchange.
  fn default() -> Self {
    Self::new(23)
  }
}

impl Display for Mtu {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    write!(f, "{}", self.negotiated_mtu)
  }
}

impl Mtu {
  pub fn new(negotiated_mtu: u16) -> Self {
    Self { negotiated_mtu }
  }

  /// Largest notification payload that goes out without truncation.
  pub fn usable_value(&self) -> u16 {
    self.negotiated_mtu.saturating_sub(ATT_HEADER_LEN)
  }

  pub fn fits(&self, payload_len: usize) -> bool {
    payload_len <= usize::from(self.usable_value())
  }
}
