use core::fmt::{Display, Formatter};

/// Public or static device address as delivered by the stack, most significant byte first.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BluetoothAddress(pub [u8; 6]);

impl Display for BluetoothAddress {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    let [a, b, c, d, e, g] = self.0;
    write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
  }
}
