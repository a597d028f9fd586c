use core::num::NonZeroU16;
use core::fmt::Display;
use core::fmt::Formatter;

/// Attribute handle assigned by the stack.  Zero is reserved by ATT, so "not yet assigned" is
/// expressed as `Option<AttributeHandle>` rather than a magic value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AttributeHandle(pub NonZeroU16);

impl AttributeHandle {
  pub fn new(raw: u16) -> Option<Self> {
    NonZeroU16::new(raw).map(Self)
  }

  pub fn get(&self) -> u16 {
    self.0.get()
  }
}

impl Display for AttributeHandle {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    write!(f, "{:#06x}", self.get())
  }
}
