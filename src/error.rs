use core::fmt::{Display, Formatter};

/// Non-success status reported by the transport stack, either from a completion event or from
/// the synchronous return of a request.  The raw code is kept for diagnostics only; nothing in
/// this crate branches on its value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StackError {
  pub code: u16,
}

impl StackError {
  pub fn new(code: u16) -> Self {
    Self { code }
  }

  /// Maps a raw stack status where zero means success.
  pub fn check(code: u16) -> Result<(), Self> {
    match code {
      0 => Ok(()),
      code => Err(Self { code }),
    }
  }
}

impl Display for StackError {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    write!(f, "stack status {:#06x}", self.code)
  }
}

/// Outcome of a stack completion event.
pub type StackStatus = Result<(), StackError>;
