use core::fmt::{Display, Formatter};

/// ATT error codes a GATT server may answer a request with.  The success case is modelled by
/// [GattResponse] being `Ok`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum AttError {
  InvalidHandle = 0x01,
  ReadNotPermitted = 0x02,
  WriteNotPermitted = 0x03,
  InvalidPdu = 0x04,
  InsufficientAuthentication = 0x05,
  RequestNotSupported = 0x06,
  InvalidOffset = 0x07,
  InsufficientAuthorization = 0x08,
  PrepareQueueFull = 0x09,
  AttributeNotFound = 0x0A,
  AttributeTooLong = 0x0B,
  InsufficientKeySize = 0x0C,
  InvalidAttributeValueLength = 0x0D,
  Unlikely = 0x0E,
  InsufficientEncryption = 0x0F,
  UnsupportedGroupType = 0x10,
  InsufficientResources = 0x11,
}

/// Status carried by a send-response request.
pub type GattResponse = Result<(), AttError>;

impl AttError {
  pub fn code(self) -> u8 {
    self as u8
  }

  /// Wire status byte of a response, `0x00` meaning success.
  pub fn response_code(response: GattResponse) -> u8 {
    response.err().map_or(0, Self::code)
  }
}

impl Display for AttError {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    let msg = match self {
      Self::InvalidHandle => "invalid handle",
      Self::ReadNotPermitted => "read not permitted",
      Self::WriteNotPermitted => "write not permitted",
      Self::InvalidPdu => "invalid PDU",
      Self::InsufficientAuthentication => "insufficient authentication",
      Self::RequestNotSupported => "request not supported",
      Self::InvalidOffset => "invalid offset",
      Self::InsufficientAuthorization => "insufficient authorization",
      Self::PrepareQueueFull => "prepare queue full",
      Self::AttributeNotFound => "attribute not found",
      Self::AttributeTooLong => "attribute too long",
      Self::InsufficientKeySize => "insufficient key size",
      Self::InvalidAttributeValueLength => "invalid attribute value length",
      Self::Unlikely => "unlikely error",
      Self::InsufficientEncryption => "insufficient encryption",
      Self::UnsupportedGroupType => "unsupported group type",
      Self::InsufficientResources => "insufficient resources",
    };
    write!(f, "{msg} ({:#04x})", self.code())
  }
}
