use core::fmt::{Display, Formatter};

/// HCI reason codes that end a connection, as reported with the disconnect event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BluetoothError {
  /// The link supervision timeout expired; the peer went out of range or powered off silently.
  SupervisionTimeout,
  AuthFailure,
  PinOrKeyMissing,
  ClosedByPeer(RemoteShutdownReason),
  ClosedLocally,
  ConnectionLimitExceeded,
  EncryptionNotAcceptable,
  UnacceptableParameters,
  FailedToEstablish,
  Other(u8),
}

impl From<u8> for BluetoothError {
  fn from(value: u8) -> Self {
    match value {
      0x05 => BluetoothError::AuthFailure,
      0x06 => BluetoothError::PinOrKeyMissing,
      0x08 => BluetoothError::SupervisionTimeout,
      0x09 => BluetoothError::ConnectionLimitExceeded,
      0x13 => BluetoothError::ClosedByPeer(RemoteShutdownReason::NoneGiven),
      0x14 => BluetoothError::ClosedByPeer(RemoteShutdownReason::LowResources),
      0x15 => BluetoothError::ClosedByPeer(RemoteShutdownReason::PowerOff),
      0x16 => BluetoothError::ClosedLocally,
      0x25 => BluetoothError::EncryptionNotAcceptable,
      0x3b => BluetoothError::UnacceptableParameters,
      0x3e => BluetoothError::FailedToEstablish,
      o => BluetoothError::Other(o),
    }
  }
}

impl From<BluetoothError> for u8 {
  fn from(value: BluetoothError) -> Self {
    match value {
      BluetoothError::AuthFailure => 0x05,
      BluetoothError::PinOrKeyMissing => 0x06,
      BluetoothError::SupervisionTimeout => 0x08,
      BluetoothError::ConnectionLimitExceeded => 0x09,
      BluetoothError::ClosedByPeer(r) => match r {
        RemoteShutdownReason::NoneGiven => 0x13,
        RemoteShutdownReason::LowResources => 0x14,
        RemoteShutdownReason::PowerOff => 0x15,
      },
      BluetoothError::ClosedLocally => 0x16,
      BluetoothError::EncryptionNotAcceptable => 0x25,
      BluetoothError::UnacceptableParameters => 0x3b,
      BluetoothError::FailedToEstablish => 0x3e,
      BluetoothError::Other(o) => o,
    }
  }
}

impl Display for BluetoothError {
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    match self {
      Self::SupervisionTimeout => write!(f, "supervision timeout"),
      Self::AuthFailure => write!(f, "authentication failure"),
      Self::PinOrKeyMissing => write!(f, "PIN or key missing"),
      Self::ClosedByPeer(reason) => write!(f, "closed by peer ({reason:?})"),
      Self::ClosedLocally => write!(f, "closed locally"),
      Self::ConnectionLimitExceeded => write!(f, "connection limit exceeded"),
      Self::EncryptionNotAcceptable => write!(f, "encryption not acceptable"),
      Self::UnacceptableParameters => write!(f, "unacceptable connection parameters"),
      Self::FailedToEstablish => write!(f, "connection failed to be established"),
      Self::Other(code) => write!(f, "HCI reason {code:#04x}"),
    }
  }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RemoteShutdownReason {
  NoneGiven,
  LowResources,
  PowerOff,
}
