#![no_std]

extern crate alloc;

pub mod advertisement;
pub mod advertising;
pub mod att_error;
pub mod bluetooth_address;
pub mod bluetooth_error;
pub mod config;
pub mod descriptors;
pub mod error;
pub mod exchange;
pub mod gatt_connection;
pub mod gatt_server;
pub mod gatt_server_cb;
pub mod mtu;
pub mod peripheral;
pub mod stack;

pub mod prelude {
  pub use crate::advertisement::*;
  pub use crate::advertising::*;
  pub use crate::att_error::*;
  pub use crate::bluetooth_address::*;
  pub use crate::bluetooth_error::*;
  pub use crate::config::PeripheralConfig;
  pub use crate::descriptors::*;
  pub use crate::error::*;
  pub use crate::exchange::*;
  pub use crate::gatt_connection::*;
  pub use crate::gatt_server::*;
  pub use crate::gatt_server_cb::*;
  pub use crate::mtu::*;
  pub use crate::peripheral::*;
  pub use crate::stack::*;
}
