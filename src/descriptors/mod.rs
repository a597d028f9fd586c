/// Descriptors define the structure of the service table.  They are plain data; the only state
/// they carry is the attribute handles the stack assigns while the table is created.
pub mod attribute_handle;
pub mod gatt_characteristic;
pub mod gatt_descriptor;
pub mod gatt_service;
pub mod uuid;

pub use attribute_handle::*;
pub use gatt_characteristic::*;
pub use gatt_descriptor::*;
pub use gatt_service::*;
pub use uuid::*;
