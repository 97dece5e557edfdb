pub mod error;
pub mod gatt;
pub mod lywsd03mmc;

pub use error::{Error, Result};
