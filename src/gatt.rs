#[cfg(test)]
pub(crate) mod fake;
mod host;
mod profile;
mod transport;

pub use host::*;
pub use profile::*;
pub use transport::*;
