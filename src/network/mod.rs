pub mod address;
pub mod transport;

pub use transport::{HttpTransport, Transport};
