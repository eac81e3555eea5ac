pub mod addresses;
pub mod errors;
pub mod library;
pub mod network;
pub mod pipeline;
pub mod stream;
pub mod word;

pub use addresses::{DataAddress, DataAddressMap, TaskAddress, TaskAddressMap};
pub use errors::{StimError, StimResult};
pub use network::NetworkLayer;
pub use word::Word;
