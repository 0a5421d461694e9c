//! A [`Client`] for making remote calls, correlating replies without
//! blocking the underlying connection.

mod call;
pub use self::call::Call;

mod client;
pub use self::client::Client;

mod response;
pub use self::response::ClientResponse;

mod slot;
pub use self::slot::Slot;
