pub mod bond;
pub mod cache;
pub mod config;
pub mod cookies;
pub mod errors;
pub mod ordering;
pub mod page;
pub mod session;
pub mod transport;

pub use bond::{Bond, BondController, BondSwitchingSession};
pub use config::SessionConfig;
pub use errors::SessionError;
pub use page::Page;
pub use session::{RequestOptions, Session};
pub use transport::{HttpTransport, ProgressCallback, Transport, TransportRequest, TransportResponse};
