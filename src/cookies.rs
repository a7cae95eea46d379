pub mod jar;
pub mod token_store;

pub use jar::{CookieEntry, CookieJar};
pub use token_store::TokenStore;
