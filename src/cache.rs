pub mod bond_scoped;
pub mod fingerprint;
pub mod page_cache;

pub use bond_scoped::{BondKey, BondScopedCache};
pub use fingerprint::RequestFingerprint;
pub use page_cache::{CachedPage, PageCache};
