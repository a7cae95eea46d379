use std::sync::Mutex;

use url::Url;

use crate::cache::BondKey;

/// A server-side selectable identity. The same URL renders different content
/// depending on which bond is active, so the client has to track it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bond {
    /// URL whose GET (plus redirects) makes this identity active server-side.
    /// `None` is the default/primary identity, which needs no switch.
    pub switch_url: Option<Url>,
}

impl Bond {
    /// The default identity the portal lands on after login.
    pub fn primary() -> Self {
        Self { switch_url: None }
    }

    pub fn new(switch_url: Url) -> Self {
        Self {
            switch_url: Some(switch_url),
        }
    }

    /// Cache/identity key for this bond.
    pub fn key(&self) -> BondKey {
        self.switch_url.as_ref().map(Url::to_string)
    }
}

/// Tracks which bond is currently active server-side. Mutated only after a
/// successful switch sequence.
#[derive(Debug, Default)]
pub struct BondController {
    current: Mutex<BondKey>,
}

impl BondController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_bond(&self) -> BondKey {
        self.current.lock().unwrap().clone()
    }

    pub fn set_current_bond(&self, bond: BondKey) {
        *self.current.lock().unwrap() = bond;
    }
}
