use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use crate::bond::{Bond, BondController};
use crate::errors::SessionError;
use crate::page::Page;
use crate::session::{RequestOptions, Session};
use crate::transport::ProgressCallback;

/// Wraps a [`Session`] so that every operation declares which bond it
/// belongs to; a mismatch with the active bond triggers the switch sequence
/// before the operation runs.
///
/// The cache identity is repointed *before* the switch network call so a
/// concurrently scheduled read can never be served from the wrong identity's
/// cache mid-switch. If the sequence does not terminate on a 200 the guarded
/// operation is never attempted and the active bond (and cache pointer) stay
/// where they were, so the next call retries the switch.
pub struct BondSwitchingSession {
    session: Arc<Session>,
    controller: BondController,
    switch_gate: tokio::sync::Mutex<()>,
}

impl BondSwitchingSession {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            controller: BondController::new(),
            switch_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// The wrapped session, for operations that are bond-agnostic.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn current_bond(&self) -> Option<String> {
        self.controller.current_bond()
    }

    pub async fn get(
        &self,
        bond: &Bond,
        path: &str,
        options: &RequestOptions,
    ) -> Result<Page, SessionError> {
        self.ensure_bond(bond).await?;
        self.session.get(path, options).await
    }

    pub async fn post(
        &self,
        bond: &Bond,
        path: &str,
        form: &[(&str, &str)],
        options: &RequestOptions,
    ) -> Result<Page, SessionError> {
        self.ensure_bond(bond).await?;
        self.session.post(path, form, options).await
    }

    pub async fn download_by_get(
        &self,
        bond: &Bond,
        path: &str,
        dest: &Path,
        progress: Option<ProgressCallback>,
        options: &RequestOptions,
    ) -> Result<PathBuf, SessionError> {
        self.ensure_bond(bond).await?;
        self.session
            .download_by_get(path, dest, progress, options)
            .await
    }

    pub async fn download_by_post(
        &self,
        bond: &Bond,
        path: &str,
        form: &[(&str, &str)],
        dest: &Path,
        progress: Option<ProgressCallback>,
        options: &RequestOptions,
    ) -> Result<PathBuf, SessionError> {
        self.ensure_bond(bond).await?;
        self.session
            .download_by_post(path, form, dest, progress, options)
            .await
    }

    pub async fn follow_all_redirects(
        &self,
        bond: &Bond,
        page: Page,
    ) -> Result<Page, SessionError> {
        self.ensure_bond(bond).await?;
        self.session.follow_all_redirects(page).await
    }

    pub async fn close(&self) {
        self.session.close().await;
    }

    /// Make `bond` the active server-side identity, if it is not already.
    async fn ensure_bond(&self, bond: &Bond) -> Result<(), SessionError> {
        let _gate = self.switch_gate.lock().await;

        let target = bond.key();
        if self.controller.current_bond() == target {
            return Ok(());
        }

        // Repoint the cache first; reads scheduled during the switch must not
        // see the old identity's pages.
        self.session.cache().set_current_bond(target.clone());

        if let Some(switch_url) = &bond.switch_url {
            debug!("bond: switching via {switch_url}");
            let sequence = async {
                let first = self
                    .session
                    .get_url(switch_url, &RequestOptions::no_cache())
                    .await?;
                let terminal = self.session.follow_all_redirects(first).await?;
                if terminal.status != 200 {
                    return Err(SessionError::BondSwitchFailed(terminal.status));
                }
                Ok(())
            };
            if let Err(e) = sequence.await {
                // The server identity did not change; point the cache back.
                self.session
                    .cache()
                    .set_current_bond(self.controller.current_bond());
                return Err(e);
            }
        }

        self.controller.set_current_bond(target);
        Ok(())
    }
}
