//! Explicit per-account client registry.
//!
//! Maps an account/session identifier to its owning client so command
//! handlers can locate the right client for a given zone entity. Owned by the
//! integration layer and passed around explicitly; there is no process-global
//! state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::client::FenixClient;

#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<String, Arc<FenixClient>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<String, Arc<FenixClient>>> {
        match self.clients.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn insert(&self, account_id: impl Into<String>, client: Arc<FenixClient>) {
        self.clients().insert(account_id.into(), client);
    }

    pub fn get(&self, account_id: &str) -> Option<Arc<FenixClient>> {
        self.clients().get(account_id).cloned()
    }

    pub fn remove(&self, account_id: &str) -> Option<Arc<FenixClient>> {
        self.clients().remove(account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(smarthome_id: &str) -> Arc<FenixClient> {
        Arc::new(FenixClient::new("a@b.c", "pw", smarthome_id, "en_GB"))
    }

    #[test]
    fn accounts_resolve_to_their_own_client() {
        let registry = ClientRegistry::new();
        registry.insert("entry-1", client("SH1"));
        registry.insert("entry-2", client("SH2"));

        assert_eq!(registry.get("entry-1").unwrap().smarthome_id(), "SH1");
        assert_eq!(registry.get("entry-2").unwrap().smarthome_id(), "SH2");
        assert!(registry.get("entry-3").is_none());
    }

    #[test]
    fn removed_accounts_are_gone() {
        let registry = ClientRegistry::new();
        registry.insert("entry-1", client("SH1"));
        assert!(registry.remove("entry-1").is_some());
        assert!(registry.get("entry-1").is_none());
        assert!(registry.remove("entry-1").is_none());
    }
}
