//! Wiring of real engine components to the in-process backends.

use std::sync::Arc;

use osign_audit::InMemoryAuditTrail;
use osign_config::EngineConfig;
use osign_core::{traits::IpLookup, SigningEngine, TextPageRenderer};
use osign_store::{InMemoryBlobStore, InMemoryOrderStore};

use crate::{collaborators::{RecordingNotifier, StaticIpLookup}, mock_data::SESSION_IP};

/// An engine plus inspectable handles to every backend it talks to.
pub struct ReferenceRuntime {
    pub engine: SigningEngine,
    pub store: Arc<InMemoryOrderStore>,
    pub blobs: Arc<InMemoryBlobStore>,
    pub audit: Arc<InMemoryAuditTrail>,
    pub notifier: Arc<RecordingNotifier>,
}

impl ReferenceRuntime {
    /// Default configuration, IP lookup answering `SESSION_IP`.
    pub fn new() -> Self {
        Self::from_config(EngineConfig::default())
    }

    /// `config`, IP lookup answering `SESSION_IP`.
    pub fn from_config(config: EngineConfig) -> Self {
        Self::with(config, Arc::new(StaticIpLookup::new(SESSION_IP)))
    }

    pub fn with(config: EngineConfig, ip_lookup: Arc<dyn IpLookup>) -> Self {
        let store = Arc::new(InMemoryOrderStore::new());
        let blobs = Arc::new(InMemoryBlobStore::new());
        let audit = Arc::new(InMemoryAuditTrail::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let renderer = Arc::new(TextPageRenderer::new(&config.assembly));

        let engine = SigningEngine::new(
            store.clone(),
            blobs.clone(),
            audit.clone(),
            notifier.clone(),
            ip_lookup,
            renderer,
            config,
        );

        Self { engine, store, blobs, audit, notifier }
    }
}

impl Default for ReferenceRuntime {
    fn default() -> Self {
        Self::new()
    }
}
