//! Engine facade
//!
//! Wires one store, one cache and one ontology into the lifecycle and
//! partition services. Every collaborator is injected; nothing is global.

use ilm_cache::{CacheKey, QueryCache};
use ilm_lifecycle::LifecycleService;
use ilm_model::{
    ElementFilter, EntityKind, GraphStore, ItemId, LotError, LotId, LotResult, StoreClient,
};
use ilm_partition::PartitionService;
use ilm_validation::{GateOutcome, GatePipeline, Ontology, RuleSet};
use std::sync::Arc;

use crate::config::{ConfigError, EngineConfig};
use crate::hierarchy::{ItemHierarchy, LotNode};

/// Cache namespace of hierarchy views under an item scope
pub const HIERARCHY_NAMESPACE: &str = "hierarchy";

/// Inspection-lot engine
#[derive(Debug)]
pub struct InspectionEngine {
    config: EngineConfig,
    store: StoreClient,
    cache: Arc<QueryCache>,
    lifecycle: LifecycleService,
    partition: PartitionService,
}

impl InspectionEngine {
    /// Build engine, loading ontology rules from `config.ontology_path` or
    /// the bundled set
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the rules cannot be
    /// loaded
    pub fn new(config: EngineConfig, store: Arc<dyn GraphStore>) -> Result<Self, ConfigError> {
        let rules = match &config.ontology_path {
            Some(path) => RuleSet::load(path)?,
            None => RuleSet::bundled()?,
        };
        Self::with_ontology(config, store, Arc::new(rules))
    }

    /// Build engine with an explicit ontology
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn with_ontology(
        config: EngineConfig,
        store: Arc<dyn GraphStore>,
        ontology: Arc<dyn Ontology>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let cache = Arc::new(QueryCache::new(config.cache)?);
        let store = StoreClient::new(store).with_timeout(config.store_timeout());
        let gates = GatePipeline::new(store.clone(), ontology).with_config(config.gates);
        let lifecycle = LifecycleService::new(store.clone(), Arc::clone(&cache), gates)
            .with_policy(config.roles.clone());
        let partition = PartitionService::new(store.clone(), Arc::clone(&cache));

        tracing::info!(
            cache_max_size = config.cache.max_size,
            store_timeout_ms = config.store_timeout_ms,
            semantic_gate = config.gates.semantic,
            "inspection engine ready"
        );

        Ok(Self {
            config,
            store,
            cache,
            lifecycle,
            partition,
        })
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Lot lifecycle operations
    #[inline]
    #[must_use]
    pub fn lifecycle(&self) -> &LifecycleService {
        &self.lifecycle
    }

    /// Partition preview and commit
    #[inline]
    #[must_use]
    pub fn partition(&self) -> &PartitionService {
        &self.partition
    }

    /// Shared query cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Timeout-bounded store handle
    #[inline]
    #[must_use]
    pub fn store(&self) -> &StoreClient {
        &self.store
    }

    /// Item with its lots and their members, served cache-aside
    ///
    /// # Errors
    /// - `NotFound` for an unknown item
    /// - `Store` when the graph store fails
    pub async fn item_hierarchy(&self, item_id: &ItemId) -> LotResult<ItemHierarchy> {
        let compute = move || async move {
            let item = self
                .store
                .item(item_id)
                .await?
                .ok_or_else(|| LotError::not_found(EntityKind::Item, item_id))?;

            let mut lots = Vec::new();
            for lot in self.store.lots_for_item(item_id).await? {
                let members = self
                    .store
                    .elements(&ElementFilter::Lot(lot.id.clone()))
                    .await?
                    .into_iter()
                    .map(|element| element.id)
                    .collect();
                lots.push(LotNode::new(lot, members));
            }

            tracing::debug!(item_id = %item_id, lots = lots.len(), "hierarchy computed");
            Ok::<_, LotError>(ItemHierarchy {
                item_id: item.id,
                name: item.name,
                lots,
            })
        };

        match CacheKey::derive(&item_id.cache_scope(), HIERARCHY_NAMESPACE, &()) {
            Ok(key) => self.cache.get_or_try_insert_with(&key, None, compute).await,
            Err(error) => {
                tracing::warn!(%error, "hierarchy key not derivable; computing uncached");
                compute().await
            }
        }
    }

    /// Run the approval gates over a lot without changing its status
    ///
    /// # Errors
    /// - `NotFound` for an unknown lot
    /// - `Store` when the graph store fails
    pub async fn check_lot(&self, lot_id: &LotId) -> LotResult<GateOutcome> {
        if self.store.lot(lot_id).await?.is_none() {
            return Err(LotError::not_found(EntityKind::Lot, lot_id));
        }
        let members = self
            .store
            .elements(&ElementFilter::Lot(lot_id.clone()))
            .await?;
        Ok(self.lifecycle.gates().run(lot_id, &members).await?)
    }
}
