//! Catalog of saved flows.
//!
//! [`FlowCatalog`] owns the ordered list of [`FlowListItem`]s and the id of the active flow.
//! Both are persisted as independent JSON entries whenever they change. Flow bodies are written
//! by the store; the catalog only loads them on activation and removes them on deletion.

use crate::constants::{ACTIVE_FLOW_KEY, FLOW_ID_PREFIX, FLOW_LIST_KEY};
use crate::error::StoreError;
use crate::storage::{self, KeyValueStore};
use crate::store::FlowStore;
use crate::types::{FlowListItem, FlowMetadataUpdate, FlowType};
use chrono::Utc;
use uuid::Uuid;

/// Saved-flow catalog and activation state.
#[derive(Debug, Clone, Default)]
pub struct FlowCatalog {
    flows: Vec<FlowListItem>,
    active_flow_id: Option<String>,
}

impl FlowCatalog {
    /// Restores the catalog from storage and activates a flow in `store`.
    ///
    /// A stored active id that does not name a catalog entry is replaced by the first entry.
    /// With an empty catalog the store is left on its unpersisted placeholder flow.
    pub fn open<S: KeyValueStore>(store: &mut FlowStore<S>) -> Result<Self, StoreError> {
        let flows: Vec<FlowListItem> =
            storage::read_json(store.storage_mut(), FLOW_LIST_KEY).unwrap_or_default();
        let stored_active: Option<String> =
            storage::read_json::<Option<String>>(store.storage_mut(), ACTIVE_FLOW_KEY).flatten();

        let active = match stored_active {
            Some(id) if flows.iter().any(|f| f.id == id) => Some(id),
            Some(id) => {
                log::warn!("Stored active flow '{id}' is not in the catalog");
                flows.first().map(|f| f.id.clone())
            }
            None => flows.first().map(|f| f.id.clone()),
        };

        log::info!("Opened flow catalog with {} flows", flows.len());
        let mut catalog = Self {
            flows,
            active_flow_id: None,
        };
        catalog.set_active_flow(store, active.as_deref())?;
        Ok(catalog)
    }

    pub fn flows(&self) -> &[FlowListItem] {
        &self.flows
    }

    pub fn active_flow_id(&self) -> Option<&str> {
        self.active_flow_id.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&FlowListItem> {
        self.flows.iter().find(|f| f.id == id)
    }

    /// Adds a new empty flow to the catalog and activates it.
    ///
    /// `flow_type` must name a container definition in the store's registry.
    ///
    /// # Returns
    ///
    /// The generated flow id.
    pub fn create_flow<S: KeyValueStore>(
        &mut self,
        store: &mut FlowStore<S>,
        name: impl Into<String>,
        description: impl Into<String>,
        flow_type: impl Into<FlowType>,
    ) -> Result<String, StoreError> {
        let flow_type = flow_type.into();
        store.require_flow_type(&flow_type)?;
        let now = Utc::now();
        let item = FlowListItem {
            id: format!("{FLOW_ID_PREFIX}{}", Uuid::new_v4().simple()),
            name: name.into(),
            description: description.into(),
            flow_type,
            created_at: now,
            updated_at: now,
        };
        let id = item.id.clone();
        log::info!("Adding flow '{}' ({id}) to catalog", item.name);

        self.flows.push(item);
        if let Err(err) = self.save_list(store) {
            self.flows.pop();
            return Err(err);
        }
        self.set_active_flow(store, Some(&id))?;
        Ok(id)
    }

    /// Activates a flow, or clears the activation with `None`.
    ///
    /// A catalog flow with a persisted body is loaded verbatim; one without gets a fresh empty
    /// body built from its catalog metadata. An id missing from the catalog behaves like `None`.
    pub fn set_active_flow<S: KeyValueStore>(
        &mut self,
        store: &mut FlowStore<S>,
        id: Option<&str>,
    ) -> Result<(), StoreError> {
        let item = match id {
            Some(id) => {
                let item = self.get(id).cloned();
                if item.is_none() {
                    log::warn!("Cannot activate flow '{id}': not in catalog");
                }
                item
            }
            None => None,
        };

        match item {
            Some(item) => {
                match storage::load_flow(store.storage_mut(), &item.id) {
                    Some(saved) => store.load_flow_state(saved),
                    None => {
                        log::info!("No saved body for flow '{}', starting empty", item.id);
                        store.create_new_flow(
                            item.id.clone(),
                            item.name.clone(),
                            item.description.clone(),
                            item.flow_type.clone(),
                        )?;
                    }
                }
                self.active_flow_id = Some(item.id);
            }
            None => {
                store.reset_to_placeholder();
                self.active_flow_id = None;
            }
        }
        self.save_active(store)
    }

    /// Removes a flow and its persisted body.
    ///
    /// If it was active, the first remaining flow is activated, or the placeholder when none
    /// remain.
    ///
    /// # Returns
    ///
    /// `Ok(false)` if no such flow exists.
    pub fn delete_flow<S: KeyValueStore>(
        &mut self,
        store: &mut FlowStore<S>,
        id: &str,
    ) -> Result<bool, StoreError> {
        let Some(index) = self.flows.iter().position(|f| f.id == id) else {
            log::warn!("Cannot delete flow '{id}': not in catalog");
            return Ok(false);
        };

        let removed = self.flows.remove(index);
        storage::delete_flow(store.storage_mut(), &removed.id)?;
        self.save_list(store)?;
        log::info!("Deleted flow '{}' ({})", removed.name, removed.id);

        if self.active_flow_id.as_deref() == Some(id) {
            let next = self.flows.first().map(|f| f.id.clone());
            self.set_active_flow(store, next.as_deref())?;
        }
        Ok(true)
    }

    /// Updates catalog metadata of a flow and forwards the changed fields to the store when
    /// the flow is active.
    ///
    /// # Returns
    ///
    /// `Ok(true)` if any field changed.
    pub fn update_flow<S: KeyValueStore>(
        &mut self,
        store: &mut FlowStore<S>,
        id: &str,
        update: FlowMetadataUpdate,
    ) -> Result<bool, StoreError> {
        let Some(item) = self.flows.iter_mut().find(|f| f.id == id) else {
            log::warn!("Cannot update flow '{id}': not in catalog");
            return Err(StoreError::FlowNotFound(id.to_string()));
        };
        if let Some(flow_type) = &update.flow_type {
            store.require_flow_type(flow_type)?;
        }

        let mut changed = FlowMetadataUpdate::default();
        if let Some(name) = update.name {
            if item.name != name {
                item.name = name.clone();
                changed.name = Some(name);
            }
        }
        if let Some(description) = update.description {
            if item.description != description {
                item.description = description.clone();
                changed.description = Some(description);
            }
        }
        if let Some(flow_type) = update.flow_type {
            if item.flow_type != flow_type {
                item.flow_type = flow_type.clone();
                changed.flow_type = Some(flow_type);
            }
        }
        if changed.is_empty() {
            return Ok(false);
        }
        item.updated_at = Utc::now();

        self.save_list(store)?;
        if self.active_flow_id.as_deref() == Some(id) {
            store.update_flow_metadata(changed)?;
        }
        Ok(true)
    }

    fn save_list<S: KeyValueStore>(&self, store: &mut FlowStore<S>) -> Result<(), StoreError> {
        storage::write_json(store.storage_mut(), FLOW_LIST_KEY, &self.flows)?;
        Ok(())
    }

    /// Writes the active id, or removes the entry when no flow is active.
    fn save_active<S: KeyValueStore>(&self, store: &mut FlowStore<S>) -> Result<(), StoreError> {
        match &self.active_flow_id {
            Some(id) => storage::write_json(store.storage_mut(), ACTIVE_FLOW_KEY, id)?,
            None => store.storage_mut().remove(ACTIVE_FLOW_KEY)?,
        }
        Ok(())
    }
}
