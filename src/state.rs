use crate::errors::AppResult;
use crate::models::{Entity, Lead, Opportunity};
use crate::optimistic::{apply_optimistic, SnapshotCell};
use crate::service::DataService;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub trait EntitySource<T: Entity>: Send + Sync {
    fn fetch_all(&self) -> impl Future<Output = AppResult<Vec<T>>> + Send;

    fn push_update(&self, id: &str, patch: T::Patch) -> impl Future<Output = AppResult<T>> + Send;
}

impl EntitySource<Lead> for DataService {
    async fn fetch_all(&self) -> AppResult<Vec<Lead>> {
        self.list_leads().await
    }

    async fn push_update(&self, id: &str, patch: crate::models::LeadPatch) -> AppResult<Lead> {
        self.update_lead(id, patch).await
    }
}

impl EntitySource<Opportunity> for DataService {
    async fn fetch_all(&self) -> AppResult<Vec<Opportunity>> {
        self.list_opportunities().await
    }

    async fn push_update(&self, id: &str, patch: crate::models::OpportunityPatch) -> AppResult<Opportunity> {
        self.update_opportunity(id, patch).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionState<T> {
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for CollectionState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

pub struct EntityState<T: Entity, S> {
    source: Arc<S>,
    state: Mutex<CollectionState<T>>,
}

pub type LeadsState = EntityState<Lead, DataService>;
pub type OpportunitiesState = EntityState<Opportunity, DataService>;

impl<T: Entity, S: EntitySource<T>> EntityState<T, S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            state: Mutex::new(CollectionState::default()),
        }
    }

    pub fn snapshot(&self) -> CollectionState<T> {
        self.lock().clone()
    }

    pub fn items(&self) -> Vec<T> {
        self.lock().items.clone()
    }

    pub fn with_items<R>(&self, read: impl FnOnce(&[T]) -> R) -> R {
        read(&self.lock().items)
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub async fn load(&self) -> AppResult<()> {
        {
            let mut state = self.lock();
            state.loading = true;
            state.error = None;
        }

        let result = self.source.fetch_all().await;

        let mut state = self.lock();
        state.loading = false;
        match result {
            Ok(items) => {
                state.items = items;
                Ok(())
            }
            Err(error) => {
                tracing::warn!(kind = T::KIND, error = %error, "failed to load collection");
                state.error = Some(error.to_string());
                Err(error)
            }
        }
    }

    pub async fn update(&self, id: &str, patch: T::Patch) -> AppResult<T> {
        T::validate_patch(&patch)?;
        let result = apply_optimistic(
            self,
            id,
            |current: &T| current.merged(&patch),
            self.source.push_update(id, patch.clone()),
        )
        .await;

        if let Err(error) = &result {
            tracing::warn!(kind = T::KIND, id = %id, error = %error, "optimistic update rolled back");
        }
        result
    }

    fn lock(&self) -> MutexGuard<'_, CollectionState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Entity, S: EntitySource<T>> SnapshotCell<T> for EntityState<T, S> {
    fn get_by_id(&self, id: &str) -> Option<T> {
        self.lock().items.iter().find(|item| item.id() == id).cloned()
    }

    fn replace(&self, id: &str, value: T) -> bool {
        let mut state = self.lock();
        match state.items.iter_mut().find(|item| item.id() == id) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}
