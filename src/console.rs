use crate::config::ConsoleConfig;
use crate::errors::AppResult;
use crate::filters::{FilterKey, LeadFilterState, LeadFilters};
use crate::models::{ConvertLeadRequest, Lead, LeadPatch, Opportunity, OpportunityPatch};
use crate::pagination::{Page, Paginator};
use crate::service::DataService;
use crate::state::{CollectionState, EntityState, LeadsState, OpportunitiesState};
use crate::store::KeyValueStore;
use std::sync::Arc;

pub struct Console {
    service: Arc<DataService>,
    leads: LeadsState,
    opportunities: OpportunitiesState,
    filters: LeadFilterState,
    lead_pages: Paginator,
}

impl Console {
    pub fn open(store: Arc<dyn KeyValueStore>, config: &ConsoleConfig) -> AppResult<Self> {
        let service = Arc::new(DataService::open(store.clone(), config.latency)?);
        Ok(Self {
            leads: EntityState::new(service.clone()),
            opportunities: EntityState::new(service.clone()),
            filters: LeadFilterState::load(store),
            lead_pages: Paginator::new(config.default_page_size)?,
            service,
        })
    }

    pub fn service(&self) -> &Arc<DataService> {
        &self.service
    }

    pub fn leads(&self) -> CollectionState<Lead> {
        self.leads.snapshot()
    }

    pub fn opportunities(&self) -> CollectionState<Opportunity> {
        self.opportunities.snapshot()
    }

    pub async fn load_all(&self) -> AppResult<()> {
        let (leads, opportunities) = tokio::join!(self.leads.load(), self.opportunities.load());
        leads.and(opportunities)
    }

    pub async fn load_leads(&self) -> AppResult<()> {
        self.leads.load().await
    }

    pub async fn update_lead(&self, id: &str, patch: LeadPatch) -> AppResult<Lead> {
        self.leads.update(id, patch).await
    }

    pub async fn load_opportunities(&self) -> AppResult<()> {
        self.opportunities.load().await
    }

    pub async fn update_opportunity(&self, id: &str, patch: OpportunityPatch) -> AppResult<Opportunity> {
        self.opportunities.update(id, patch).await
    }

    pub async fn convert_lead(&self, lead_id: &str, request: ConvertLeadRequest) -> AppResult<Opportunity> {
        let opportunity = self.service.convert_lead(lead_id, request).await?;
        if let Err(error) = self.load_all().await {
            tracing::warn!(lead_id = %lead_id, error = %error, "refresh after conversion failed");
        }
        Ok(opportunity)
    }

    pub fn filters(&self) -> &LeadFilters {
        self.filters.filters()
    }

    pub fn update_filter(&mut self, key: &str, value: &str) -> AppResult<()> {
        let key: FilterKey = key.parse()?;
        self.filters.update_filter(key, value)
    }

    pub fn visible_leads(&self) -> Vec<Lead> {
        self.leads.with_items(|items| self.filters.apply(items))
    }

    pub fn leads_page(&self) -> Page<Lead> {
        self.lead_pages.view(&self.visible_leads())
    }

    pub fn go_to_page(&mut self, page: usize) -> usize {
        let total = self.visible_leads().len();
        self.lead_pages.go_to_page(page, total)
    }

    pub fn change_page_size(&mut self, page_size: usize) -> AppResult<()> {
        self.lead_pages.change_page_size(page_size)
    }

    pub async fn reset_all(&self) -> AppResult<()> {
        self.service.reset_all().await?;
        self.load_all().await
    }

    pub async fn clear_storage(&self) -> AppResult<()> {
        self.service.clear_storage().await?;
        self.load_all().await
    }
}
