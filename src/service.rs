use crate::config::LatencyProfile;
use crate::errors::{AppError, AppResult};
use crate::models::{
    ConvertLeadRequest, Entity, Lead, LeadPatch, LeadStatus, Opportunity, OpportunityPatch,
};
use crate::seed::default_leads;
use crate::store::{encode_json, load_json, save_json, KeyValueStore, LEADS_KEY, OPPORTUNITIES_KEY};
use crate::validation::{normalize_lead_patch, normalize_opportunity_patch, validate_convert_request};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct Collections {
    leads: Vec<Lead>,
    opportunities: Vec<Opportunity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum IntegrityViolation {
    OrphanOpportunity { opportunity_id: String, lead_id: String },
    UnconvertedLead { opportunity_id: String, lead_id: String },
    MissingOpportunity { lead_id: String },
    DuplicateOpportunities { lead_id: String, count: usize },
}

pub struct DataService {
    store: Arc<dyn KeyValueStore>,
    latency: LatencyProfile,
    cache: RwLock<Collections>,
}

impl DataService {
    pub fn open(store: Arc<dyn KeyValueStore>, latency: LatencyProfile) -> AppResult<Self> {
        let collections = load_collections(store.as_ref())?;
        let violations = find_violations(&collections);
        if !violations.is_empty() {
            tracing::warn!(count = violations.len(), ?violations, "stored collections violate conversion links");
        }
        tracing::info!(
            leads = collections.leads.len(),
            opportunities = collections.opportunities.len(),
            "data service initialized"
        );

        Ok(Self {
            store,
            latency,
            cache: RwLock::new(collections),
        })
    }

    pub async fn list_leads(&self) -> AppResult<Vec<Lead>> {
        simulate_latency(self.latency.list_leads()).await;
        let cache = self.cache.read().await;
        tracing::debug!(count = cache.leads.len(), "listing leads");
        Ok(cache.leads.clone())
    }

    pub async fn list_opportunities(&self) -> AppResult<Vec<Opportunity>> {
        simulate_latency(self.latency.list_opportunities()).await;
        let cache = self.cache.read().await;
        tracing::debug!(count = cache.opportunities.len(), "listing opportunities");
        Ok(cache.opportunities.clone())
    }

    pub async fn update_lead(&self, id: &str, patch: LeadPatch) -> AppResult<Lead> {
        simulate_latency(self.latency.update()).await;
        Lead::validate_patch(&patch)?;
        let patch = normalize_lead_patch(patch);

        let mut cache = self.cache.write().await;
        let index = position(&cache.leads, id)?;
        guard_status_transition(&cache.leads[index], &patch)?;

        let updated = cache.leads[index].merged(&patch);
        let mut leads = cache.leads.clone();
        leads[index] = updated.clone();
        save_json(self.store.as_ref(), LEADS_KEY, &leads)?;
        cache.leads = leads;

        tracing::debug!(lead_id = %id, status = updated.status.as_str(), "lead updated");
        Ok(updated)
    }

    pub async fn update_opportunity(&self, id: &str, patch: OpportunityPatch) -> AppResult<Opportunity> {
        simulate_latency(self.latency.update()).await;
        Opportunity::validate_patch(&patch)?;
        let patch = normalize_opportunity_patch(patch);

        let mut cache = self.cache.write().await;
        let index = position(&cache.opportunities, id)?;

        let updated = cache.opportunities[index].merged(&patch);
        let mut opportunities = cache.opportunities.clone();
        opportunities[index] = updated.clone();
        save_json(self.store.as_ref(), OPPORTUNITIES_KEY, &opportunities)?;
        cache.opportunities = opportunities;

        tracing::debug!(opportunity_id = %id, stage = updated.stage.as_str(), "opportunity updated");
        Ok(updated)
    }

    pub async fn convert_lead(&self, lead_id: &str, request: ConvertLeadRequest) -> AppResult<Opportunity> {
        simulate_latency(self.latency.convert()).await;
        validate_convert_request(&request)?;

        let mut cache = self.cache.write().await;
        let index = position(&cache.leads, lead_id)?;
        let lead = &cache.leads[index];
        if lead.status == LeadStatus::Converted {
            return Err(AppError::Validation(format!("Lead {} is already converted", lead_id)));
        }

        let opportunity = Opportunity {
            id: next_opportunity_id(&cache.opportunities),
            name: non_blank(request.name).unwrap_or_else(|| format!("{} - {}", lead.name, lead.company)),
            stage: request.stage,
            amount: request.amount,
            account_name: non_blank(request.account_name).unwrap_or_else(|| lead.company.clone()),
            lead_id: lead_id.to_string(),
        };

        let mut leads = cache.leads.clone();
        leads[index].status = LeadStatus::Converted;
        let mut opportunities = cache.opportunities.clone();
        opportunities.push(opportunity.clone());

        let written = self.store.put_many(&[
            (OPPORTUNITIES_KEY, encode_json(&opportunities)?),
            (LEADS_KEY, encode_json(&leads)?),
        ]);
        if let Err(error) = written {
            tracing::error!(lead_id = %lead_id, error = %error, "lead conversion was not persisted");
            return Err(error);
        }
        cache.leads = leads;
        cache.opportunities = opportunities;

        tracing::info!(lead_id = %lead_id, opportunity_id = %opportunity.id, "lead converted");
        Ok(opportunity)
    }

    pub async fn reset_all(&self) -> AppResult<()> {
        let collections = Collections {
            leads: default_leads()?,
            opportunities: Vec::new(),
        };
        let mut cache = self.cache.write().await;
        self.store.put_many(&[
            (LEADS_KEY, encode_json(&collections.leads)?),
            (OPPORTUNITIES_KEY, encode_json(&collections.opportunities)?),
        ])?;
        *cache = collections;
        tracing::info!("console data reset to seed state");
        Ok(())
    }

    pub async fn clear_storage(&self) -> AppResult<()> {
        let mut cache = self.cache.write().await;
        self.store.remove_many(&[LEADS_KEY, OPPORTUNITIES_KEY])?;
        *cache = load_collections(self.store.as_ref())?;
        tracing::info!("console storage cleared");
        Ok(())
    }

    pub async fn verify_integrity(&self) -> Vec<IntegrityViolation> {
        let cache = self.cache.read().await;
        find_violations(&cache)
    }
}

fn load_collections(store: &dyn KeyValueStore) -> AppResult<Collections> {
    let leads = match load_json::<Vec<Lead>>(store, LEADS_KEY)? {
        Some(leads) => leads,
        None => {
            let seed = default_leads()?;
            save_json(store, LEADS_KEY, &seed)?;
            tracing::info!(count = seed.len(), "seeded lead collection");
            seed
        }
    };
    let opportunities = load_json::<Vec<Opportunity>>(store, OPPORTUNITIES_KEY)?.unwrap_or_default();
    Ok(Collections { leads, opportunities })
}

fn find_violations(collections: &Collections) -> Vec<IntegrityViolation> {
    let leads: HashMap<&str, &Lead> = collections
        .leads
        .iter()
        .map(|lead| (lead.id.as_str(), lead))
        .collect();
    let mut per_lead: HashMap<&str, usize> = HashMap::new();
    let mut violations = Vec::new();

    for opportunity in &collections.opportunities {
        *per_lead.entry(opportunity.lead_id.as_str()).or_insert(0) += 1;
        match leads.get(opportunity.lead_id.as_str()) {
            None => violations.push(IntegrityViolation::OrphanOpportunity {
                opportunity_id: opportunity.id.clone(),
                lead_id: opportunity.lead_id.clone(),
            }),
            Some(lead) if lead.status != LeadStatus::Converted => {
                violations.push(IntegrityViolation::UnconvertedLead {
                    opportunity_id: opportunity.id.clone(),
                    lead_id: opportunity.lead_id.clone(),
                })
            }
            Some(_) => {}
        }
    }

    for lead in collections.leads.iter().filter(|lead| lead.status == LeadStatus::Converted) {
        match per_lead.get(lead.id.as_str()).copied().unwrap_or(0) {
            0 => violations.push(IntegrityViolation::MissingOpportunity {
                lead_id: lead.id.clone(),
            }),
            1 => {}
            count => violations.push(IntegrityViolation::DuplicateOpportunities {
                lead_id: lead.id.clone(),
                count,
            }),
        }
    }

    violations
}

fn guard_status_transition(current: &Lead, patch: &LeadPatch) -> AppResult<()> {
    let Some(next) = patch.status else {
        return Ok(());
    };
    let was_converted = current.status == LeadStatus::Converted;
    if was_converted != (next == LeadStatus::Converted) {
        return Err(AppError::Validation(format!(
            "Lead {} cannot move from {} to {} by direct edit",
            current.id,
            current.status.as_str(),
            next.as_str()
        )));
    }
    Ok(())
}

fn position<T: Entity>(items: &[T], id: &str) -> AppResult<usize> {
    items
        .iter()
        .position(|item| item.id() == id)
        .ok_or_else(|| AppError::NotFound(format!("{} {} not found", T::KIND, id)))
}

fn next_opportunity_id(existing: &[Opportunity]) -> String {
    loop {
        let suffix = Uuid::new_v4().simple().to_string();
        let candidate = format!("opp-{}-{}", Utc::now().timestamp_millis(), &suffix[..9]);
        if !existing.iter().any(|opportunity| opportunity.id == candidate) {
            return candidate;
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

async fn simulate_latency(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::{DataService, IntegrityViolation};
    use crate::config::LatencyProfile;
    use crate::errors::{AppError, AppResult};
    use crate::models::{ConvertLeadRequest, LeadPatch, LeadStatus, OpportunityPatch, OpportunityStage};
    use crate::seed::default_leads;
    use crate::store::{KeyValueStore, MemoryStore, LEADS_KEY, OPPORTUNITIES_KEY};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct SwitchableStore {
        inner: MemoryStore,
        reject_writes: AtomicBool,
    }

    impl SwitchableStore {
        fn reject_writes(&self, reject: bool) {
            self.reject_writes.store(reject, Ordering::SeqCst);
        }

        fn check(&self) -> AppResult<()> {
            if self.reject_writes.load(Ordering::SeqCst) {
                return Err(AppError::Persistence("quota exceeded".to_string()));
            }
            Ok(())
        }
    }

    impl KeyValueStore for SwitchableStore {
        fn get(&self, key: &str) -> AppResult<Option<String>> {
            self.inner.get(key)
        }

        fn put(&self, key: &str, value: &str) -> AppResult<()> {
            self.check()?;
            self.inner.put(key, value)
        }

        fn remove(&self, key: &str) -> AppResult<()> {
            self.check()?;
            self.inner.remove(key)
        }

        fn put_many(&self, entries: &[(&str, String)]) -> AppResult<()> {
            self.check()?;
            self.inner.put_many(entries)
        }
    }

    #[derive(Default)]
    struct LockedOpportunitiesStore {
        inner: MemoryStore,
    }

    impl KeyValueStore for LockedOpportunitiesStore {
        fn get(&self, key: &str) -> AppResult<Option<String>> {
            self.inner.get(key)
        }

        fn put(&self, key: &str, value: &str) -> AppResult<()> {
            self.inner.put(key, value)
        }

        fn remove(&self, key: &str) -> AppResult<()> {
            if key == OPPORTUNITIES_KEY {
                return Err(AppError::Persistence("locked".to_string()));
            }
            self.inner.remove(key)
        }
    }

    fn open(store: Arc<dyn KeyValueStore>) -> DataService {
        DataService::open(store, LatencyProfile::none()).expect("open data service")
    }

    fn first_lead_id() -> String {
        default_leads().expect("seed")[0].id.clone()
    }

    #[tokio::test]
    async fn seeds_and_persists_leads_on_first_open() {
        let store = Arc::new(MemoryStore::new());
        let service = open(store.clone());

        let leads = service.list_leads().await.expect("list leads");
        assert_eq!(leads, default_leads().expect("seed"));
        assert!(store.get(LEADS_KEY).expect("get").is_some());
        assert!(service.list_opportunities().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn corrupt_collections_fall_back_to_defaults() {
        let store = Arc::new(MemoryStore::new());
        store.put(LEADS_KEY, "[{broken").expect("put");
        store.put(OPPORTUNITIES_KEY, "42").expect("put");

        let service = open(store.clone());
        assert_eq!(service.list_leads().await.expect("list").len(), default_leads().expect("seed").len());
        assert!(service.list_opportunities().await.expect("list").is_empty());

        let rewritten = store.get(LEADS_KEY).expect("get").expect("leads persisted");
        assert!(rewritten.starts_with('['));
        assert!(serde_json::from_str::<serde_json::Value>(&rewritten).is_ok());
    }

    #[tokio::test]
    async fn listing_twice_is_deep_equal() {
        let service = open(Arc::new(MemoryStore::new()));
        let first = service.list_leads().await.expect("first");
        let second = service.list_leads().await.expect("second");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn snapshots_are_independent_copies() {
        let service = open(Arc::new(MemoryStore::new()));
        let mut snapshot = service.list_leads().await.expect("list");
        snapshot[0].name = "Mutated Locally".to_string();
        snapshot.clear();
        let fresh = service.list_leads().await.expect("list");
        assert_eq!(fresh, default_leads().expect("seed"));
    }

    #[tokio::test]
    async fn update_lead_is_read_back_and_durable() {
        let store = Arc::new(MemoryStore::new());
        let service = open(store.clone());
        let id = first_lead_id();

        let updated = service
            .update_lead(&id, LeadPatch::status(LeadStatus::Qualified))
            .await
            .expect("update");
        assert_eq!(updated.status, LeadStatus::Qualified);

        let listed = service.list_leads().await.expect("list");
        assert!(listed.iter().any(|lead| lead.id == id && lead.status == LeadStatus::Qualified));

        let reopened = open(store);
        let reloaded = reopened.list_leads().await.expect("list");
        assert!(reloaded.iter().any(|lead| lead.id == id && lead.status == LeadStatus::Qualified));
    }

    #[tokio::test]
    async fn update_lead_normalizes_fields() {
        let service = open(Arc::new(MemoryStore::new()));
        let id = first_lead_id();
        let updated = service
            .update_lead(
                &id,
                LeadPatch {
                    email: Some(" John.Smith@Example.COM ".to_string()),
                    company: Some("  Acme  ".to_string()),
                    ..LeadPatch::default()
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.email, "john.smith@example.com");
        assert_eq!(updated.company, "Acme");
    }

    #[tokio::test]
    async fn update_unknown_ids_fail_with_not_found() {
        let service = open(Arc::new(MemoryStore::new()));
        let error = service
            .update_lead("lead-999", LeadPatch::status(LeadStatus::New))
            .await
            .expect_err("missing lead");
        assert!(matches!(error, AppError::NotFound(_)));

        let error = service
            .update_opportunity("opp-missing", OpportunityPatch::default())
            .await
            .expect_err("missing opportunity");
        assert!(matches!(error, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_write_leaves_cache_untouched() {
        let store = Arc::new(SwitchableStore::default());
        let service = open(store.clone());
        let before = service.list_leads().await.expect("list");

        store.reject_writes(true);
        let error = service
            .update_lead(&first_lead_id(), LeadPatch::status(LeadStatus::Contacted))
            .await
            .expect_err("write rejected");
        assert!(matches!(error, AppError::Persistence(_)));
        assert_eq!(service.list_leads().await.expect("list"), before);
    }

    #[tokio::test]
    async fn direct_edit_cannot_enter_converted_status() {
        let service = open(Arc::new(MemoryStore::new()));
        let error = service
            .update_lead(&first_lead_id(), LeadPatch::status(LeadStatus::Converted))
            .await
            .expect_err("direct conversion");
        assert!(matches!(error, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn convert_applies_both_effects_with_defaults() {
        let store = Arc::new(MemoryStore::new());
        let service = open(store.clone());
        let lead = default_leads().expect("seed")[0].clone();

        let opportunity = service
            .convert_lead(&lead.id, ConvertLeadRequest::default())
            .await
            .expect("convert");
        assert_eq!(opportunity.lead_id, lead.id);
        assert_eq!(opportunity.amount, None);
        assert_eq!(opportunity.account_name, lead.company);
        assert_eq!(opportunity.name, format!("{} - {}", lead.name, lead.company));
        assert_eq!(opportunity.stage, OpportunityStage::Prospecting);
        assert!(opportunity.id.starts_with("opp-"));

        let leads = service.list_leads().await.expect("list");
        assert!(leads.iter().any(|l| l.id == lead.id && l.status == LeadStatus::Converted));
        let opportunities = service.list_opportunities().await.expect("list");
        assert_eq!(opportunities, vec![opportunity.clone()]);
        assert!(service.verify_integrity().await.is_empty());

        let reopened = open(store);
        assert_eq!(reopened.list_opportunities().await.expect("list"), vec![opportunity]);
    }

    #[tokio::test]
    async fn convert_keeps_explicit_fields() {
        let service = open(Arc::new(MemoryStore::new()));
        let opportunity = service
            .convert_lead(
                &first_lead_id(),
                ConvertLeadRequest {
                    name: Some("Enterprise rollout".to_string()),
                    stage: OpportunityStage::Proposal,
                    amount: Some(25_000.0),
                    account_name: Some("Holding Group".to_string()),
                },
            )
            .await
            .expect("convert");
        assert_eq!(opportunity.name, "Enterprise rollout");
        assert_eq!(opportunity.amount, Some(25_000.0));
        assert_eq!(opportunity.account_name, "Holding Group");
        assert_eq!(opportunity.stage, OpportunityStage::Proposal);
    }

    #[tokio::test]
    async fn convert_rejects_unknown_and_already_converted_leads() {
        let service = open(Arc::new(MemoryStore::new()));
        let error = service
            .convert_lead("lead-404", ConvertLeadRequest::default())
            .await
            .expect_err("unknown lead");
        assert!(matches!(error, AppError::NotFound(_)));

        let id = first_lead_id();
        service
            .convert_lead(&id, ConvertLeadRequest::default())
            .await
            .expect("first conversion");
        let error = service
            .convert_lead(&id, ConvertLeadRequest::default())
            .await
            .expect_err("second conversion");
        assert!(matches!(error, AppError::Validation(_)));
        assert_eq!(service.list_opportunities().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn failed_conversion_changes_neither_collection() {
        let store = Arc::new(SwitchableStore::default());
        let service = open(store.clone());
        let id = first_lead_id();

        store.reject_writes(true);
        let error = service
            .convert_lead(&id, ConvertLeadRequest::default())
            .await
            .expect_err("conversion rejected");
        assert!(matches!(error, AppError::Persistence(_)));

        let leads = service.list_leads().await.expect("list");
        assert!(leads.iter().all(|lead| lead.status != LeadStatus::Converted));
        assert!(service.list_opportunities().await.expect("list").is_empty());

        store.reject_writes(false);
        let reopened = open(store);
        assert!(reopened.list_opportunities().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn update_opportunity_can_clear_amount() {
        let service = open(Arc::new(MemoryStore::new()));
        let opportunity = service
            .convert_lead(
                &first_lead_id(),
                ConvertLeadRequest {
                    amount: Some(900.0),
                    ..ConvertLeadRequest::default()
                },
            )
            .await
            .expect("convert");

        let updated = service
            .update_opportunity(
                &opportunity.id,
                OpportunityPatch {
                    stage: Some(OpportunityStage::Negotiation),
                    amount: Some(None),
                    ..OpportunityPatch::default()
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.stage, OpportunityStage::Negotiation);
        assert_eq!(updated.amount, None);
        assert_eq!(updated.lead_id, opportunity.lead_id);
    }

    #[tokio::test]
    async fn reset_and_clear_restore_seed_state() {
        let store = Arc::new(MemoryStore::new());
        let service = open(store.clone());
        let id = first_lead_id();
        service
            .convert_lead(&id, ConvertLeadRequest::default())
            .await
            .expect("convert");

        service.reset_all().await.expect("reset");
        assert_eq!(service.list_leads().await.expect("list"), default_leads().expect("seed"));
        assert!(service.list_opportunities().await.expect("list").is_empty());

        service
            .update_lead(&id, LeadPatch::status(LeadStatus::Unqualified))
            .await
            .expect("update");
        service.clear_storage().await.expect("clear");
        assert_eq!(service.list_leads().await.expect("list"), default_leads().expect("seed"));
        assert!(store.get(LEADS_KEY).expect("get").is_some());
        assert!(store.get(OPPORTUNITIES_KEY).expect("get").is_none());
    }

    #[tokio::test]
    async fn integrity_check_reports_broken_links() {
        let store = Arc::new(MemoryStore::new());
        let mut leads = default_leads().expect("seed");
        leads[1].status = LeadStatus::Converted;
        store
            .put(LEADS_KEY, &serde_json::to_string(&leads).expect("encode"))
            .expect("put");
        store
            .put(
                OPPORTUNITIES_KEY,
                r#"[{"id":"opp-1","name":"x","stage":"proposal","accountName":"y","leadId":"lead-404"}]"#,
            )
            .expect("put");

        let service = open(store);
        let violations = service.verify_integrity().await;
        assert!(violations.contains(&IntegrityViolation::OrphanOpportunity {
            opportunity_id: "opp-1".to_string(),
            lead_id: "lead-404".to_string(),
        }));
        assert!(violations.contains(&IntegrityViolation::MissingOpportunity {
            lead_id: leads[1].id.clone(),
        }));
    }

    #[tokio::test]
    async fn failed_clear_keeps_both_collections() {
        let store = Arc::new(LockedOpportunitiesStore::default());
        let service = open(store.clone());
        let id = first_lead_id();
        service
            .convert_lead(&id, ConvertLeadRequest::default())
            .await
            .expect("convert");
        let leads_before = service.list_leads().await.expect("list");

        let error = service.clear_storage().await.expect_err("clear rejected");
        assert_eq!(error.code(), "PERSISTENCE_FAILURE");
        assert_eq!(service.list_leads().await.expect("list"), leads_before);

        let reopened = open(store);
        assert_eq!(reopened.list_leads().await.expect("list"), leads_before);
        assert_eq!(reopened.list_opportunities().await.expect("list").len(), 1);
        assert!(reopened.verify_integrity().await.is_empty());
    }
}
