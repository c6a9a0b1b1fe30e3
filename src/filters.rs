use crate::errors::{AppError, AppResult};
use crate::models::{Lead, LeadStatus};
use crate::store::{load_json, save_json, KeyValueStore, FILTERS_KEY};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Score,
    Name,
    Company,
}

impl FromStr for SortField {
    type Err = AppError;

    fn from_str(raw: &str) -> AppResult<Self> {
        match raw {
            "score" => Ok(Self::Score),
            "name" => Ok(Self::Name),
            "company" => Ok(Self::Company),
            other => Err(AppError::Validation(format!("Unknown sort field '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(raw: &str) -> AppResult<Self> {
        match raw {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(AppError::Validation(format!("Unknown sort order '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKey {
    Search,
    Status,
    SortBy,
    SortOrder,
}

impl FromStr for FilterKey {
    type Err = AppError;

    fn from_str(raw: &str) -> AppResult<Self> {
        match raw {
            "search" => Ok(Self::Search),
            "status" => Ok(Self::Status),
            "sortBy" => Ok(Self::SortBy),
            "sortOrder" => Ok(Self::SortOrder),
            other => Err(AppError::Validation(format!("Unknown filter key '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeadFilters {
    pub search: String,
    #[serde(with = "status_filter")]
    pub status: Option<LeadStatus>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl Default for LeadFilters {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: None,
            sort_by: SortField::Score,
            sort_order: SortOrder::Desc,
        }
    }
}

impl LeadFilters {
    pub fn with(&self, key: FilterKey, value: &str) -> AppResult<Self> {
        let mut next = self.clone();
        match key {
            FilterKey::Search => next.search = value.to_string(),
            FilterKey::Status => {
                next.status = match value {
                    "" => None,
                    raw => Some(raw.parse()?),
                }
            }
            FilterKey::SortBy => next.sort_by = value.parse()?,
            FilterKey::SortOrder => next.sort_order = value.parse()?,
        }
        Ok(next)
    }
}

mod status_filter {
    use crate::models::LeadStatus;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<LeadStatus>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.map(LeadStatus::as_str).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<LeadStatus>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse().map(Some).map_err(serde::de::Error::custom)
    }
}

pub fn filter_leads(leads: &[Lead], criteria: &LeadFilters) -> Vec<Lead> {
    let needle = criteria.search.to_lowercase();
    let mut filtered: Vec<Lead> = leads
        .iter()
        .filter(|lead| lead.status != LeadStatus::Converted)
        .filter(|lead| {
            needle.is_empty()
                || lead.name.to_lowercase().contains(&needle)
                || lead.company.to_lowercase().contains(&needle)
        })
        .filter(|lead| criteria.status.map_or(true, |status| lead.status == status))
        .cloned()
        .collect();

    filtered.sort_by(|a, b| {
        let ordering = match criteria.sort_by {
            SortField::Score => a.score.cmp(&b.score),
            SortField::Name => locale_compare(&a.name, &b.name),
            SortField::Company => locale_compare(&a.company, &b.company),
        };
        match criteria.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
    filtered
}

fn locale_compare(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

pub struct LeadFilterState {
    store: Arc<dyn KeyValueStore>,
    filters: LeadFilters,
}

impl LeadFilterState {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let filters = match load_json::<LeadFilters>(store.as_ref(), FILTERS_KEY) {
            Ok(saved) => saved.unwrap_or_default(),
            Err(error) => {
                tracing::warn!(error = %error, "could not read saved lead filters");
                LeadFilters::default()
            }
        };
        Self { store, filters }
    }

    pub fn filters(&self) -> &LeadFilters {
        &self.filters
    }

    /// Applies the change in memory, then persists it. A persistence failure is returned
    /// but the new criteria stay in effect for this session.
    pub fn update_filter(&mut self, key: FilterKey, value: &str) -> AppResult<()> {
        self.filters = self.filters.with(key, value)?;
        if let Err(error) = save_json(self.store.as_ref(), FILTERS_KEY, &self.filters) {
            tracing::warn!(error = %error, "could not persist lead filters");
            return Err(error);
        }
        Ok(())
    }

    pub fn apply(&self, leads: &[Lead]) -> Vec<Lead> {
        filter_leads(leads, &self.filters)
    }
}
