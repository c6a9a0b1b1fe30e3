use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Unqualified,
    Converted,
}

impl LeadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Qualified => "qualified",
            Self::Unqualified => "unqualified",
            Self::Converted => "converted",
        }
    }
}

impl FromStr for LeadStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> AppResult<Self> {
        match raw {
            "new" => Ok(Self::New),
            "contacted" => Ok(Self::Contacted),
            "qualified" => Ok(Self::Qualified),
            "unqualified" => Ok(Self::Unqualified),
            "converted" => Ok(Self::Converted),
            other => Err(AppError::Validation(format!("Unknown lead status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OpportunityStage {
    #[default]
    Prospecting,
    Qualification,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl OpportunityStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prospecting => "prospecting",
            Self::Qualification => "qualification",
            Self::Proposal => "proposal",
            Self::Negotiation => "negotiation",
            Self::ClosedWon => "closed-won",
            Self::ClosedLost => "closed-lost",
        }
    }
}

impl FromStr for OpportunityStage {
    type Err = AppError;

    fn from_str(raw: &str) -> AppResult<Self> {
        match raw {
            "prospecting" => Ok(Self::Prospecting),
            "qualification" => Ok(Self::Qualification),
            "proposal" => Ok(Self::Proposal),
            "negotiation" => Ok(Self::Negotiation),
            "closed-won" => Ok(Self::ClosedWon),
            "closed-lost" => Ok(Self::ClosedLost),
            other => Err(AppError::Validation(format!("Unknown opportunity stage '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub company: String,
    pub email: String,
    pub source: String,
    pub score: u8,
    pub status: LeadStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: String,
    pub name: String,
    pub stage: OpportunityStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    pub account_name: String,
    pub lead_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
}

impl LeadPatch {
    pub fn status(status: LeadStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Partial opportunity fields. `amount: Some(None)` clears the amount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<OpportunityStage>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertLeadRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub stage: OpportunityStage,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub account_name: Option<String>,
}

fn deserialize_present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

pub trait Entity: Clone + Send + Sync + 'static {
    type Patch: Clone + Send + Sync + 'static;

    const KIND: &'static str;

    fn id(&self) -> &str;

    fn merged(&self, patch: &Self::Patch) -> Self;

    fn validate_patch(patch: &Self::Patch) -> AppResult<()>;
}

impl Entity for Lead {
    type Patch = LeadPatch;

    const KIND: &'static str = "Lead";

    fn id(&self) -> &str {
        &self.id
    }

    fn merged(&self, patch: &LeadPatch) -> Self {
        Self {
            id: self.id.clone(),
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            company: patch.company.clone().unwrap_or_else(|| self.company.clone()),
            email: patch.email.clone().unwrap_or_else(|| self.email.clone()),
            source: patch.source.clone().unwrap_or_else(|| self.source.clone()),
            score: patch.score.unwrap_or(self.score),
            status: patch.status.unwrap_or(self.status),
        }
    }

    fn validate_patch(patch: &LeadPatch) -> AppResult<()> {
        crate::validation::validate_lead_patch(patch)
    }
}

impl Entity for Opportunity {
    type Patch = OpportunityPatch;

    const KIND: &'static str = "Opportunity";

    fn id(&self) -> &str {
        &self.id
    }

    fn merged(&self, patch: &OpportunityPatch) -> Self {
        Self {
            id: self.id.clone(),
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            stage: patch.stage.unwrap_or(self.stage),
            amount: match patch.amount {
                Some(amount) => amount,
                None => self.amount,
            },
            account_name: patch
                .account_name
                .clone()
                .unwrap_or_else(|| self.account_name.clone()),
            lead_id: self.lead_id.clone(),
        }
    }

    fn validate_patch(patch: &OpportunityPatch) -> AppResult<()> {
        crate::validation::validate_opportunity_patch(patch)
    }
}
