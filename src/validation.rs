use crate::errors::{AppError, AppResult};
use crate::models::{ConvertLeadRequest, LeadPatch, OpportunityPatch};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

const MAX_SCORE: u8 = 100;

pub fn is_valid_email(raw: &str) -> bool {
    EMAIL_PATTERN.is_match(raw.trim())
}

pub fn validate_lead_patch(patch: &LeadPatch) -> AppResult<()> {
    if let Some(email) = &patch.email {
        if !is_valid_email(email) {
            return Err(AppError::Validation(format!("Malformed email '{}'", email)));
        }
    }
    if let Some(score) = patch.score {
        if score > MAX_SCORE {
            return Err(AppError::Validation(format!(
                "Score must be between 0 and {} (got {})",
                MAX_SCORE, score
            )));
        }
    }
    require_non_blank("name", patch.name.as_deref())?;
    require_non_blank("company", patch.company.as_deref())?;
    Ok(())
}

pub fn validate_opportunity_patch(patch: &OpportunityPatch) -> AppResult<()> {
    if let Some(Some(amount)) = patch.amount {
        validate_amount(amount)?;
    }
    require_non_blank("name", patch.name.as_deref())?;
    require_non_blank("accountName", patch.account_name.as_deref())?;
    Ok(())
}

pub fn validate_convert_request(request: &ConvertLeadRequest) -> AppResult<()> {
    match request.amount {
        Some(amount) => validate_amount(amount),
        None => Ok(()),
    }
}

pub fn normalize_lead_patch(mut patch: LeadPatch) -> LeadPatch {
    patch.name = patch.name.map(|value| value.trim().to_string());
    patch.company = patch.company.map(|value| value.trim().to_string());
    patch.source = patch.source.map(|value| value.trim().to_string());
    patch.email = patch.email.map(|value| value.trim().to_ascii_lowercase());
    patch
}

pub fn normalize_opportunity_patch(mut patch: OpportunityPatch) -> OpportunityPatch {
    patch.name = patch.name.map(|value| value.trim().to_string());
    patch.account_name = patch.account_name.map(|value| value.trim().to_string());
    patch
}

fn validate_amount(amount: f64) -> AppResult<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::Validation(format!(
            "Amount must be a non-negative number (got {})",
            amount
        )));
    }
    Ok(())
}

fn require_non_blank(field: &str, value: Option<&str>) -> AppResult<()> {
    match value {
        Some(value) if value.trim().is_empty() => {
            Err(AppError::Validation(format!("{} must not be empty", field)))
        }
        _ => Ok(()),
    }
}
