use crate::errors::AppResult;
use crate::models::{Lead, LeadStatus};
use rand::Rng;

const SEED_LEADS_JSON: &str = include_str!("seed_leads.json");

const NAMES: [&str; 15] = [
    "John Smith",
    "Sarah Johnson",
    "Mike Davis",
    "Emily Brown",
    "Chris Wilson",
    "Jessica Taylor",
    "David Anderson",
    "Lisa Martinez",
    "Robert Lee",
    "Amanda Clark",
    "Kevin Rodriguez",
    "Michelle White",
    "Brian Thompson",
    "Rachel Garcia",
    "Steven Miller",
];

const COMPANIES: [&str; 15] = [
    "Tech Corp",
    "Innovation Ltd",
    "Digital Solutions",
    "Future Systems",
    "Smart Enterprises",
    "NextGen Technologies",
    "Cloud Dynamics",
    "Data Insights",
    "Mobile First",
    "AI Innovations",
    "Blockchain Solutions",
    "Cyber Security Pro",
    "IoT Masters",
    "Machine Learning Labs",
    "DevOps Central",
];

const SOURCES: [&str; 5] = ["website", "referral", "social media", "cold email", "trade show"];

const OPEN_STATUSES: [LeadStatus; 4] = [
    LeadStatus::New,
    LeadStatus::Contacted,
    LeadStatus::Qualified,
    LeadStatus::Unqualified,
];

pub fn default_leads() -> AppResult<Vec<Lead>> {
    Ok(serde_json::from_str(SEED_LEADS_JSON)?)
}

pub fn generate_test_leads(count: usize) -> Vec<Lead> {
    let mut rng = rand::rng();
    (0..count)
        .map(|index| {
            let name = NAMES[rng.random_range(0..NAMES.len())];
            let company = COMPANIES[rng.random_range(0..COMPANIES.len())];
            Lead {
                id: format!("lead-{:03}", index + 1),
                name: name.to_string(),
                company: company.to_string(),
                email: derive_email(name, company),
                source: SOURCES[rng.random_range(0..SOURCES.len())].to_string(),
                score: rng.random_range(1..=100),
                status: OPEN_STATUSES[rng.random_range(0..OPEN_STATUSES.len())],
            }
        })
        .collect()
}

fn derive_email(name: &str, company: &str) -> String {
    let local = name.to_lowercase().replacen(' ', ".", 1);
    let domain: String = company
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    format!("{}@{}.com", local, domain)
}
