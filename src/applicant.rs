use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::VagaError;

/// The applicant on whose behalf applications are submitted.
///
/// Loaded from `applicant.toml`; the skills list feeds the local keyword
/// scorer and `default_answers` backs form fields no generated content
/// covers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub default_answers: BTreeMap<String, String>,
}

impl ApplicantProfile {
    pub fn load(path: &Path) -> Result<Self, VagaError> {
        let contents = std::fs::read_to_string(path)?;
        let profile = toml::from_str::<ApplicantProfile>(&contents)?;
        if profile.full_name.trim().is_empty() || profile.email.trim().is_empty() {
            return Err(VagaError::Config(
                "applicant profile needs at least full_name and email".to_string(),
            ));
        }
        Ok(profile)
    }

    /// Best value for a form field, matched against the field's name and
    /// label. Contact fields come from the profile itself; anything else is
    /// looked up in `default_answers`.
    pub fn answer_for(&self, field_name: &str, field_label: &str) -> Option<String> {
        let name = normalize(field_name);
        let label = normalize(field_label);
        let hit = |needle: &str| name.contains(needle) || label.contains(needle);

        if hit("name") {
            return Some(self.full_name.clone());
        }
        if hit("email") {
            return Some(self.email.clone());
        }
        if hit("phone") && !self.phone.is_empty() {
            return Some(self.phone.clone());
        }

        self.default_answers
            .iter()
            .find(|(key, _)| {
                let key = normalize(key);
                name.contains(&key) || label.contains(&key)
            })
            .map(|(_, value)| value.clone())
    }

    /// Fixed profile used by the offline demo and tests.
    pub fn sample() -> Self {
        Self {
            full_name: "Alex Moreira".into(),
            email: "alex.moreira@example.com".into(),
            phone: "+55 11 99999-0000".into(),
            headline: "Backend engineer focused on reliable async services".into(),
            skills: vec![
                "rust".into(),
                "tokio".into(),
                "async".into(),
                "distributed systems".into(),
            ],
            default_answers: BTreeMap::from([
                ("work_authorization".to_string(), "Authorized to work".to_string()),
                ("notice_period".to_string(), "Four weeks".to_string()),
            ]),
        }
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
