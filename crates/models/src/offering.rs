use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ModelError, Violations};
use crate::validate::non_blank;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl std::str::FromStr for SkillLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            _ => Err(()),
        }
    }
}

/// Dependent record priced by `cost`; belongs to exactly one listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offering {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub weeks: String,
    pub cost: f64,
    pub minimum_skill: SkillLevel,
    #[serde(default)]
    pub scholarships_available: bool,
    pub listing_id: Uuid,
    pub created_by_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferingInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub weeks: Option<String>,
    pub cost: Option<f64>,
    pub minimum_skill: Option<String>,
    pub scholarships_available: Option<bool>,
}

impl OfferingInput {
    fn skill(&self, v: &mut Violations) -> Option<SkillLevel> {
        match non_blank(self.minimum_skill.as_deref()) {
            None => {
                v.push("Please add minimum skill requirement");
                None
            }
            Some(s) => match s.parse() {
                Ok(level) => Some(level),
                Err(()) => {
                    v.push("Minimum skill must be beginner, intermediate or advanced");
                    None
                }
            },
        }
    }
}

impl Offering {
    pub fn create(input: OfferingInput, listing_id: Uuid, owner: Uuid) -> Result<Self, ModelError> {
        let mut v = Violations::new();
        let skill = input.skill(&mut v);
        v.check(input.cost.is_some(), "Please add a cost");
        let offering = Offering {
            id: Uuid::new_v4(),
            title: input.title.as_deref().map(str::trim).unwrap_or_default().to_string(),
            description: input.description.unwrap_or_default(),
            weeks: input.weeks.unwrap_or_default(),
            cost: input.cost.unwrap_or(0.0),
            minimum_skill: skill.unwrap_or(SkillLevel::Beginner),
            scholarships_available: input.scholarships_available.unwrap_or(false),
            listing_id,
            created_by_user_id: owner,
            created_at: Utc::now(),
        };
        offering.collect_violations(&mut v);
        v.into_result()?;
        Ok(offering)
    }

    pub fn apply(&mut self, patch: OfferingInput) -> Result<(), ModelError> {
        let mut v = Violations::new();
        if patch.minimum_skill.is_some() {
            if let Some(level) = patch.skill(&mut v) {
                self.minimum_skill = level;
            }
        }
        if let Some(t) = patch.title { self.title = t.trim().to_string(); }
        if let Some(d) = patch.description { self.description = d; }
        if let Some(w) = patch.weeks { self.weeks = w; }
        if let Some(c) = patch.cost { self.cost = c; }
        if let Some(s) = patch.scholarships_available { self.scholarships_available = s; }
        self.collect_violations(&mut v);
        v.into_result()
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let mut v = Violations::new();
        self.collect_violations(&mut v);
        v.into_result()
    }

    fn collect_violations(&self, v: &mut Violations) {
        match non_blank(Some(&self.title)) {
            None => v.push("Please add an offering title"),
            Some(t) => v.check(t.chars().count() <= 50, "Title cannot be more than 50 characters"),
        }
        match non_blank(Some(&self.description)) {
            None => v.push("Please add a description"),
            Some(d) => v.check(d.chars().count() <= 500, "Description cannot be more than 500 characters"),
        }
        v.check(non_blank(Some(&self.weeks)).is_some(), "Please add number of weeks");
        v.check(self.cost.is_finite() && self.cost >= 0.0, "Cost must be a non-negative number");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(cost: f64) -> OfferingInput {
        OfferingInput {
            title: Some("Front End Web Development".into()),
            description: Some("HTML, CSS and JavaScript".into()),
            weeks: Some("8".into()),
            cost: Some(cost),
            minimum_skill: Some("beginner".into()),
            scholarships_available: Some(true),
        }
    }

    #[test]
    fn create_sets_references() {
        let (listing, owner) = (Uuid::new_v4(), Uuid::new_v4());
        let o = Offering::create(input(8000.0), listing, owner).unwrap();
        assert_eq!(o.listing_id, listing);
        assert_eq!(o.created_by_user_id, owner);
        assert_eq!(o.minimum_skill, SkillLevel::Beginner);
    }

    #[test]
    fn missing_cost_and_bad_skill_reported_together() {
        let mut i = input(1.0);
        i.cost = None;
        i.minimum_skill = Some("guru".into());
        match Offering::create(i, Uuid::new_v4(), Uuid::new_v4()).unwrap_err() {
            ModelError::Validation(msgs) => {
                assert_eq!(msgs.len(), 2);
                assert!(msgs.contains(&"Please add a cost".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn negative_cost_rejected_on_update() {
        let mut o = Offering::create(input(100.0), Uuid::new_v4(), Uuid::new_v4()).unwrap();
        assert!(o.apply(OfferingInput { cost: Some(-5.0), ..Default::default() }).is_err());
    }
}
