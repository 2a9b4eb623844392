use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ModelError, Violations};
use crate::validate::{is_email, is_http_url, non_blank, slugify};

pub const CAREERS: [&str; 6] = [
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

/// Parent record. `average_cost` and `average_rating` are derived from the
/// listing's offerings and reviews and are never taken from client input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub address: String,
    pub careers: Vec<String>,
    #[serde(default)]
    pub average_cost: Option<f64>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    pub photo: String,
    #[serde(default)]
    pub housing: bool,
    #[serde(default)]
    pub job_guarantee: bool,
    #[serde(default)]
    pub accept_gi: bool,
    pub created_by_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Client-writable listing fields, used for both create and partial update.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub careers: Option<Vec<String>>,
    pub photo: Option<String>,
    pub housing: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

impl Listing {
    pub fn create(input: ListingInput, owner: Uuid) -> Result<Self, ModelError> {
        let name = input.name.as_deref().map(str::trim).unwrap_or_default().to_string();
        let listing = Listing {
            id: Uuid::new_v4(),
            slug: slugify(&name),
            name,
            description: input.description.unwrap_or_default(),
            website: input.website,
            phone: input.phone,
            email: input.email,
            address: input.address.unwrap_or_default(),
            careers: input.careers.unwrap_or_default(),
            average_cost: None,
            average_rating: None,
            photo: input.photo.unwrap_or_else(|| DEFAULT_PHOTO.to_string()),
            housing: input.housing.unwrap_or(false),
            job_guarantee: input.job_guarantee.unwrap_or(false),
            accept_gi: input.accept_gi.unwrap_or(false),
            created_by_user_id: owner,
            created_at: Utc::now(),
        };
        listing.validate()?;
        Ok(listing)
    }

    /// Overwrite the fields present in `patch`, then re-validate the whole record.
    pub fn apply(&mut self, patch: ListingInput) -> Result<(), ModelError> {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
            self.slug = slugify(&self.name);
        }
        if let Some(v) = patch.description { self.description = v; }
        if let Some(v) = patch.website { self.website = Some(v); }
        if let Some(v) = patch.phone { self.phone = Some(v); }
        if let Some(v) = patch.email { self.email = Some(v); }
        if let Some(v) = patch.address { self.address = v; }
        if let Some(v) = patch.careers { self.careers = v; }
        if let Some(v) = patch.photo { self.photo = v; }
        if let Some(v) = patch.housing { self.housing = v; }
        if let Some(v) = patch.job_guarantee { self.job_guarantee = v; }
        if let Some(v) = patch.accept_gi { self.accept_gi = v; }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let mut v = Violations::new();
        match non_blank(Some(&self.name)) {
            None => v.push("Please add a name"),
            Some(name) => v.check(name.chars().count() <= 50, "Name cannot be more than 50 characters"),
        }
        match non_blank(Some(&self.description)) {
            None => v.push("Please write a brief description"),
            Some(d) => v.check(d.chars().count() <= 500, "Description cannot be more than 500 characters"),
        }
        if let Some(site) = &self.website {
            v.check(is_http_url(site), "Please use a valid http(s) url");
        }
        if let Some(phone) = &self.phone {
            v.check(phone.chars().count() <= 20, "Phone number cannot be more than 20 characters");
        }
        if let Some(email) = &self.email {
            v.check(is_email(email), "Please add a valid email");
        }
        v.check(non_blank(Some(&self.address)).is_some(), "Please add an address");
        if self.careers.is_empty() {
            v.push("Please add at least one career");
        }
        for career in &self.careers {
            if !CAREERS.contains(&career.as_str()) {
                v.push(format!("`{career}` is not a supported career"));
            }
        }
        if let Some(rating) = self.average_rating {
            v.check((1.0..=10.0).contains(&rating), "Average rating must be between 1 and 10");
        }
        v.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ListingInput {
        ListingInput {
            name: Some("  Devworks Bootcamp ".into()),
            description: Some("Full stack web development".into()),
            website: Some("https://devworks.io".into()),
            email: Some("enroll@devworks.io".into()),
            address: Some("233 Bay State Rd Boston MA 02215".into()),
            careers: Some(vec!["Web Development".into(), "UI/UX".into()]),
            ..Default::default()
        }
    }

    #[test]
    fn create_trims_name_and_derives_slug() {
        let owner = Uuid::new_v4();
        let l = Listing::create(input(), owner).unwrap();
        assert_eq!(l.name, "Devworks Bootcamp");
        assert_eq!(l.slug, "devworks-bootcamp");
        assert_eq!(l.photo, DEFAULT_PHOTO);
        assert_eq!(l.created_by_user_id, owner);
        assert!(l.average_cost.is_none() && l.average_rating.is_none());
    }

    #[test]
    fn validation_reports_every_violation() {
        let err = Listing::create(ListingInput::default(), Uuid::new_v4()).unwrap_err();
        match err {
            ModelError::Validation(msgs) => {
                assert!(msgs.contains(&"Please add a name".to_string()));
                assert!(msgs.contains(&"Please write a brief description".to_string()));
                assert!(msgs.contains(&"Please add an address".to_string()));
                assert!(msgs.contains(&"Please add at least one career".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_career_rejected() {
        let mut i = input();
        i.careers = Some(vec!["Underwater Basketry".into()]);
        assert!(Listing::create(i, Uuid::new_v4()).is_err());
    }

    #[test]
    fn apply_renames_and_reslugs() {
        let mut l = Listing::create(input(), Uuid::new_v4()).unwrap();
        l.apply(ListingInput { name: Some("ModernTech Academy".into()), ..Default::default() }).unwrap();
        assert_eq!(l.slug, "moderntech-academy");
        assert!(l.apply(ListingInput { website: Some("nope".into()), ..Default::default() }).is_err());
    }
}
