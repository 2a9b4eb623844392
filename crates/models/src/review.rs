use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ModelError, Violations};
use crate::validate::non_blank;

pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 10.0;

/// A principal's rating of a listing. One per (listing, user) pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub rating: f64,
    pub listing_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub title: Option<String>,
    pub text: Option<String>,
    pub rating: Option<f64>,
}

impl Review {
    pub fn create(input: ReviewInput, listing_id: Uuid, user_id: Uuid) -> Result<Self, ModelError> {
        let mut v = Violations::new();
        v.check(input.rating.is_some(), "Please add a rating from 1-10");
        let review = Review {
            id: Uuid::new_v4(),
            title: input.title.as_deref().map(str::trim).unwrap_or_default().to_string(),
            text: input.text.unwrap_or_default(),
            rating: input.rating.unwrap_or(MIN_RATING),
            listing_id,
            user_id,
            created_at: Utc::now(),
        };
        review.collect_violations(&mut v);
        v.into_result()?;
        Ok(review)
    }

    pub fn apply(&mut self, patch: ReviewInput) -> Result<(), ModelError> {
        if let Some(t) = patch.title { self.title = t.trim().to_string(); }
        if let Some(t) = patch.text { self.text = t; }
        if let Some(r) = patch.rating { self.rating = r; }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let mut v = Violations::new();
        self.collect_violations(&mut v);
        v.into_result()
    }

    fn collect_violations(&self, v: &mut Violations) {
        match non_blank(Some(&self.title)) {
            None => v.push("Please add a title"),
            Some(t) => v.check(t.chars().count() <= 50, "Title can only be 50 characters"),
        }
        match non_blank(Some(&self.text)) {
            None => v.push("Please add a review"),
            Some(t) => v.check(t.chars().count() <= 1000, "Review text is limited to 1000 characters"),
        }
        v.check(
            (MIN_RATING..=MAX_RATING).contains(&self.rating),
            "Rating must be between 1 and 10",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds_enforced() {
        let mk = |rating| ReviewInput { title: Some("Great".into()), text: Some("Learned a lot".into()), rating: Some(rating) };
        assert!(Review::create(mk(10.0), Uuid::new_v4(), Uuid::new_v4()).is_ok());
        assert!(Review::create(mk(0.0), Uuid::new_v4(), Uuid::new_v4()).is_err());
        assert!(Review::create(mk(11.0), Uuid::new_v4(), Uuid::new_v4()).is_err());
    }

    #[test]
    fn missing_rating_reported() {
        let err = Review::create(ReviewInput { title: Some("t".into()), text: Some("x".into()), rating: None }, Uuid::new_v4(), Uuid::new_v4()).unwrap_err();
        assert_eq!(err.to_string(), "Please add a rating from 1-10");
    }
}
