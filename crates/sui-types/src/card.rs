//! Profile card aggregate and its sub-records.
//!
//! A [`ProfileCard`] is only ever constructed by decoding remote reads. Local
//! optimistic updates replace the whole record; nothing mutates individual
//! fields of a cached card.
//!
//! The JSON-bearing sub-records ([`Skill`], [`Review`], [`FeaturedProject`])
//! are parsed from strings written by arbitrary front ends, so every field is
//! defaulted and a few common aliases are accepted.

use serde::{Deserialize, Serialize};

use crate::address::SuiAddress;

/// Collection-assigned card identifier (1-based on chain).
pub type CardId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCard {
    pub id: CardId,
    pub owner: SuiAddress,
    pub name: String,
    pub title: String,
    pub niche: String,
    pub image_url: String,
    pub description: String,
    pub location: String,
    pub years_experience: u64,
    pub open_to_work: bool,
    pub featured_projects: Vec<FeaturedProject>,
    pub skills: Vec<Skill>,
    pub reviews: Vec<Review>,
    pub work_preferences: WorkPreferences,
    pub social_links: SocialLinks,
    pub languages: Vec<String>,
    pub analytics: CardAnalytics,
    /// Creation time, unix millis.
    pub created_at: u64,
    /// Last update time, unix millis.
    pub updated_at: u64,
}

impl ProfileCard {
    /// Average review rating, or `None` without reviews.
    pub fn average_rating(&self) -> Option<f64> {
        if self.reviews.is_empty() {
            return None;
        }
        let total: u64 = self.reviews.iter().map(|r| r.rating as u64).sum();
        Some(total as f64 / self.reviews.len() as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skill {
    #[serde(alias = "skill")]
    pub name: String,
    #[serde(alias = "level")]
    pub proficiency: u8,
    #[serde(alias = "yearsExperience", alias = "years_experience")]
    pub years: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Review {
    pub reviewer: String,
    pub rating: u8,
    pub comment: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturedProject {
    #[serde(alias = "title")]
    pub name: String,
    pub description: String,
    #[serde(alias = "link")]
    pub url: String,
    #[serde(alias = "imageUrl", alias = "image")]
    pub image_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkPreferences {
    pub work_types: Vec<String>,
    pub hourly_rate: Option<u64>,
    pub location_preference: String,
    pub availability: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    pub linkedin: Option<String>,
    pub twitter: Option<String>,
    pub github: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardAnalytics {
    pub views: u64,
    pub contact_requests: u64,
    pub project_views: u64,
    /// Unix millis of the last profile view.
    pub last_viewed: u64,
}

/// Registry-wide figures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformStats {
    pub total_cards: u64,
    pub active_cards: u64,
    /// Accumulated platform fees, in MIST.
    pub platform_balance: u64,
}
