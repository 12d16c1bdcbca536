use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

pub use migraine_diary_data::models::assessment::Hit6Assessment;

/// Allowed item scores: never, rarely, sometimes, very often, always
pub const HIT6_ANSWER_VALUES: [u8; 5] = [6, 8, 10, 11, 13];

/// Number of questionnaire items
pub const HIT6_ITEMS: usize = 6;

/// Submitted HIT-6 questionnaire
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Hit6Request {
    /// Six item scores, each one of 6, 8, 10, 11, 13
    pub answers: Vec<u8>,
}

/// Headache impact category for a HIT-6 score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Hit6Category {
    /// 49 or less
    LittleOrNoImpact,
    /// 50-55
    SomeImpact,
    /// 56-59
    SubstantialImpact,
    /// 60 or more
    SevereImpact,
}

impl Hit6Category {
    pub fn for_score(score: u8) -> Self {
        match score {
            0..=49 => Hit6Category::LittleOrNoImpact,
            50..=55 => Hit6Category::SomeImpact,
            56..=59 => Hit6Category::SubstantialImpact,
            _ => Hit6Category::SevereImpact,
        }
    }

    /// Label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            Hit6Category::LittleOrNoImpact => "Little or no impact",
            Hit6Category::SomeImpact => "Some impact",
            Hit6Category::SubstantialImpact => "Substantial impact",
            Hit6Category::SevereImpact => "Severe impact",
        }
    }
}

/// Stored assessment with its category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct Hit6Result {
    #[serde(flatten)]
    pub assessment: Hit6Assessment,
    pub category: Hit6Category,
}

impl From<Hit6Assessment> for Hit6Result {
    fn from(assessment: Hit6Assessment) -> Self {
        let category = Hit6Category::for_score(assessment.score);
        Self { assessment, category }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_boundaries() {
        assert_eq!(Hit6Category::for_score(36), Hit6Category::LittleOrNoImpact);
        assert_eq!(Hit6Category::for_score(49), Hit6Category::LittleOrNoImpact);
        assert_eq!(Hit6Category::for_score(50), Hit6Category::SomeImpact);
        assert_eq!(Hit6Category::for_score(55), Hit6Category::SomeImpact);
        assert_eq!(Hit6Category::for_score(56), Hit6Category::SubstantialImpact);
        assert_eq!(Hit6Category::for_score(59), Hit6Category::SubstantialImpact);
        assert_eq!(Hit6Category::for_score(60), Hit6Category::SevereImpact);
        assert_eq!(Hit6Category::for_score(78), Hit6Category::SevereImpact);
    }
}
