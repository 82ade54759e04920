//! Subjective completion metadata.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Survey scales run from 1 to 10 inclusive.
pub const SCALE_MIN: u8 = 1;
pub const SCALE_MAX: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Great,
    Good,
    Okay,
    Low,
    Bad,
}

impl Mood {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "great" => Ok(Mood::Great),
            "good" => Ok(Mood::Good),
            "okay" | "ok" => Ok(Mood::Okay),
            "low" => Ok(Mood::Low),
            "bad" => Ok(Mood::Bad),
            other => Err(ValidationError::InvalidValue {
                field: "mood".into(),
                message: format!("unknown mood '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSurvey {
    pub perceived_intensity: u8,
    pub energy_level: u8,
    pub mood: Mood,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CompletionSurvey {
    /// Build a validated survey. Blank notes are stored as `None`.
    pub fn new(
        perceived_intensity: u8,
        energy_level: u8,
        mood: Mood,
        notes: Option<String>,
    ) -> Result<Self, ValidationError> {
        let survey = Self {
            perceived_intensity,
            energy_level,
            mood,
            notes: notes.filter(|n| !n.trim().is_empty()),
        };
        survey.validate()?;
        Ok(survey)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_scale("perceived_intensity", self.perceived_intensity)?;
        check_scale("energy_level", self.energy_level)
    }
}

fn check_scale(field: &'static str, value: u8) -> Result<(), ValidationError> {
    if (SCALE_MIN..=SCALE_MAX).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value: value as i64,
            min: SCALE_MIN as i64,
            max: SCALE_MAX as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_scale_bounds() {
        assert!(CompletionSurvey::new(1, 10, Mood::Good, None).is_ok());
    }

    #[test]
    fn rejects_out_of_scale_values() {
        let err = CompletionSurvey::new(0, 5, Mood::Good, None).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::OutOfRange { field: "perceived_intensity", value: 0, .. }
        ));
        assert!(CompletionSurvey::new(5, 11, Mood::Good, None).is_err());
    }

    #[test]
    fn blank_notes_are_dropped() {
        let survey = CompletionSurvey::new(7, 6, Mood::Okay, Some("   ".into())).unwrap();
        assert_eq!(survey.notes, None);
    }

    #[test]
    fn wire_names_are_snake_case() {
        let survey = CompletionSurvey::new(8, 4, Mood::Low, Some("legs heavy".into())).unwrap();
        let json = serde_json::to_value(&survey).unwrap();
        assert_eq!(json["perceived_intensity"], 8);
        assert_eq!(json["energy_level"], 4);
        assert_eq!(json["mood"], "low");
    }

    #[test]
    fn mood_parse() {
        assert_eq!(Mood::parse("OK").unwrap(), Mood::Okay);
        assert!(Mood::parse("ecstatic").is_err());
    }
}
