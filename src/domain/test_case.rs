use crate::domain::operation::OperationRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TestType {
    Positive,
    Negative,
}

impl TestType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(TestType::Positive),
            "negative" => Some(TestType::Negative),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Positive => "Positive",
            TestType::Negative => "Negative",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DesignTechnique {
    #[serde(rename = "EP")]
    EquivalencePartitioning,
    #[serde(rename = "BVA")]
    BoundaryValueAnalysis,
    ErrorGuessing,
    DecisionTable,
    Pairwise,
    StateTransition,
}

impl DesignTechnique {
    pub const ALL: [DesignTechnique; 6] = [
        DesignTechnique::EquivalencePartitioning,
        DesignTechnique::BoundaryValueAnalysis,
        DesignTechnique::ErrorGuessing,
        DesignTechnique::DecisionTable,
        DesignTechnique::Pairwise,
        DesignTechnique::StateTransition,
    ];

    /// Accepts the abbreviation or the full name, ignoring case, spaces and punctuation.
    /// Anything else is unknown; there is no fuzzy matching.
    pub fn parse(value: &str) -> Option<Self> {
        let key: String = value
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "ep" | "equivalencepartitioning" | "equivalenceclasspartitioning"
            | "equivalencepartitioningtesting" => Some(DesignTechnique::EquivalencePartitioning),
            "bva" | "boundaryvalueanalysis" | "boundaryvaluetesting" => {
                Some(DesignTechnique::BoundaryValueAnalysis)
            }
            "errorguessing" => Some(DesignTechnique::ErrorGuessing),
            "decisiontable" | "decisiontabletesting" => Some(DesignTechnique::DecisionTable),
            "pairwise" | "pairwisetesting" => Some(DesignTechnique::Pairwise),
            "statetransition" | "statetransitiontesting" => Some(DesignTechnique::StateTransition),
            _ => None,
        }
    }

    /// Label written to exports and prompts.
    pub fn label(&self) -> &'static str {
        match self {
            DesignTechnique::EquivalencePartitioning => "EP",
            DesignTechnique::BoundaryValueAnalysis => "BVA",
            DesignTechnique::ErrorGuessing => "Error Guessing",
            DesignTechnique::DecisionTable => "Decision Table Testing",
            DesignTechnique::Pairwise => "Pairwise Testing",
            DesignTechnique::StateTransition => "State Transition Testing",
        }
    }
}

impl fmt::Display for DesignTechnique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => trimmed.parse::<f64>().ok().and_then(Priority::from_number),
        }
    }

    /// Numeric priorities map to the nearest tier (1 = High, 2 = Medium, 3 = Low).
    pub fn from_number(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        if value <= 1.5 {
            Some(Priority::High)
        } else if value < 2.5 {
            Some(Priority::Medium)
        } else {
            Some(Priority::Low)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TestStep {
    pub action: String,
    pub expected_result: String,
}

/// A validated test case. Built only by the case validator.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TestCase {
    pub title: String,
    pub description: String,
    pub preconditions: String,
    pub test_steps: Vec<TestStep>,
    pub test_type: TestType,
    pub design_technique: DesignTechnique,
    #[serde(flatten)]
    pub operation: OperationRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    pub created_date: DateTime<Utc>,
}

/// Why a candidate could not become a [`TestCase`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingTitle,
    NoSteps,
    MissingTestType,
    InvalidTestType(String),
    MissingDesignTechnique,
    UnknownDesignTechnique(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingTitle => write!(f, "missing title"),
            ValidationError::NoSteps => {
                write!(f, "no step with both an action and an expected result")
            }
            ValidationError::MissingTestType => write!(f, "missing test type"),
            ValidationError::InvalidTestType(value) => write!(f, "invalid test type '{}'", value),
            ValidationError::MissingDesignTechnique => write!(f, "missing design technique"),
            ValidationError::UnknownDesignTechnique(value) => {
                write!(f, "unknown design technique '{}'", value)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_technique_accepts_names_and_abbreviations() {
        assert_eq!(
            DesignTechnique::parse("Boundary Value Analysis"),
            Some(DesignTechnique::BoundaryValueAnalysis)
        );
        assert_eq!(
            DesignTechnique::parse("bva"),
            Some(DesignTechnique::BoundaryValueAnalysis)
        );
        assert_eq!(
            DesignTechnique::parse("Decision Table Testing"),
            Some(DesignTechnique::DecisionTable)
        );
        assert_eq!(
            DesignTechnique::parse("error-guessing"),
            Some(DesignTechnique::ErrorGuessing)
        );
    }

    #[test]
    fn test_technique_unknown_is_none() {
        assert_eq!(DesignTechnique::parse("Exploratory"), None);
        assert_eq!(DesignTechnique::parse(""), None);
    }

    #[test]
    fn test_technique_labels_round_trip() {
        for technique in DesignTechnique::ALL {
            assert_eq!(DesignTechnique::parse(technique.label()), Some(technique));
        }
    }

    #[test]
    fn test_priority_nearest_tier() {
        assert_eq!(Priority::parse("HIGH"), Some(Priority::High));
        assert_eq!(Priority::parse("1"), Some(Priority::High));
        assert_eq!(Priority::parse("2.2"), Some(Priority::Medium));
        assert_eq!(Priority::parse("7"), Some(Priority::Low));
        assert_eq!(Priority::from_number(0.0), Some(Priority::High));
        assert_eq!(Priority::from_number(f64::NAN), None);
        assert_eq!(Priority::parse("urgent"), None);
    }

    #[test]
    fn test_test_type_parse() {
        assert_eq!(TestType::parse(" negative "), Some(TestType::Negative));
        assert_eq!(TestType::parse("edge"), None);
    }
}
