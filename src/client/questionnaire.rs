//! Onboarding questionnaire state machine
//!
//! Drives the three-question onboarding flow the UI renders: landing,
//! organization location (optional free text), team size (required
//! choice), organization type (optional multi-select), completion.
//! Completion yields the accumulated question/answer pairs that become
//! a conversation's context messages.

use crate::conversations::ContextMessage;

pub const QUESTION_LOCATION: &str = "Where is your organization registered?";
pub const QUESTION_LOCATION_SUBTITLE: &str =
    "Optional: Do you have staff, funding, or operations elsewhere?";
pub const QUESTION_TEAM_SIZE: &str = "How many people work at your organization?";
pub const QUESTION_ORG_TYPE: &str = "Which of these apply to you?";
pub const QUESTION_ORG_TYPE_SUBTITLE: &str = "(check all that apply)";

pub const TEAM_SIZE_OPTIONS: [&str; 4] = ["1 - Just me", "2-5", "6-15", "15+"];

pub const ORGANIZATION_TYPE_OPTIONS: [&str; 9] = [
    "Individual/sole proprietor",
    "Fiscally sponsored project",
    "SparkWell participant",
    "Nonprofit (US)",
    "Nonprofit (UK)",
    "Nonprofit (other)",
    "US 501(c)(3) charity",
    "For-profit entity",
    "Not yet registered/incorporated",
];

/// Screens of the onboarding flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Landing,
    Question1,
    Question2,
    Question3,
    Complete,
}

/// Questionnaire state
///
/// Forward transitions run Landing through Complete in order; only the
/// team-size question gates its transition on an answer. `skip` jumps
/// straight to a completion that records nothing.
#[derive(Debug, Clone)]
pub struct Questionnaire {
    screen: Screen,
    location: Option<String>,
    team_size: Option<String>,
    organization_types: Vec<String>,
    answers: Vec<ContextMessage>,
    skipped: bool,
}

impl Default for Questionnaire {
    fn default() -> Self {
        Self::new()
    }
}

impl Questionnaire {
    pub fn new() -> Self {
        Self {
            screen: Screen::Landing,
            location: None,
            team_size: None,
            organization_types: Vec::new(),
            answers: Vec::new(),
            skipped: false,
        }
    }

    /// Reconstruct per-question state from previously stored answers
    ///
    /// Matches on question text, so answers saved by an older session
    /// land back on the right question. Used by the edit flow; the
    /// result sits on the completion screen.
    pub fn from_answers(answers: &[ContextMessage]) -> Self {
        let mut questionnaire = Self::new();

        for answer in answers {
            if answer.question.contains(QUESTION_LOCATION) {
                questionnaire.location = Some(answer.answer.clone());
            } else if answer.question.contains(QUESTION_TEAM_SIZE) {
                questionnaire.team_size = Some(answer.answer.clone());
            } else if answer.question.contains(QUESTION_ORG_TYPE) {
                questionnaire.organization_types = answer
                    .answer
                    .split(", ")
                    .map(String::from)
                    .collect();
            }
        }

        questionnaire.answers = answers.to_vec();
        questionnaire.screen = Screen::Complete;
        questionnaire
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn is_complete(&self) -> bool {
        self.screen == Screen::Complete
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    /// Pairs recorded so far; empty after a skip
    pub fn answers(&self) -> &[ContextMessage] {
        &self.answers
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        let location = location.into();
        self.location = if location.is_empty() {
            None
        } else {
            Some(location)
        };
    }

    pub fn choose_team_size(&mut self, option: impl Into<String>) {
        self.team_size = Some(option.into());
    }

    pub fn toggle_organization_type(&mut self, option: &str) {
        if let Some(position) = self.organization_types.iter().position(|t| t == option) {
            self.organization_types.remove(position);
        } else {
            self.organization_types.push(option.to_string());
        }
    }

    /// Whether the current screen allows moving forward
    pub fn can_continue(&self) -> bool {
        match self.screen {
            Screen::Landing => true,
            Screen::Question1 => true,
            Screen::Question2 => self.team_size.is_some(),
            Screen::Question3 => true,
            Screen::Complete => false,
        }
    }

    /// Move to the next screen, recording the current answer
    ///
    /// Returns `false` without moving when the transition is gated and
    /// no answer has been chosen. Re-answering a question replaces its
    /// previous pair.
    pub fn advance(&mut self) -> bool {
        match self.screen {
            Screen::Landing => {
                self.screen = Screen::Question1;
                true
            }
            Screen::Question1 => {
                if let Some(location) = self.location.clone() {
                    self.record_answer(
                        QUESTION_LOCATION,
                        format!("{} {}", QUESTION_LOCATION, QUESTION_LOCATION_SUBTITLE),
                        location,
                    );
                }
                self.screen = Screen::Question2;
                true
            }
            Screen::Question2 => {
                let Some(team_size) = self.team_size.clone() else {
                    return false;
                };
                self.record_answer(QUESTION_TEAM_SIZE, QUESTION_TEAM_SIZE.to_string(), team_size);
                self.screen = Screen::Question3;
                true
            }
            Screen::Question3 => {
                if !self.organization_types.is_empty() {
                    self.record_answer(
                        QUESTION_ORG_TYPE,
                        format!("{} {}", QUESTION_ORG_TYPE, QUESTION_ORG_TYPE_SUBTITLE),
                        self.organization_types.join(", "),
                    );
                }
                self.screen = Screen::Complete;
                true
            }
            Screen::Complete => false,
        }
    }

    /// Skip the rest of the flow, recording no answers
    pub fn skip(&mut self) {
        self.answers.clear();
        self.skipped = true;
        self.screen = Screen::Complete;
    }

    fn record_answer(&mut self, match_text: &str, question: String, answer: String) {
        self.answers.retain(|a| !a.question.contains(match_text));
        self.answers.push(ContextMessage { question, answer });
    }
}
