use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub mod db;

pub static QUIZ_COLLECTION_NAME: &str = "quizzes";
pub static ASSIGNMENT_COLLECTION_NAME: &str = "assignments";
pub static SUBMISSION_COLLECTION_NAME: &str = "submissions";

/// Multiple-choice question. `correct_answer` indexes into `options`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Question {
    pub id: Uuid,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    /// Standard or skill code the question assesses, e.g. "8.EE.7".
    pub skill: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QuizStatus {
    Draft,
    Published,
}

impl std::fmt::Display for QuizStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuizStatus::Draft => write!(f, "draft"),
            QuizStatus::Published => write!(f, "published"),
        }
    }
}

/// Teacher-authored test, optionally generated from a lesson plan.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuizTest {
    pub id: Uuid,
    pub title: String,
    pub teacher_id: Uuid,
    #[serde(default)]
    pub lesson_plan_id: Option<Uuid>,
    pub questions: Vec<Question>,
    pub status: QuizStatus,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl QuizTest {
    pub fn new(
        title: impl Into<String>,
        teacher_id: Uuid,
        lesson_plan_id: Option<Uuid>,
        questions: Vec<Question>,
    ) -> QuizTest {
        QuizTest {
            id: Uuid::new_v4(),
            title: title.into(),
            teacher_id,
            lesson_plan_id,
            questions,
            status: QuizStatus::Draft,
            created_at: Utc::now(),
        }
    }
}

/// Links a published test to the classes that should take it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Assignment {
    pub id: Uuid,
    pub test_id: Uuid,
    pub class_ids: Vec<Uuid>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Assignment {
    pub fn new(test_id: Uuid, class_ids: Vec<Uuid>) -> Assignment {
        Assignment {
            id: Uuid::new_v4(),
            test_id,
            class_ids,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentAnswer {
    pub question_id: Uuid,
    pub selected_answer: usize,
}

/// Per-skill tally attached to a graded submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SkillBreakdown {
    pub correct: u32,
    pub total: u32,
    pub percentage: f64,
}

/// A student's graded attempt at a test.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Submission {
    pub id: Uuid,
    pub test_id: Uuid,
    pub student_id: Uuid,
    /// Class the student took the test under, when it could be resolved.
    #[serde(default)]
    pub class_id: Option<Uuid>,
    pub answers: Vec<StudentAnswer>,
    /// Overall percentage, 0..=100.
    pub score: f64,
    pub skills_breakdown: HashMap<String, SkillBreakdown>,
    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

/// Grades the answers against the test.
///
/// The overall score divides by the full question count, so unanswered
/// questions count as wrong. The per-skill tallies only cover questions the
/// student actually answered; a skill with no attempts does not appear.
/// Answers to unknown question ids are ignored.
pub fn score_answers(
    test: &QuizTest,
    answers: &[StudentAnswer],
) -> (f64, HashMap<String, SkillBreakdown>) {
    if test.questions.is_empty() {
        return (0.0, HashMap::new());
    }

    let mut correct_total = 0u32;
    let mut skills: HashMap<String, SkillBreakdown> = HashMap::new();

    for answer in answers {
        let Some(question) = test.questions.iter().find(|q| q.id == answer.question_id) else {
            continue;
        };

        let entry = skills
            .entry(question.skill.clone())
            .or_insert(SkillBreakdown {
                correct: 0,
                total: 0,
                percentage: 0.0,
            });
        entry.total += 1;

        if question.correct_answer == answer.selected_answer {
            entry.correct += 1;
            correct_total += 1;
        }
    }

    for breakdown in skills.values_mut() {
        breakdown.percentage = f64::from(breakdown.correct) / f64::from(breakdown.total) * 100.0;
    }

    let score = f64::from(correct_total) / test.questions.len() as f64 * 100.0;
    (score, skills)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(skill: &str, correct: usize) -> Question {
        Question {
            id: Uuid::new_v4(),
            question_text: "q".into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: correct,
            skill: skill.into(),
        }
    }

    fn answer(q: &Question, selected: usize) -> StudentAnswer {
        StudentAnswer {
            question_id: q.id,
            selected_answer: selected,
        }
    }

    #[test]
    fn perfect_submission_scores_hundred() {
        let test = QuizTest::new(
            "Unit 1",
            Uuid::new_v4(),
            None,
            vec![question("8.EE.7", 0), question("8.EE.7", 2)],
        );
        let answers = vec![answer(&test.questions[0], 0), answer(&test.questions[1], 2)];

        let (score, skills) = score_answers(&test, &answers);
        assert_eq!(score, 100.0);
        assert_eq!(skills["8.EE.7"].correct, 2);
        assert_eq!(skills["8.EE.7"].percentage, 100.0);
    }

    #[test]
    fn partial_credit_splits_by_skill() {
        let test = QuizTest::new(
            "Mixed",
            Uuid::new_v4(),
            None,
            vec![
                question("8.EE.7", 1),
                question("8.EE.7", 3),
                question("8.F.1", 0),
                question("8.F.1", 2),
            ],
        );
        let answers = vec![
            answer(&test.questions[0], 1),
            answer(&test.questions[1], 0),
            answer(&test.questions[2], 0),
            answer(&test.questions[3], 1),
        ];

        let (score, skills) = score_answers(&test, &answers);
        assert_eq!(score, 50.0);
        assert_eq!(skills["8.EE.7"].correct, 1);
        assert_eq!(skills["8.EE.7"].total, 2);
        assert_eq!(skills["8.EE.7"].percentage, 50.0);
        assert_eq!(skills["8.F.1"].correct, 1);
        assert_eq!(skills["8.F.1"].total, 2);
    }

    #[test]
    fn empty_test_scores_zero() {
        let test = QuizTest::new("Empty", Uuid::new_v4(), None, vec![]);
        let (score, skills) = score_answers(&test, &[]);
        assert_eq!(score, 0.0);
        assert!(skills.is_empty());
    }

    #[test]
    fn unanswered_questions_lower_the_score_but_not_skill_tallies() {
        let test = QuizTest::new(
            "Two questions",
            Uuid::new_v4(),
            None,
            vec![question("8.G.5", 0), question("8.NS.1", 1)],
        );
        // Only the first question is answered, correctly.
        let answers = vec![answer(&test.questions[0], 0)];

        let (score, skills) = score_answers(&test, &answers);
        assert_eq!(score, 50.0);
        assert_eq!(skills["8.G.5"].correct, 1);
        assert_eq!(skills["8.G.5"].percentage, 100.0);
        assert!(!skills.contains_key("8.NS.1"));
    }

    #[test]
    fn answers_to_unknown_questions_are_ignored() {
        let test = QuizTest::new("Single", Uuid::new_v4(), None, vec![question("8.NS.1", 2)]);
        let answers = vec![
            answer(&test.questions[0], 2),
            StudentAnswer {
                question_id: Uuid::new_v4(),
                selected_answer: 0,
            },
        ];

        let (score, _) = score_answers(&test, &answers);
        assert_eq!(score, 100.0);
    }
}
