use std::collections::HashMap;

use mongodb::Database;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::ai::{prompt, ChatClient};
use crate::data::quiz::db::QuizDbExt;
use crate::data::quiz::{QuizTest, Submission};
use crate::data::student::db::{ClassDbExt, StudentDbExt};
use crate::data::student::Student;
use crate::resp::jwt::AuthedUser;
use crate::resp::problem::{generation_failed, not_found, Problem};

const STRUGGLING_THRESHOLD: f64 = 70.0;
const MASTERY_THRESHOLD: f64 = 80.0;
const TREND_DELTA: f64 = 5.0;

fn sort_desc(values: &mut [f64]) -> (f64, f64, f64) {
    let average = values.iter().sum::<f64>() / values.len() as f64;
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let lowest = *values.first().unwrap_or(&0.0);
    let highest = *values.last().unwrap_or(&0.0);
    (average, highest, lowest)
}

fn percentage(correct: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(correct) / f64::from(total) * 100.0
    }
}

fn student_name(students: &[Student], id: Uuid) -> String {
    students
        .iter()
        .find(|s| s.id == id)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

// ---------------------------------------------------------------------------
// Class analytics

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StrugglingStudent {
    pub student_id: Uuid,
    pub student_name: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SkillStat {
    pub skill: String,
    pub total_attempts: u32,
    pub correct_count: u32,
    pub total_questions: u32,
    pub class_average: f64,
    pub students_struggling: Vec<StrugglingStudent>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentStat {
    pub student_id: Uuid,
    pub student_name: String,
    pub tests_taken: u32,
    pub overall_average: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuizStat {
    pub quiz_id: Uuid,
    pub quiz_title: String,
    pub submissions_count: usize,
    pub average_score: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClassAnalytics {
    pub skill_stats: Vec<SkillStat>,
    pub student_stats: Vec<StudentStat>,
    pub quizzes: Vec<QuizStat>,
}

/// Body used when a report has no data to aggregate yet.
#[derive(Debug, Serialize, ToSchema)]
pub struct NoData {
    pub message: String,
}

fn no_data(message: &str) -> NoData {
    NoData {
        message: message.to_string(),
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MaybeReport<T> {
    Empty(NoData),
    Data(T),
}

/// Aggregates per-skill and per-student performance for one class.
pub fn build_class_analytics(
    submissions: &[Submission],
    students: &[Student],
    quizzes: &[QuizTest],
) -> ClassAnalytics {
    struct PerStudent {
        name: String,
        total_score: f64,
        count: u32,
        skills: HashMap<String, (u32, u32)>,
    }

    let mut skill_totals: HashMap<String, (u32, u32, u32)> = HashMap::new();
    let mut per_student: Vec<(Uuid, PerStudent)> = vec![];

    for sub in submissions {
        if !per_student.iter().any(|(id, _)| *id == sub.student_id) {
            per_student.push((
                sub.student_id,
                PerStudent {
                    name: student_name(students, sub.student_id),
                    total_score: 0.0,
                    count: 0,
                    skills: HashMap::new(),
                },
            ));
        }
        let entry = per_student
            .iter_mut()
            .find(|(id, _)| *id == sub.student_id)
            .map(|(_, s)| s)
            .unwrap();
        entry.total_score += sub.score;
        entry.count += 1;

        for (skill, breakdown) in &sub.skills_breakdown {
            let totals = skill_totals.entry(skill.clone()).or_insert((0, 0, 0));
            totals.0 += 1;
            totals.1 += breakdown.correct;
            totals.2 += breakdown.total;

            let per_skill = entry.skills.entry(skill.clone()).or_insert((0, 0));
            per_skill.0 += breakdown.correct;
            per_skill.1 += breakdown.total;
        }
    }

    let mut skill_stats: Vec<SkillStat> = skill_totals
        .into_iter()
        .map(|(skill, (attempts, correct, total))| {
            let mut struggling = vec![];
            for (student_id, stats) in &per_student {
                if let Some((c, t)) = stats.skills.get(&skill) {
                    let pct = percentage(*c, *t);
                    if pct < STRUGGLING_THRESHOLD {
                        struggling.push(StrugglingStudent {
                            student_id: *student_id,
                            student_name: stats.name.clone(),
                            percentage: pct,
                        });
                    }
                }
            }

            SkillStat {
                class_average: percentage(correct, total),
                skill,
                total_attempts: attempts,
                correct_count: correct,
                total_questions: total,
                students_struggling: struggling,
            }
        })
        .collect();
    skill_stats.sort_by(|a, b| a.skill.cmp(&b.skill));

    let student_stats = per_student
        .into_iter()
        .map(|(student_id, stats)| StudentStat {
            student_id,
            student_name: stats.name,
            tests_taken: stats.count,
            overall_average: if stats.count > 0 {
                stats.total_score / f64::from(stats.count)
            } else {
                0.0
            },
        })
        .collect();

    let quiz_stats = quizzes
        .iter()
        .map(|quiz| {
            let scores: Vec<f64> = submissions
                .iter()
                .filter(|s| s.test_id == quiz.id)
                .map(|s| s.score)
                .collect();
            QuizStat {
                quiz_id: quiz.id,
                quiz_title: quiz.title.clone(),
                submissions_count: scores.len(),
                average_score: if scores.is_empty() {
                    0.0
                } else {
                    scores.iter().sum::<f64>() / scores.len() as f64
                },
            }
        })
        .collect();

    ClassAnalytics {
        skill_stats,
        student_stats,
        quizzes: quiz_stats,
    }
}

/// Per-class performance rollup
#[utoipa::path(
    params(("class_id", description = "class ID")),
    responses((status = 200, description = "Class analytics or a no-data notice", body = ClassAnalytics)),
    security(("jwt" = []))
)]
#[get("/analytics/class/<class_id>")]
#[tracing::instrument(skip_all)]
pub async fn class_analytics(
    class_id: Uuid,
    _user: AuthedUser,
    db: &State<Database>,
) -> Result<Json<MaybeReport<ClassAnalytics>>, Problem> {
    let submissions = db.submissions_for_class(class_id).await?;
    if submissions.is_empty() {
        return Ok(Json(MaybeReport::Empty(no_data("No data yet"))));
    }

    let class = db
        .get_class(class_id)
        .await?
        .ok_or_else(|| not_found("Class"))?;
    let students = db.students_by_ids(&class.student_ids).await?;

    let mut quiz_ids: Vec<Uuid> = submissions.iter().map(|s| s.test_id).collect();
    quiz_ids.sort();
    quiz_ids.dedup();

    let mut quizzes = vec![];
    for id in quiz_ids {
        if let Some(quiz) = db.get_quiz(id).await? {
            quizzes.push(quiz);
        }
    }

    Ok(Json(MaybeReport::Data(build_class_analytics(
        &submissions,
        &students,
        &quizzes,
    ))))
}

// ---------------------------------------------------------------------------
// Remediation suggestions

#[derive(Debug, Deserialize, ToSchema)]
pub struct RemediationRequest {
    pub skill: String,
    #[serde(default)]
    pub student_names: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RemediationResponse {
    pub skill: String,
    pub suggestions: String,
}

/// Generate remediation activities for a skill
#[utoipa::path(
    request_body = RemediationRequest,
    responses(
        (status = 200, description = "Five suggested activities", body = RemediationResponse),
        (status = 500, description = "Generation failed", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/analytics/remediation-suggestions", format = "application/json", data = "<request>")]
#[tracing::instrument(skip_all)]
pub async fn remediation_suggestions(
    request: Json<RemediationRequest>,
    _user: AuthedUser,
    chat: &State<ChatClient>,
) -> Result<Json<RemediationResponse>, Problem> {
    let request = request.into_inner();

    let suggestions = chat
        .complete(
            prompt::REMEDIATION_SYSTEM,
            &prompt::remediation_prompt(&request.skill, &request.student_names),
        )
        .await
        .map_err(generation_failed)?;

    Ok(Json(RemediationResponse {
        skill: request.skill,
        suggestions,
    }))
}

// ---------------------------------------------------------------------------
// Test report

#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct StandardScore {
    pub standard: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StandardReport {
    pub standard: String,
    pub class_average: f64,
    /// Distinct students under the struggling threshold.
    pub students_struggling: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentResult {
    pub student_id: Uuid,
    pub name: String,
    pub score: f64,
    pub standards_performance: Vec<StandardScore>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionAnalysis {
    pub question_text: String,
    pub standard: String,
    pub percent_correct: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TestReport {
    pub quiz_title: String,
    pub total_students: usize,
    pub class_average: f64,
    pub highest_score: f64,
    pub lowest_score: f64,
    pub standards: Vec<StandardReport>,
    pub students: Vec<StudentResult>,
    pub questions: Vec<QuestionAnalysis>,
}

fn standard_scores(submission: &Submission) -> Vec<StandardScore> {
    let mut scores: Vec<StandardScore> = submission
        .skills_breakdown
        .iter()
        .map(|(standard, b)| StandardScore {
            standard: standard.clone(),
            percentage: percentage(b.correct, b.total),
        })
        .collect();
    scores.sort_by(|a, b| a.standard.cmp(&b.standard));
    scores
}

/// One quiz's results across every submission: score spread, per-standard
/// averages, ranked students, and per-question difficulty.
pub fn build_test_report(
    quiz: &QuizTest,
    submissions: &[Submission],
    students: &[Student],
) -> TestReport {
    let mut scores: Vec<f64> = submissions.iter().map(|s| s.score).collect();
    let (class_average, highest_score, lowest_score) = sort_desc(&mut scores);

    let mut standards: HashMap<String, (u32, u32, Vec<Uuid>)> = HashMap::new();
    for sub in submissions {
        for (standard, breakdown) in &sub.skills_breakdown {
            let entry = standards.entry(standard.clone()).or_insert((0, 0, vec![]));
            entry.0 += breakdown.correct;
            entry.1 += breakdown.total;

            if percentage(breakdown.correct, breakdown.total) < STRUGGLING_THRESHOLD
                && !entry.2.contains(&sub.student_id)
            {
                entry.2.push(sub.student_id);
            }
        }
    }
    let mut standards: Vec<StandardReport> = standards
        .into_iter()
        .map(|(standard, (correct, total, struggling))| StandardReport {
            standard,
            class_average: percentage(correct, total),
            students_struggling: struggling.len(),
        })
        .collect();
    standards.sort_by(|a, b| a.standard.cmp(&b.standard));

    let mut student_results: Vec<StudentResult> = submissions
        .iter()
        .map(|sub| StudentResult {
            student_id: sub.student_id,
            name: student_name(students, sub.student_id),
            score: sub.score,
            standards_performance: standard_scores(sub),
        })
        .collect();
    student_results
        .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let questions = quiz
        .questions
        .iter()
        .map(|question| {
            let mut correct = 0u32;
            let mut total = 0u32;
            for sub in submissions {
                for answer in &sub.answers {
                    if answer.question_id == question.id {
                        total += 1;
                        if answer.selected_answer == question.correct_answer {
                            correct += 1;
                        }
                    }
                }
            }

            QuestionAnalysis {
                question_text: question.question_text.clone(),
                standard: question.skill.clone(),
                percent_correct: percentage(correct, total),
            }
        })
        .collect();

    TestReport {
        quiz_title: quiz.title.clone(),
        total_students: submissions.len(),
        class_average,
        highest_score,
        lowest_score,
        standards,
        students: student_results,
        questions,
    }
}

/// Detailed report for one quiz
#[utoipa::path(
    params(("quiz_id", description = "quiz ID")),
    responses(
        (status = 200, description = "Test report or a no-data notice", body = TestReport),
        (status = 404, description = "Unknown quiz", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/analytics/test/<quiz_id>")]
#[tracing::instrument(skip_all)]
pub async fn test_report(
    quiz_id: Uuid,
    _user: AuthedUser,
    db: &State<Database>,
) -> Result<Json<MaybeReport<TestReport>>, Problem> {
    let quiz = db.get_quiz(quiz_id).await?.ok_or_else(|| not_found("Quiz"))?;

    let submissions = db.submissions_for_test(quiz_id).await?;
    if submissions.is_empty() {
        return Ok(Json(MaybeReport::Empty(no_data("No submissions yet"))));
    }

    let student_ids: Vec<Uuid> = submissions.iter().map(|s| s.student_id).collect();
    let students = db.students_by_ids(&student_ids).await?;

    Ok(Json(MaybeReport::Data(build_test_report(
        &quiz,
        &submissions,
        &students,
    ))))
}

// ---------------------------------------------------------------------------
// Student profile

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScoreTrend {
    Stable,
    Up,
    Down,
}

/// Trend of `current` relative to `previous`; moves only outside a
/// five-point band.
pub fn score_trend(previous: f64, current: f64) -> ScoreTrend {
    if current > previous + TREND_DELTA {
        ScoreTrend::Up
    } else if current < previous - TREND_DELTA {
        ScoreTrend::Down
    } else {
        ScoreTrend::Stable
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StandardAverage {
    pub standard: String,
    pub average: f64,
    pub attempts: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TestHistoryEntry {
    pub quiz_id: Uuid,
    pub quiz_title: String,
    pub score: f64,
    /// `YYYY-MM-DD`
    pub date: String,
    pub trend: ScoreTrend,
    pub standards_performance: Vec<StandardScore>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentProfile {
    pub student_name: String,
    pub tests_taken: usize,
    pub overall_average: f64,
    pub highest_score: f64,
    pub standards_mastered: usize,
    pub standards: Vec<StandardAverage>,
    pub test_history: Vec<TestHistoryEntry>,
    pub needs_support: Vec<String>,
}

/// Longitudinal profile for one student. `submissions` must be in
/// chronological order for the trend markers to make sense.
pub fn build_student_profile(
    student: &Student,
    submissions: &[Submission],
    quiz_titles: &HashMap<Uuid, String>,
) -> StudentProfile {
    if submissions.is_empty() {
        return StudentProfile {
            student_name: student.name.clone(),
            tests_taken: 0,
            overall_average: 0.0,
            highest_score: 0.0,
            standards_mastered: 0,
            standards: vec![],
            test_history: vec![],
            needs_support: vec![],
        };
    }

    let mut scores: Vec<f64> = submissions.iter().map(|s| s.score).collect();
    let (overall_average, highest_score, _) = sort_desc(&mut scores);

    let mut standards_data: HashMap<String, (u32, u32, usize)> = HashMap::new();
    for sub in submissions {
        for (standard, breakdown) in &sub.skills_breakdown {
            let entry = standards_data.entry(standard.clone()).or_insert((0, 0, 0));
            entry.0 += breakdown.correct;
            entry.1 += breakdown.total;
            entry.2 += 1;
        }
    }

    let mut standards: Vec<StandardAverage> = vec![];
    let mut standards_mastered = 0;
    let mut needs_support = vec![];
    for (standard, (correct, total, attempts)) in standards_data {
        let average = percentage(correct, total);
        if average >= MASTERY_THRESHOLD {
            standards_mastered += 1;
        } else if average < STRUGGLING_THRESHOLD {
            needs_support.push(standard.clone());
        }
        standards.push(StandardAverage {
            standard,
            average,
            attempts,
        });
    }
    standards.sort_by(|a, b| b.average.partial_cmp(&a.average).unwrap_or(std::cmp::Ordering::Equal));
    needs_support.sort();

    let test_history = submissions
        .iter()
        .enumerate()
        .map(|(index, sub)| {
            let trend = if index == 0 {
                ScoreTrend::Stable
            } else {
                score_trend(submissions[index - 1].score, sub.score)
            };

            TestHistoryEntry {
                quiz_id: sub.test_id,
                quiz_title: quiz_titles
                    .get(&sub.test_id)
                    .cloned()
                    .unwrap_or_else(|| "Unknown Quiz".to_string()),
                score: sub.score,
                date: sub.submitted_at.format("%Y-%m-%d").to_string(),
                trend,
                standards_performance: standard_scores(sub),
            }
        })
        .collect();

    StudentProfile {
        student_name: student.name.clone(),
        tests_taken: submissions.len(),
        overall_average,
        highest_score,
        standards_mastered,
        standards,
        test_history,
        needs_support,
    }
}

/// Performance profile for one student
#[utoipa::path(
    params(("student_id", description = "student ID")),
    responses(
        (status = 200, description = "Student profile", body = StudentProfile),
        (status = 404, description = "Unknown student", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/analytics/student/<student_id>")]
#[tracing::instrument(skip_all)]
pub async fn student_profile(
    student_id: Uuid,
    _user: AuthedUser,
    db: &State<Database>,
) -> Result<Json<StudentProfile>, Problem> {
    let student = db
        .get_student(student_id)
        .await?
        .ok_or_else(|| not_found("Student"))?;

    let submissions = db.submissions_for_student(student_id).await?;

    let mut quiz_titles = HashMap::new();
    for sub in &submissions {
        if !quiz_titles.contains_key(&sub.test_id) {
            if let Some(quiz) = db.get_quiz(sub.test_id).await? {
                quiz_titles.insert(sub.test_id, quiz.title);
            }
        }
    }

    Ok(Json(build_student_profile(
        &student,
        &submissions,
        &quiz_titles,
    )))
}

// ---------------------------------------------------------------------------
// Groupings

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Grouping {
    pub standard: String,
    /// Weakest first.
    pub students: Vec<StrugglingStudent>,
    pub average: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupingsResponse {
    pub class_name: String,
    pub groupings: Vec<Grouping>,
}

/// Small groups of students under the struggling threshold per standard,
/// largest group first.
pub fn build_groupings(
    class_name: &str,
    submissions: &[Submission],
    students: &[Student],
) -> GroupingsResponse {
    let mut per_standard: HashMap<String, HashMap<Uuid, (u32, u32)>> = HashMap::new();
    for sub in submissions {
        for (standard, breakdown) in &sub.skills_breakdown {
            let entry = per_standard
                .entry(standard.clone())
                .or_default()
                .entry(sub.student_id)
                .or_insert((0, 0));
            entry.0 += breakdown.correct;
            entry.1 += breakdown.total;
        }
    }

    let mut groupings: Vec<Grouping> = vec![];
    for (standard, per_student) in per_standard {
        let mut struggling: Vec<StrugglingStudent> = per_student
            .into_iter()
            .filter_map(|(student_id, (correct, total))| {
                let pct = percentage(correct, total);
                (pct < STRUGGLING_THRESHOLD).then(|| StrugglingStudent {
                    student_id,
                    student_name: student_name(students, student_id),
                    percentage: pct,
                })
            })
            .collect();

        if struggling.is_empty() {
            continue;
        }

        struggling.sort_by(|a, b| {
            a.percentage
                .partial_cmp(&b.percentage)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let average =
            struggling.iter().map(|s| s.percentage).sum::<f64>() / struggling.len() as f64;

        groupings.push(Grouping {
            standard,
            students: struggling,
            average,
        });
    }

    groupings.sort_by(|a, b| {
        b.students
            .len()
            .cmp(&a.students.len())
            .then_with(|| a.standard.cmp(&b.standard))
    });

    GroupingsResponse {
        class_name: class_name.to_string(),
        groupings,
    }
}

/// Remediation groupings for a class
#[utoipa::path(
    params(("class_id", description = "class ID")),
    responses(
        (status = 200, description = "Groupings by standard", body = GroupingsResponse),
        (status = 404, description = "Unknown class", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/analytics/groupings/<class_id>")]
#[tracing::instrument(skip_all)]
pub async fn groupings(
    class_id: Uuid,
    _user: AuthedUser,
    db: &State<Database>,
) -> Result<Json<GroupingsResponse>, Problem> {
    let class = db
        .get_class(class_id)
        .await?
        .ok_or_else(|| not_found("Class"))?;

    let submissions = db.submissions_for_class(class_id).await?;
    if submissions.is_empty() {
        return Ok(Json(GroupingsResponse {
            class_name: class.name,
            groupings: vec![],
        }));
    }

    let students = db.students_by_ids(&class.student_ids).await?;

    Ok(Json(build_groupings(&class.name, &submissions, &students)))
}

// ---------------------------------------------------------------------------
// Standards coverage

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssessedStandard {
    pub standard: String,
    /// Number of questions across the teacher's quizzes that target it.
    pub times_assessed: u32,
    pub average_score: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StandardsCoverage {
    pub assessed: Vec<AssessedStandard>,
    pub assessed_count: usize,
}

/// Which standards the teacher has assessed and how students did on them.
pub fn build_standards_coverage(
    quizzes: &[QuizTest],
    submissions: &[Submission],
) -> StandardsCoverage {
    let mut assessed: HashMap<String, (u32, f64, u32)> = HashMap::new();

    for quiz in quizzes {
        for question in &quiz.questions {
            assessed.entry(question.skill.clone()).or_insert((0, 0.0, 0)).0 += 1;
        }
    }

    for sub in submissions {
        for (standard, breakdown) in &sub.skills_breakdown {
            if let Some(entry) = assessed.get_mut(standard) {
                entry.1 += percentage(breakdown.correct, breakdown.total);
                entry.2 += 1;
            }
        }
    }

    let mut assessed: Vec<AssessedStandard> = assessed
        .into_iter()
        .map(|(standard, (times, score_sum, count))| AssessedStandard {
            standard,
            times_assessed: times,
            average_score: if count > 0 {
                score_sum / f64::from(count)
            } else {
                0.0
            },
        })
        .collect();
    assessed.sort_by(|a, b| a.standard.cmp(&b.standard));

    StandardsCoverage {
        assessed_count: assessed.len(),
        assessed,
    }
}

/// Standards assessed by the current teacher
#[utoipa::path(
    responses((status = 200, description = "Coverage summary", body = StandardsCoverage)),
    security(("jwt" = []))
)]
#[get("/analytics/standards-coverage")]
#[tracing::instrument(skip_all)]
pub async fn standards_coverage(
    user: AuthedUser,
    db: &State<Database>,
) -> Result<Json<StandardsCoverage>, Problem> {
    let quizzes = db.quizzes_for_teacher(user.0.id).await?;
    let quiz_ids: Vec<Uuid> = quizzes.iter().map(|q| q.id).collect();
    let submissions = db.submissions_for_tests(&quiz_ids).await?;

    Ok(Json(build_standards_coverage(&quizzes, &submissions)))
}

// ---------------------------------------------------------------------------
// At-risk students

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskTrend {
    Stable,
    Declining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, ToSchema)]
pub enum Priority {
    Critical,
    High,
    Medium,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AtRiskStudent {
    pub student_id: Uuid,
    pub name: String,
    pub class_name: String,
    pub average_score: f64,
    pub quizzes_taken: usize,
    pub trend: RiskTrend,
    pub priority_level: Priority,
    /// Weakest first.
    pub struggling_standards: Vec<StandardScore>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AtRiskReport {
    pub students: Vec<AtRiskStudent>,
    pub total_count: usize,
    pub critical_count: usize,
    pub high_count: usize,
    pub medium_count: usize,
}

/// Declining when the average of the last three scores sits five or more
/// points under the average of everything before them. Needs at least three
/// scores; with exactly three, the overall average is the baseline.
pub fn risk_trend(scores: &[f64]) -> RiskTrend {
    if scores.len() < 3 {
        return RiskTrend::Stable;
    }

    let recent = &scores[scores.len() - 3..];
    let recent_avg = recent.iter().sum::<f64>() / 3.0;

    let earlier = &scores[..scores.len() - 3];
    let earlier_avg = if earlier.is_empty() {
        scores.iter().sum::<f64>() / scores.len() as f64
    } else {
        earlier.iter().sum::<f64>() / earlier.len() as f64
    };

    if recent_avg < earlier_avg - TREND_DELTA {
        RiskTrend::Declining
    } else {
        RiskTrend::Stable
    }
}

/// Critical below 60 or on a declining trend, High below 65, else Medium.
pub fn risk_priority(average: f64, trend: RiskTrend) -> Priority {
    if average < 60.0 || trend == RiskTrend::Declining {
        Priority::Critical
    } else if average < 65.0 {
        Priority::High
    } else {
        Priority::Medium
    }
}

/// Flags students in one class whose average sits under `threshold`.
/// `submissions` must be in chronological order per student.
pub fn class_at_risk(
    class_name: &str,
    submissions: &[Submission],
    students: &[Student],
    threshold: f64,
) -> Vec<AtRiskStudent> {
    let mut per_student: Vec<(Uuid, Vec<f64>, HashMap<String, (u32, u32)>)> = vec![];
    for sub in submissions {
        if !per_student.iter().any(|(id, _, _)| *id == sub.student_id) {
            per_student.push((sub.student_id, vec![], HashMap::new()));
        }
        let entry = per_student
            .iter_mut()
            .find(|(id, _, _)| *id == sub.student_id)
            .unwrap();
        entry.1.push(sub.score);

        for (standard, breakdown) in &sub.skills_breakdown {
            let totals = entry.2.entry(standard.clone()).or_insert((0, 0));
            totals.0 += breakdown.correct;
            totals.1 += breakdown.total;
        }
    }

    let mut at_risk = vec![];
    for (student_id, scores, standards) in per_student {
        if scores.is_empty() {
            continue;
        }

        let average = scores.iter().sum::<f64>() / scores.len() as f64;
        if average >= threshold {
            continue;
        }

        let trend = risk_trend(&scores);
        let priority = risk_priority(average, trend);

        let mut struggling: Vec<StandardScore> = standards
            .into_iter()
            .filter_map(|(standard, (correct, total))| {
                let pct = percentage(correct, total);
                (pct < STRUGGLING_THRESHOLD).then_some(StandardScore {
                    standard,
                    percentage: pct,
                })
            })
            .collect();
        struggling.sort_by(|a, b| {
            a.percentage
                .partial_cmp(&b.percentage)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        at_risk.push(AtRiskStudent {
            student_id,
            name: student_name(students, student_id),
            class_name: class_name.to_string(),
            average_score: average,
            quizzes_taken: scores.len(),
            trend,
            priority_level: priority,
            struggling_standards: struggling,
        });
    }

    at_risk
}

/// Students needing intervention across the teacher's classes
#[utoipa::path(
    params(("threshold", description = "average-score cutoff, default 70")),
    responses((status = 200, description = "At-risk report", body = AtRiskReport)),
    security(("jwt" = []))
)]
#[get("/analytics/at-risk-students?<threshold>")]
#[tracing::instrument(skip_all)]
pub async fn at_risk_students(
    threshold: Option<f64>,
    user: AuthedUser,
    db: &State<Database>,
) -> Result<Json<AtRiskReport>, Problem> {
    let threshold = threshold.unwrap_or(STRUGGLING_THRESHOLD);

    let classes = db.classes_for_teacher(user.0.id).await?;

    let mut students_at_risk = vec![];
    for class in classes {
        let mut submissions = db.submissions_for_class(class.id).await?;
        submissions.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));

        let students = db.students_by_ids(&class.student_ids).await?;
        students_at_risk.extend(class_at_risk(&class.name, &submissions, &students, threshold));
    }

    students_at_risk.sort_by(|a, b| {
        a.priority_level.cmp(&b.priority_level).then_with(|| {
            a.average_score
                .partial_cmp(&b.average_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    });

    let count = |p: Priority| {
        students_at_risk
            .iter()
            .filter(|s| s.priority_level == p)
            .count()
    };

    Ok(Json(AtRiskReport {
        total_count: students_at_risk.len(),
        critical_count: count(Priority::Critical),
        high_count: count(Priority::High),
        medium_count: count(Priority::Medium),
        students: students_at_risk,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::quiz::SkillBreakdown;
    use chrono::Utc;

    fn student(name: &str) -> Student {
        Student::new(name, format!("{name}@school.example"), None)
    }

    fn submission(student: &Student, test: Uuid, score: f64) -> Submission {
        Submission {
            id: Uuid::new_v4(),
            test_id: test,
            student_id: student.id,
            class_id: None,
            answers: vec![],
            score,
            skills_breakdown: HashMap::new(),
            submitted_at: Utc::now(),
        }
    }

    fn with_skill(mut sub: Submission, skill: &str, correct: u32, total: u32) -> Submission {
        sub.skills_breakdown.insert(
            skill.to_string(),
            SkillBreakdown {
                correct,
                total,
                percentage: percentage(correct, total),
            },
        );
        sub
    }

    #[test]
    fn class_analytics_averages_per_skill_and_student() {
        let ana = student("Ana");
        let ben = student("Ben");
        let test = Uuid::new_v4();

        let submissions = vec![
            with_skill(submission(&ana, test, 80.0), "8.EE.7", 4, 5),
            with_skill(submission(&ben, test, 40.0), "8.EE.7", 2, 5),
        ];
        let students = vec![ana.clone(), ben.clone()];

        let analytics = build_class_analytics(&submissions, &students, &[]);

        assert_eq!(analytics.skill_stats.len(), 1);
        let skill = &analytics.skill_stats[0];
        assert_eq!(skill.total_attempts, 2);
        assert_eq!(skill.class_average, 60.0);
        // Ben is at 40%, Ana at 80%.
        assert_eq!(skill.students_struggling.len(), 1);
        assert_eq!(skill.students_struggling[0].student_name, "Ben");

        let ana_stats = analytics
            .student_stats
            .iter()
            .find(|s| s.student_id == ana.id)
            .unwrap();
        assert_eq!(ana_stats.overall_average, 80.0);
        assert_eq!(ana_stats.tests_taken, 1);
    }

    #[test]
    fn test_report_ranks_students_and_counts_struggling_once() {
        let ana = student("Ana");
        let ben = student("Ben");
        let quiz = QuizTest::new("Unit 1", Uuid::new_v4(), None, vec![]);

        let submissions = vec![
            with_skill(submission(&ana, quiz.id, 50.0), "8.F.1", 1, 4),
            with_skill(submission(&ben, quiz.id, 90.0), "8.F.1", 4, 4),
        ];
        let students = vec![ana, ben];

        let report = build_test_report(&quiz, &submissions, &students);

        assert_eq!(report.total_students, 2);
        assert_eq!(report.class_average, 70.0);
        assert_eq!(report.highest_score, 90.0);
        assert_eq!(report.lowest_score, 50.0);
        assert_eq!(report.students[0].name, "Ben");
        assert_eq!(report.standards[0].students_struggling, 1);
    }

    #[test]
    fn score_trend_uses_a_five_point_band() {
        assert_eq!(score_trend(70.0, 76.0), ScoreTrend::Up);
        assert_eq!(score_trend(70.0, 64.0), ScoreTrend::Down);
        assert_eq!(score_trend(70.0, 74.0), ScoreTrend::Stable);
        assert_eq!(score_trend(70.0, 66.0), ScoreTrend::Stable);
    }

    #[test]
    fn student_profile_classifies_standards() {
        let ana = student("Ana");
        let test = Uuid::new_v4();

        let submissions = vec![
            with_skill(
                with_skill(submission(&ana, test, 75.0), "8.EE.7", 9, 10),
                "8.F.1",
                3,
                10,
            ),
            with_skill(submission(&ana, test, 85.0), "8.G.5", 7, 10),
        ];

        let titles = HashMap::from([(test, "Unit 1".to_string())]);
        let profile = build_student_profile(&ana, &submissions, &titles);

        assert_eq!(profile.tests_taken, 2);
        assert_eq!(profile.overall_average, 80.0);
        assert_eq!(profile.highest_score, 85.0);
        // 8.EE.7 at 90% mastered, 8.F.1 at 30% needs support, 8.G.5 at 70% neither.
        assert_eq!(profile.standards_mastered, 1);
        assert_eq!(profile.needs_support, vec!["8.F.1".to_string()]);
        assert_eq!(profile.test_history[1].trend, ScoreTrend::Up);
        assert_eq!(profile.test_history[0].quiz_title, "Unit 1");
    }

    #[test]
    fn empty_profile_is_all_zeroes() {
        let ana = student("Ana");
        let profile = build_student_profile(&ana, &[], &HashMap::new());
        assert_eq!(profile.tests_taken, 0);
        assert_eq!(profile.overall_average, 0.0);
        assert!(profile.test_history.is_empty());
    }

    #[test]
    fn groupings_sort_weakest_first_and_largest_group_first() {
        let ana = student("Ana");
        let ben = student("Ben");
        let cara = student("Cara");
        let test = Uuid::new_v4();

        let submissions = vec![
            with_skill(submission(&ana, test, 40.0), "8.EE.7", 1, 5),
            with_skill(submission(&ben, test, 50.0), "8.EE.7", 2, 5),
            with_skill(submission(&cara, test, 55.0), "8.F.1", 3, 10),
        ];
        let students = vec![ana, ben, cara];

        let result = build_groupings("Period 3", &submissions, &students);

        assert_eq!(result.groupings.len(), 2);
        assert_eq!(result.groupings[0].standard, "8.EE.7");
        assert_eq!(result.groupings[0].students.len(), 2);
        assert_eq!(result.groupings[0].students[0].student_name, "Ana");
    }

    #[test]
    fn mastered_standards_are_left_out_of_groupings() {
        let ana = student("Ana");
        let test = Uuid::new_v4();

        let submissions = vec![with_skill(submission(&ana, test, 95.0), "8.EE.7", 5, 5)];
        let result = build_groupings("Period 3", &submissions, &[ana]);
        assert!(result.groupings.is_empty());
    }

    #[test]
    fn coverage_counts_questions_and_averages_breakdowns() {
        let teacher = Uuid::new_v4();
        let quiz = QuizTest::new(
            "Unit 1",
            teacher,
            None,
            vec![
                crate::data::quiz::Question {
                    id: Uuid::new_v4(),
                    question_text: "q1".into(),
                    options: vec!["a".into(), "b".into()],
                    correct_answer: 0,
                    skill: "8.EE.7".into(),
                },
                crate::data::quiz::Question {
                    id: Uuid::new_v4(),
                    question_text: "q2".into(),
                    options: vec!["a".into(), "b".into()],
                    correct_answer: 1,
                    skill: "8.EE.7".into(),
                },
            ],
        );

        let ana = student("Ana");
        let submissions = vec![with_skill(submission(&ana, quiz.id, 50.0), "8.EE.7", 1, 2)];

        let coverage = build_standards_coverage(&[quiz], &submissions);
        assert_eq!(coverage.assessed_count, 1);
        assert_eq!(coverage.assessed[0].times_assessed, 2);
        assert_eq!(coverage.assessed[0].average_score, 50.0);
    }

    #[test]
    fn declining_needs_three_scores_and_a_real_drop() {
        assert_eq!(risk_trend(&[50.0, 40.0]), RiskTrend::Stable);
        assert_eq!(risk_trend(&[80.0, 80.0, 80.0, 60.0, 60.0, 60.0]), RiskTrend::Declining);
        assert_eq!(risk_trend(&[80.0, 80.0, 80.0, 78.0, 78.0, 78.0]), RiskTrend::Stable);
    }

    #[test]
    fn priority_ladder() {
        assert_eq!(risk_priority(55.0, RiskTrend::Stable), Priority::Critical);
        assert_eq!(risk_priority(68.0, RiskTrend::Declining), Priority::Critical);
        assert_eq!(risk_priority(62.0, RiskTrend::Stable), Priority::High);
        assert_eq!(risk_priority(68.0, RiskTrend::Stable), Priority::Medium);
    }

    #[test]
    fn at_risk_skips_students_above_threshold() {
        let ana = student("Ana");
        let ben = student("Ben");
        let test = Uuid::new_v4();

        let submissions = vec![
            submission(&ana, test, 95.0),
            with_skill(submission(&ben, test, 55.0), "8.EE.7", 1, 5),
        ];
        let students = vec![ana, ben];

        let flagged = class_at_risk("Period 3", &submissions, &students, 70.0);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].name, "Ben");
        assert_eq!(flagged[0].priority_level, Priority::Critical);
        assert_eq!(flagged[0].struggling_standards[0].standard, "8.EE.7");
    }
}
