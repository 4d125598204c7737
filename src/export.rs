//! Word-document export for lesson plans.

use std::io::Cursor;

use docx_rs::{AlignmentType, BreakType, Docx, Paragraph, Run};
use rocket::http::{ContentType, Status};
use rocket::response::Responder;
use rocket::{response, Request, Response};

use crate::data::plan::{DayPlan, LessonPlan};
use crate::resp::problem::Problem;

/// Document structure independent of the docx backend, which keeps the
/// layout testable without unpacking zip output.
#[derive(Debug, Clone, PartialEq)]
pub enum DocBlock {
    Title(String),
    Heading1(String),
    Heading2(String),
    Text(String),
    PageBreak,
}

/// Section titles paired with their day-plan content, in print order.
pub fn day_sections(day: &DayPlan) -> [(&'static str, &str); 16] {
    [
        ("Learner Outcomes/Objectives", &day.learner_outcomes),
        ("Standards", &day.standards),
        ("Materials Needed", &day.materials_needed),
        ("Anticipatory Set", &day.anticipatory_set),
        ("Teaching the Lesson", &day.teaching_lesson),
        ("Modeling", &day.modeling),
        ("Instructional Strategies", &day.instructional_strategies),
        ("Check for Understanding", &day.check_understanding),
        ("Guided Practice/Monitoring", &day.guided_practice),
        ("Independent Practice", &day.independent_practice),
        ("Closure", &day.closure),
        ("Summative Assessment", &day.summative_assessment),
        ("Formative Assessment", &day.formative_assessment),
        ("Extended Activities", &day.extended_activities),
        ("Review and Reteach Activities", &day.review_reteach),
        ("Early Finishers Activities", &day.early_finishers),
    ]
}

/// Lays out the whole plan: title, summary lines, then one page per day.
pub fn plan_blocks(plan: &LessonPlan) -> Vec<DocBlock> {
    let mut blocks = vec![
        DocBlock::Title("Lesson Plan".to_string()),
        DocBlock::Text(format!("Textbook: {}", plan.textbook)),
        DocBlock::Text(format!("Lesson Range: {}", plan.lesson_range)),
        DocBlock::Text(format!(
            "Date Range: {} to {}",
            plan.start_date, plan.end_date
        )),
        DocBlock::Text(format!(
            "Next Major Assessment: {}",
            plan.next_major_assessment
        )),
        DocBlock::Text(String::new()),
    ];

    for day in &plan.daily_plans {
        blocks.push(DocBlock::Heading1(format!(
            "{} - {}",
            day.day_name, day.day_date
        )));

        for (title, content) in day_sections(day) {
            blocks.push(DocBlock::Heading2(title.to_string()));
            let content = if content.is_empty() { "N/A" } else { content };
            blocks.push(DocBlock::Text(content.to_string()));
        }

        blocks.push(DocBlock::PageBreak);
    }

    blocks
}

fn paragraph(block: &DocBlock) -> Paragraph {
    match block {
        DocBlock::Title(text) => Paragraph::new()
            .add_run(Run::new().add_text(text.as_str()).size(48).bold())
            .align(AlignmentType::Center),
        DocBlock::Heading1(text) => {
            Paragraph::new().add_run(Run::new().add_text(text.as_str()).size(36).bold())
        }
        DocBlock::Heading2(text) => {
            Paragraph::new().add_run(Run::new().add_text(text.as_str()).size(28).bold())
        }
        DocBlock::Text(text) => Paragraph::new().add_run(Run::new().add_text(text.as_str())),
        DocBlock::PageBreak => Paragraph::new().add_run(Run::new().add_break(BreakType::Page)),
    }
}

/// Renders the plan to docx bytes.
pub fn render_docx(plan: &LessonPlan) -> Result<Vec<u8>, Problem> {
    let mut docx = Docx::new();
    for block in plan_blocks(plan) {
        docx = docx.add_paragraph(paragraph(&block));
    }

    let mut cursor = Cursor::new(Vec::new());
    docx.build().pack(&mut cursor).map_err(|e| {
        Problem::new_untyped(Status::InternalServerError, "Document export failed.")
            .detail(e.to_string())
            .clone()
    })?;

    Ok(cursor.into_inner())
}

/// Docx file download with an attachment disposition.
#[derive(Debug)]
pub struct DocxDownload {
    pub bytes: Vec<u8>,
    pub filename: String,
}

impl<'r> Responder<'r, 'static> for DocxDownload {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        Response::build()
            .status(Status::Ok)
            .header(ContentType::new(
                "application",
                "vnd.openxmlformats-officedocument.wordprocessingml.document",
            ))
            .raw_header(
                "Content-Disposition",
                format!("attachment; filename={}", self.filename),
            )
            .sized_body(self.bytes.len(), Cursor::new(self.bytes))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn day(name: &str, date: &str) -> DayPlan {
        DayPlan {
            day_name: name.to_string(),
            day_date: date.to_string(),
            learner_outcomes: "Solve equations".to_string(),
            standards: String::new(),
            materials_needed: "Tiles".to_string(),
            anticipatory_set: String::new(),
            teaching_lesson: "Examples 1-3".to_string(),
            modeling: String::new(),
            instructional_strategies: String::new(),
            check_understanding: String::new(),
            guided_practice: String::new(),
            independent_practice: String::new(),
            closure: String::new(),
            summative_assessment: String::new(),
            formative_assessment: String::new(),
            extended_activities: String::new(),
            review_reteach: String::new(),
            early_finishers: String::new(),
        }
    }

    fn plan(days: Vec<DayPlan>) -> LessonPlan {
        LessonPlan {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            textbook: "Go Math".to_string(),
            start_date: "2025-01-13".to_string(),
            end_date: "2025-01-14".to_string(),
            lesson_range: "4.1-4.3".to_string(),
            next_major_assessment: "Friday quiz".to_string(),
            daily_plans: days,
            created_at: Utc::now(),
            submission_status: Default::default(),
            submitted_at: None,
            reviewed_at: None,
            admin_feedback: None,
            reviewed_by: None,
        }
    }

    #[test]
    fn one_day_heading_per_day() {
        let plan = plan(vec![
            day("Monday", "2025-01-13"),
            day("Tuesday", "2025-01-14"),
        ]);
        let blocks = plan_blocks(&plan);

        let headings: Vec<_> = blocks
            .iter()
            .filter(|b| matches!(b, DocBlock::Heading1(_)))
            .collect();
        assert_eq!(headings.len(), 2);
        assert_eq!(
            headings[0],
            &DocBlock::Heading1("Monday - 2025-01-13".to_string())
        );
    }

    #[test]
    fn sixteen_section_headings_per_day() {
        let plan = plan(vec![day("Monday", "2025-01-13")]);
        let count = plan_blocks(&plan)
            .iter()
            .filter(|b| matches!(b, DocBlock::Heading2(_)))
            .count();
        assert_eq!(count, 16);
    }

    #[test]
    fn empty_sections_print_as_na() {
        let plan = plan(vec![day("Monday", "2025-01-13")]);
        let blocks = plan_blocks(&plan);

        let standards_index = blocks
            .iter()
            .position(|b| b == &DocBlock::Heading2("Standards".to_string()))
            .unwrap();
        assert_eq!(blocks[standards_index + 1], DocBlock::Text("N/A".to_string()));
    }

    #[test]
    fn each_day_ends_with_a_page_break() {
        let plan = plan(vec![day("Monday", "2025-01-13")]);
        let blocks = plan_blocks(&plan);
        assert_eq!(blocks.last(), Some(&DocBlock::PageBreak));
    }

    #[test]
    fn rendering_produces_a_zip_container() {
        let plan = plan(vec![day("Monday", "2025-01-13")]);
        let bytes = render_docx(&plan).unwrap();
        // docx files are zip archives, which start with "PK".
        assert_eq!(&bytes[..2], b"PK");
    }
}
