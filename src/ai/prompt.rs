//! Prompt templates for the three generation tasks.

use crate::data::plan::LessonPlanCreate;
use crate::util::SchoolDay;

pub static LESSON_PLAN_SYSTEM: &str =
    "You are an expert education consultant helping teachers create detailed daily lesson plans.";

pub static QUESTION_SYSTEM: &str = "You are an expert education assessment creator. Generate \
     high-quality multiple choice questions aligned with state educational standards.";

pub static REMEDIATION_SYSTEM: &str =
    "You are an expert education interventionist providing targeted remediation strategies.";

/// Prompt for one day of a multi-day plan. `index` is zero-based.
pub fn lesson_day_prompt(
    request: &LessonPlanCreate,
    day: &SchoolDay,
    index: usize,
    total_days: usize,
) -> String {
    let state_standards = request
        .state_standards
        .as_deref()
        .map(|standards| format!("\nState Standards to Align With: {standards}"))
        .unwrap_or_default();

    format!(
        "Create a detailed lesson plan for {day_name}, {date} (Day {day_number} of {total_days}) based on:\n\
         \n\
         Textbook: {textbook}\n\
         Lesson Range: {lesson_range}\n\
         Overall Date Range: {start} to {end}\n\
         Next Major Assessment: {assessment}{state_standards}\n\
         \n\
         Provide specific, actionable content for THIS DAY ONLY for each section:\n\
         \n\
         1. Learner Outcomes/Objectives\n\
         2. Standards (include the relevant state standards provided above, formatted clearly)\n\
         3. Materials Needed\n\
         4. Anticipatory Set\n\
         5. Teaching the Lesson\n\
         6. Modeling\n\
         7. Instructional Strategies\n\
         8. Check for Understanding\n\
         9. Guided Practice/Monitoring\n\
         10. Independent Practice\n\
         11. Closure\n\
         12. Summative Assessment\n\
         13. Formative Assessment\n\
         14. Extended Activities\n\
         15. Review and Reteach Activities\n\
         16. Early Finishers Activities\n\
         \n\
         Make each section detailed and specific to day {day_number}.",
        day_name = day.day_name,
        date = day.date,
        day_number = index + 1,
        total_days = total_days,
        textbook = request.textbook,
        lesson_range = request.lesson_range,
        start = request.start_date,
        end = request.end_date,
        assessment = request.next_major_assessment,
        state_standards = state_standards,
    )
}

/// Prompt asking for `count` multiple-choice questions for one standard,
/// returned as a bare JSON array.
pub fn question_prompt(standard: &str, count: usize) -> String {
    format!(
        "Generate {count} multiple choice questions to assess student understanding of this educational standard:\n\
         \n\
         Standard: {standard}\n\
         \n\
         For each question:\n\
         1. Make it grade-appropriate and aligned with the standard\n\
         2. Provide exactly 4 answer options\n\
         3. Indicate which option (0-3) is correct\n\
         4. Ensure distractors are plausible but clearly wrong\n\
         5. Questions should test knowledge, comprehension, or application related to this standard\n\
         \n\
         Return ONLY a JSON array in this exact format:\n\
         [\n\
           {{\n\
             \"question_text\": \"question here\",\n\
             \"options\": [\"option 1\", \"option 2\", \"option 3\", \"option 4\"],\n\
             \"correct_answer\": 0,\n\
             \"skill\": \"{standard}\"\n\
           }}\n\
         ]\n\
         \n\
         Return ONLY the JSON array, no other text."
    )
}

/// Prompt for five remediation activities targeting one skill.
pub fn remediation_prompt(skill: &str, student_names: &[String]) -> String {
    let students = if student_names.is_empty() {
        "Multiple students".to_string()
    } else {
        student_names.join(", ")
    };

    format!(
        "Provide exactly 5 specific, actionable remediation activities for students struggling with the following standard/skill:\n\
         \n\
         Standard/Skill: {skill}\n\
         \n\
         Students needing help: {students}\n\
         \n\
         Requirements for EACH of the 5 activities:\n\
         - Be specific and immediately actionable in the classroom\n\
         - Include materials needed (common classroom items)\n\
         - Suggest duration (5-15 minutes)\n\
         - Make it engaging and age-appropriate\n\
         - Build from concrete to abstract understanding\n\
         - Focus on the specific standard/skill listed above\n\
         \n\
         Format: Return exactly 5 activities as a clear numbered list (1-5). Each activity should be 2-3 sentences."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::school_days_in_range;

    #[test]
    fn day_prompt_numbers_from_one() {
        let request = LessonPlanCreate {
            textbook: "Go Math Grade 8".into(),
            start_date: "2025-01-13".into(),
            end_date: "2025-01-17".into(),
            lesson_range: "Chapter 4".into(),
            next_major_assessment: "Unit test Friday".into(),
            state_standards: None,
        };
        let days = school_days_in_range("2025-01-13", "2025-01-17").unwrap();

        let prompt = lesson_day_prompt(&request, &days[0], 0, days.len());
        assert!(prompt.contains("Monday, 2025-01-13 (Day 1 of 5)"));
        assert!(prompt.contains("Textbook: Go Math Grade 8"));
        assert!(!prompt.contains("State Standards to Align With"));
    }

    #[test]
    fn day_prompt_includes_standards_when_given() {
        let request = LessonPlanCreate {
            textbook: "Go Math".into(),
            start_date: "2025-01-13".into(),
            end_date: "2025-01-13".into(),
            lesson_range: "4.1".into(),
            next_major_assessment: "Quiz".into(),
            state_standards: Some("8.EE.7, 8.F.1".into()),
        };
        let days = school_days_in_range("2025-01-13", "2025-01-13").unwrap();

        let prompt = lesson_day_prompt(&request, &days[0], 0, 1);
        assert!(prompt.contains("State Standards to Align With: 8.EE.7, 8.F.1"));
    }

    #[test]
    fn question_prompt_pins_the_skill() {
        let prompt = question_prompt("8.EE.7", 3);
        assert!(prompt.contains("Generate 3 multiple choice questions"));
        assert!(prompt.contains("\"skill\": \"8.EE.7\""));
    }

    #[test]
    fn remediation_prompt_falls_back_without_names() {
        let prompt = remediation_prompt("8.F.1", &[]);
        assert!(prompt.contains("Students needing help: Multiple students"));

        let prompt = remediation_prompt("8.F.1", &["Ana".to_string(), "Ben".to_string()]);
        assert!(prompt.contains("Students needing help: Ana, Ben"));
    }
}
