//! Parsers for model output: lesson-plan sections, standard codes, and
//! generated question JSON.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

/// Raw text for each of the sixteen lesson-plan sections, in document order.
/// Empty string means the heading was never matched in the response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanSections {
    pub learner_outcomes: String,
    pub standards: String,
    pub materials_needed: String,
    pub anticipatory_set: String,
    pub teaching_lesson: String,
    pub modeling: String,
    pub instructional_strategies: String,
    pub check_understanding: String,
    pub guided_practice: String,
    pub independent_practice: String,
    pub closure: String,
    pub summative_assessment: String,
    pub formative_assessment: String,
    pub extended_activities: String,
    pub review_reteach: String,
    pub early_finishers: String,
}

impl PlanSections {
    pub fn is_empty(&self) -> bool {
        self.as_fields().iter().all(|(_, value)| value.is_empty())
    }

    fn as_fields(&self) -> [(&'static str, &String); 16] {
        [
            ("learner_outcomes", &self.learner_outcomes),
            ("standards", &self.standards),
            ("materials_needed", &self.materials_needed),
            ("anticipatory_set", &self.anticipatory_set),
            ("teaching_lesson", &self.teaching_lesson),
            ("modeling", &self.modeling),
            ("instructional_strategies", &self.instructional_strategies),
            ("check_understanding", &self.check_understanding),
            ("guided_practice", &self.guided_practice),
            ("independent_practice", &self.independent_practice),
            ("closure", &self.closure),
            ("summative_assessment", &self.summative_assessment),
            ("formative_assessment", &self.formative_assessment),
            ("extended_activities", &self.extended_activities),
            ("review_reteach", &self.review_reteach),
            ("early_finishers", &self.early_finishers),
        ]
    }

    fn field_mut(&mut self, key: &str) -> &mut String {
        match key {
            "learner_outcomes" => &mut self.learner_outcomes,
            "standards" => &mut self.standards,
            "materials_needed" => &mut self.materials_needed,
            "anticipatory_set" => &mut self.anticipatory_set,
            "teaching_lesson" => &mut self.teaching_lesson,
            "modeling" => &mut self.modeling,
            "instructional_strategies" => &mut self.instructional_strategies,
            "check_understanding" => &mut self.check_understanding,
            "guided_practice" => &mut self.guided_practice,
            "independent_practice" => &mut self.independent_practice,
            "closure" => &mut self.closure,
            "summative_assessment" => &mut self.summative_assessment,
            "formative_assessment" => &mut self.formative_assessment,
            "extended_activities" => &mut self.extended_activities,
            "review_reteach" => &mut self.review_reteach,
            "early_finishers" => &mut self.early_finishers,
            _ => unreachable!("unknown section key"),
        }
    }
}

/// Heading keywords mapped to their section field. Checked in order, first
/// match wins, so the more specific aliases come before shorter ones.
static SECTION_KEYWORDS: [(&str, &str); 19] = [
    ("learner outcomes", "learner_outcomes"),
    ("objectives", "learner_outcomes"),
    ("standards", "standards"),
    ("materials needed", "materials_needed"),
    ("anticipatory set", "anticipatory_set"),
    ("teaching the lesson", "teaching_lesson"),
    ("modeling", "modeling"),
    ("instructional strategies", "instructional_strategies"),
    ("check for understanding", "check_understanding"),
    ("guided practice", "guided_practice"),
    ("monitoring", "guided_practice"),
    ("independent practice", "independent_practice"),
    ("closure", "closure"),
    ("summative assessment", "summative_assessment"),
    ("formative assessment", "formative_assessment"),
    ("extended activities", "extended_activities"),
    ("review and reteach", "review_reteach"),
    ("reteach activities", "review_reteach"),
    ("early finishers", "early_finishers"),
];

/// Splits a free-form lesson-plan response into sections by scanning for
/// heading-like lines. If nothing matches at all, the entire response lands
/// in `teaching_lesson`.
pub fn parse_plan_sections(response: &str) -> PlanSections {
    let mut sections = PlanSections::default();
    let mut current: Option<&'static str> = None;
    let mut buffer: Vec<&str> = vec![];

    for line in response.lines() {
        let lowered = line.to_lowercase();
        let lowered = lowered.trim();

        let heading = SECTION_KEYWORDS.iter().find(|(keyword, _)| {
            lowered.contains(keyword)
                && (line.starts_with('#')
                    || line.starts_with("**")
                    || line.ends_with(':')
                    || line.len() < 50)
        });

        if let Some((_, field)) = heading {
            if let Some(section) = current {
                *sections.field_mut(section) = buffer.join("\n").trim().to_string();
            }
            current = Some(field);
            buffer.clear();
        } else if current.is_some() {
            buffer.push(line);
        }
    }

    if let Some(section) = current {
        *sections.field_mut(section) = buffer.join("\n").trim().to_string();
    }

    if sections.is_empty() {
        sections.teaching_lesson = response.to_string();
    }

    sections
}

lazy_static! {
    /// Standard code at line start, terminated by a colon, closing paren, or
    /// end of line. e.g. "8.EE.7: Solve linear equations".
    static ref COLON_CODE: Regex =
        Regex::new(r"(?i)^[\s\-\*•]*([A-Z0-9][A-Z0-9.\-]+[0-9A-Z])(?:\s*[:)]|$)").unwrap();
    /// Standard code wrapped in brackets or bold markers, e.g. "[8.EE.7]"
    /// or "**8.EE.7**".
    static ref BRACKET_CODE: Regex =
        Regex::new(r"(?i)[\[\*]+([A-Z0-9][A-Z0-9.\-]+[0-9A-Z])[\]\*]+").unwrap();
}

fn looks_like_standard_code(code: &str) -> bool {
    code.contains('.') && code.chars().any(|c| c.is_ascii_digit())
}

/// Pulls standard codes (e.g. "8.EE.7") out of free-form standards text.
/// Returns them sorted and deduplicated. Placeholder text from unparsed
/// sections is skipped wholesale.
pub fn extract_standards<'a>(blocks: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut codes = BTreeSet::new();

    for block in blocks {
        let lowered = block.to_lowercase();
        if lowered.contains("see full plan below") || lowered.contains("content will be generated")
        {
            continue;
        }

        for line in block.lines() {
            if let Some(captures) = COLON_CODE.captures(line.trim()) {
                let code = captures[1].trim().to_string();
                if looks_like_standard_code(&code) {
                    codes.insert(code);
                }
                continue;
            }

            for captures in BRACKET_CODE.captures_iter(line) {
                let code = captures[1].trim().to_string();
                if looks_like_standard_code(&code) {
                    codes.insert(code);
                }
            }
        }
    }

    codes.into_iter().collect()
}

/// Extracts the body of a numbered "2. Standards" block from text that kept
/// the full prompt outline, stopping at the next numbered heading.
pub fn standards_block(text: &str) -> Option<String> {
    lazy_static! {
        static ref BLOCK_START: Regex = Regex::new(r"(?i)^(?:###\s*)?2\.\s*Standards?\s*$").unwrap();
        static ref NEXT_HEADING: Regex = Regex::new(r"^(?:###\s*)?\d+\.").unwrap();
    }

    let mut lines = text.lines();
    lines.find(|line| BLOCK_START.is_match(line.trim()))?;

    // The line right after the heading always belongs to the block, even
    // when it starts with a numbered code like "8.EE.7:". The terminator
    // only applies from the second body line on.
    let mut body = vec![lines.next()?];
    body.extend(lines.take_while(|line| !NEXT_HEADING.is_match(line)));

    let body = body.join("\n").trim().to_string();
    (!body.is_empty()).then_some(body)
}

/// Strips list markers and numbering from an objective line. Returns `None`
/// for lines too short to be a real objective.
pub fn clean_objective_line(line: &str) -> Option<String> {
    let cleaned = line
        .trim()
        .trim_start_matches(['•', '-', '*', '1', '2', '3', '4', '5', '6', '7', '8', '9', '.', '(', ')', ' '])
        .trim();

    (cleaned.len() > 10).then(|| cleaned.to_string())
}

/// Question shape the model is asked to produce.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedQuestion {
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
}

/// Parses the first JSON array found in the response. Models often wrap the
/// array in prose or code fences despite instructions.
pub fn extract_question_array(response: &str) -> Option<Vec<GeneratedQuestion>> {
    let start = response.find('[')?;
    let end = response.rfind(']')?;
    if end <= start {
        return None;
    }

    serde_json::from_str(&response[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_markdown_headings_into_sections() {
        let response = "\
## 1. Learner Outcomes/Objectives
Students will solve two-step equations.

## 3. Materials Needed
Whiteboard, algebra tiles.

## 5. Teaching the Lesson
Work through examples 1-3 on page 112.";

        let sections = parse_plan_sections(response);
        assert_eq!(
            sections.learner_outcomes,
            "Students will solve two-step equations."
        );
        assert_eq!(sections.materials_needed, "Whiteboard, algebra tiles.");
        assert_eq!(
            sections.teaching_lesson,
            "Work through examples 1-3 on page 112."
        );
        assert_eq!(sections.standards, "");
    }

    #[test]
    fn unstructured_response_falls_back_to_teaching_lesson() {
        let response = "Today we will go over a long unstructured narrative of the class period that never mentions any of the expected headings in a way that could anchor a split.";
        let sections = parse_plan_sections(response);
        assert_eq!(sections.teaching_lesson, response);
    }

    #[test]
    fn long_prose_line_mentioning_a_keyword_is_not_a_heading() {
        let response = "\
**Closure**
Exit ticket with two problems. During guided practice earlier in the period students already saw similar problems on the board.";

        let sections = parse_plan_sections(response);
        assert!(sections.closure.contains("Exit ticket"));
        assert_eq!(sections.guided_practice, "");
    }

    #[test]
    fn extracts_codes_with_colons_and_brackets() {
        let blocks = [
            "- 8.EE.7: Solve linear equations in one variable\n**8.F.1** understand functions",
            "Content will be generated",
        ];
        let codes = extract_standards(blocks);
        assert_eq!(codes, vec!["8.EE.7".to_string(), "8.F.1".to_string()]);
    }

    #[test]
    fn codes_without_dots_or_digits_are_rejected() {
        let codes = extract_standards(["- ABC: not a standard\n- 8EE7: also not one"]);
        assert!(codes.is_empty());
    }

    #[test]
    fn standards_block_stops_at_next_numbered_heading() {
        let text = "\
1. Learner Outcomes
Solve equations.
### 2. Standards
8.EE.7: Linear equations
- 8.EE.8: Systems
### 3. Materials Needed
Tiles";

        let block = standards_block(text).unwrap();
        assert!(block.contains("8.EE.7"));
        assert!(block.contains("8.EE.8"));
        assert!(!block.contains("Tiles"));
    }

    #[test]
    fn standards_block_keeps_a_colon_form_first_line() {
        let text = "\
### 2. Standards
8.EE.7: Linear equations
3. Materials Needed
Tiles";

        let block = standards_block(text).unwrap();
        assert_eq!(block, "8.EE.7: Linear equations");
    }

    #[test]
    fn standards_block_terminates_on_a_bare_numbered_line() {
        let text = "\
### 2. Standards
State algebra standards
8.F.1 and related codes
More context";

        // "8.F.1 ..." starts with a numbered prefix and ends the block.
        let block = standards_block(text).unwrap();
        assert_eq!(block, "State algebra standards");
    }

    #[test]
    fn standards_block_absent_returns_none() {
        assert_eq!(standards_block("no numbered outline here"), None);
    }

    #[test]
    fn objective_lines_are_cleaned_and_filtered() {
        assert_eq!(
            clean_objective_line("• 1. Students will graph linear functions"),
            Some("Students will graph linear functions".to_string())
        );
        assert_eq!(clean_objective_line("- short"), None);
    }

    #[test]
    fn question_array_is_found_inside_prose() {
        let response = r#"Here are your questions:
[
  {"question_text": "What is 2+2?", "options": ["3", "4", "5", "6"], "correct_answer": 1}
]
Let me know if you need more."#;

        let questions = extract_question_array(response).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].correct_answer, 1);
    }

    #[test]
    fn malformed_json_yields_none() {
        assert!(extract_question_array("no array here").is_none());
        assert!(extract_question_array("[{not json}]").is_none());
    }
}
