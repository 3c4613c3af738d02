//! Quiz prompt rendering.
//!
//! The base prompt is rendered once per generation cycle; retries reuse it and
//! append the previous failure as a "fix and regenerate" note.

use crate::domain::level_description;
use crate::util::fill_template;

pub const QUIZ_PROMPT_TEMPLATE: &str = r#"
<|system|>
You are an AI Examiner for an Adaptive Quiz System.

STRICT NON-NEGOTIABLE RULES:
- Output ONLY valid JSON with NO extra text
- Generate EXACTLY ONE new question
- Generate EXACTLY 4 options
- correct_option_index MUST be 0, 1, 2, or 3 (REQUIRED - NEVER -1, NEVER null, NEVER missing)
- The correct_option_index must point to the ACTUAL correct answer in the options array
- hint and explanation are MANDATORY
- DO NOT repeat any previous question
- DO NOT reuse the same scenario, wording, or concept as questions in SESSION HISTORY
<|end|>
<|user|>
Context:
- Domain: {domain_name}
- Program: {program_name}
- Target Level: {level_description} (Level {level_int}/5)

SESSION HISTORY (DO NOT REPEAT):
{history_json}

INSTRUCTIONS:
1. Create a NEW question for the domain and program that is NOT in the history and covers a different concept, use-case or scenario.
2. Keep questions conceptual. No code snippets.
3. Write 4 distinct, plausible options without "A." / "Option A:" prefixes.
4. Choose ONE option as the correct answer and set correct_option_index to its position (0-3).
5. Provide a hint that does not reveal the answer.
6. Provide an explanation of why the answer is correct.
7. Set code_context to null.
8. Vary the question type across the session (theory, real-world use, edge cases, best practices).

OUTPUT SCHEMA:
{
  "question_id": string (non-empty),
  "question_text": string (non-empty),
  "options": [string, string, string, string],
  "correct_option_index": integer 0-3,
  "hint": string (non-empty),
  "explanation": string (non-empty),
  "code_context": string or null
}

EXAMPLE OUTPUT:
{
  "question_id": "Q-Java-001",
  "question_text": "What is the correct way to declare a String in Java?",
  "options": ["String name = \"John\";", "str name = \"John\";", "text name = \"John\";", "character name = \"John\";"],
  "correct_option_index": 0,
  "hint": "Look for the Java keyword that represents text data.",
  "explanation": "In Java, the String class (capital S) is used for text.",
  "code_context": null
}

OUTPUT ONLY THE JSON OBJECT. NO TEXT BEFORE OR AFTER.
<|end|>
<|assistant|>
"#;

/// Renders the base prompt for one generation cycle.
pub struct PromptBuilder<'a> {
  template: &'a str,
}

impl<'a> PromptBuilder<'a> {
  pub fn new(template: &'a str) -> Self {
    Self { template }
  }

  /// `history` is the combined history as prior question texts, oldest first.
  pub fn build(&self, domain: &str, program: &str, level: u8, history: &[&str]) -> String {
    let history_json = serde_json::to_string_pretty(history).unwrap_or_else(|_| "[]".into());
    let level_int = level.to_string();
    fill_template(
      self.template,
      &[
        ("domain_name", domain),
        ("program_name", program),
        ("level_description", level_description(level)),
        ("level_int", &level_int),
        ("history_json", &history_json),
      ],
    )
  }
}

/// Base prompt plus the corrective note for a retry. `None` returns the base unchanged.
pub fn with_previous_error(base: &str, last_error: Option<&str>) -> String {
  match last_error {
    Some(err) if !err.is_empty() => format!("{base}\nPREVIOUS ERROR:\n{err}\nFIX AND REGENERATE."),
    _ => base.to_string(),
  }
}
