//! Instruction assembly for the LLM grader.
//!
//! Templates carry two named placeholders, `{rubric}` and `{submission}`.
//! User-supplied content is brace-escaped before substitution so pasted
//! source code full of `{` and `}` can never collide with placeholder
//! syntax; the escaping is undone when the final instruction is produced,
//! so content braces come out verbatim.

/// The built-in grading instruction. Codifies rubric-only grading and a
/// strict plain-text output grammar of `Criterion / Score / Evidence`
/// blocks followed by a total and a teacher comment.
pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"You are an AI assistant that grades student work against a rubric for a human teacher.

You will always be given:
RUBRIC:
{rubric}

STUDENT SUBMISSION:
{submission}

Your job is to carefully read the ENTIRE student submission and grade it ONLY using the rubric. Always look for:
- What the work actually does or says (semantic understanding).
- Whether specific requirements, constraints, or features in the rubric are present (rule checking).

GENERAL GRADING PRINCIPLES:
- Obey the rubric exactly. If it defines point values, levels (e.g., Exemplary / Proficient / Developing), or specific requirements, follow them.
- If the rubric is vague, make a reasonable assumption and explain it briefly in the justification.
- Never award full credit when clear rubric requirements are missing.
- Partial credit is allowed when some, but not all, expectations for a criterion are met.
- If something is completely missing, award 0 points for that criterion.

TREAT DIFFERENT TYPES OF WORK CAREFULLY:
- For CODE (C++, Java, Python, etc.), consider:
  - Does it compile or look syntactically valid?
  - Does it logically implement the required behavior?
  - Are required methods, classes, variables, and control structures present?
  - Are naming and style conventions followed if the rubric mentions them?
- For ESSAYS or WRITING, consider:
  - Does it answer the prompt?
  - Does it follow structure and length requirements?
  - Does it include required evidence, explanation, or formatting specified in the rubric?

OUTPUT FORMAT (PLAIN TEXT ONLY):
Return plain text with NO Markdown and NO bullets.

For each rubric criterion or row, output in this exact pattern:

Criterion: <short name or description of the rubric criterion>
Score: <earned_points>/<max_points>
Evidence: <1-3 clear sentences citing specific features of the student work, or explaining what is missing>

Leave exactly one blank line between criteria.

AFTER ALL CRITERIA, add a final section:

Total Score: <sum_earned_points>/<sum_max_points>

Teacher Comment Summary:
<2-4 complete sentences that a teacher can paste into Canvas or Google Classroom. Mention strengths first, then specific areas to improve, and, if helpful, a next step or suggestion for the student.>

FORMATTING RULES (VERY IMPORTANT):
- Do NOT use ** or any other Markdown.
- Do NOT use bullets like *, -, +.
- Do NOT use numbered lists like 1), 2), etc.
- Do NOT include code fences or backticks.
- Use only normal sentences and line breaks.

If the rubric does not clearly state total points, make a reasonable interpretation, explain it briefly in the first Evidence line of the first criterion, and still follow the same output structure."#;

/// Doubles every curly brace so the text can pass through substitution
/// without triggering placeholder syntax.
fn escape_braces(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}

/// Substitutes the rubric and submission blocks into `template`.
///
/// The scan recognizes `{{` / `}}` as escaped literals and `{rubric}` /
/// `{submission}` as placeholders; any other `{...}` sequence, and an
/// unterminated `{`, is copied through verbatim. A placeholder occurring
/// inside user content does not recurse: content is escaped up front, so
/// a submission containing the text `{rubric}` survives as that literal
/// text in the final instruction.
pub fn assemble(template: &str, rubric: &str, submission: &str) -> String {
    let rubric = escape_braces(rubric);
    let submission = escape_braces(submission);

    let mut out = String::with_capacity(template.len() + rubric.len() + submission.len());
    let bytes = template.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                out.push_str("{{");
                i += 2;
            }
            b'{' => match template[i + 1..].find('}') {
                Some(end) => {
                    let name = &template[i + 1..i + 1 + end];
                    match name {
                        "rubric" => out.push_str(&rubric),
                        "submission" => out.push_str(&submission),
                        _ => out.push_str(&template[i..i + end + 2]),
                    }
                    i += end + 2;
                }
                None => {
                    out.push_str(&template[i..]);
                    i = bytes.len();
                }
            },
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                out.push_str("}}");
                i += 2;
            }
            _ => {
                // Advance by whole chars so multi-byte text stays intact.
                let ch_len = template[i..].chars().next().map(char::len_utf8).unwrap_or(1);
                out.push_str(&template[i..i + ch_len]);
                i += ch_len;
            }
        }
    }

    out.replace("{{", "{").replace("}}", "}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_both_placeholders() {
        let result = assemble("R: {rubric}\nS: {submission}", "my rubric", "my work");
        assert_eq!(result, "R: my rubric\nS: my work");
    }

    #[test]
    fn content_braces_survive_verbatim() {
        let code = "int main() { return 0; }";
        let result = assemble("{rubric}|{submission}", "braces {x}", code);
        assert_eq!(result, "braces {x}|int main() { return 0; }");
    }

    #[test]
    fn placeholder_text_inside_content_is_not_substituted() {
        let result = assemble("{rubric}", "see {submission} above", "ignored");
        assert_eq!(result, "see {submission} above");
    }

    #[test]
    fn escaped_braces_in_template_become_literals() {
        let result = assemble("use {{braces}} and {rubric}", "R", "S");
        assert_eq!(result, "use {braces} and R");
    }

    #[test]
    fn unknown_and_unterminated_placeholders_pass_through() {
        assert_eq!(assemble("{other} {rubric}", "R", "S"), "{other} R");
        assert_eq!(assemble("trailing {rub", "R", "S"), "trailing {rub");
    }

    #[test]
    fn default_template_has_both_placeholders() {
        assert!(DEFAULT_PROMPT_TEMPLATE.contains("{rubric}"));
        assert!(DEFAULT_PROMPT_TEMPLATE.contains("{submission}"));

        let result = assemble(DEFAULT_PROMPT_TEMPLATE, "Thesis (10 pts)", "My essay.");
        assert!(result.contains("RUBRIC:\nThesis (10 pts)"));
        assert!(result.contains("STUDENT SUBMISSION:\nMy essay."));
        assert!(!result.contains("{rubric}"));
        assert!(!result.contains("{submission}"));
    }
}
