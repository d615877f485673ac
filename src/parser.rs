//! Extracts `@@@task ... @@@` blocks from a coordinator's free-text plan
//! into structured `Task` records. Never fails: malformed or missing
//! sections simply yield empty fields, since a model's plan output is
//! never something this crate can reject outright.
use crate::constants::DEFAULT_TASK_TITLE;
use crate::models::Task;
use regex::Regex;

fn block_regex() -> Regex {
    Regex::new(r"(?s)@@@task\s*\n(.*?)\n@@@").expect("static task block pattern is always valid")
}

fn section_regex(heading: &str) -> Regex {
    let escaped = regex::escape(heading);
    Regex::new(&format!(r"(?s)##\s*{escaped}\s*\n(.*?)(?:\n##\s|\z)")).expect("static section pattern is always valid")
}

fn extract_title(body: &str) -> String {
    for line in body.lines() {
        let trimmed = line.trim_start();
        if let Some(title) = trimmed.strip_prefix("# ") {
            let title = title.trim();
            if !title.is_empty() {
                return title.to_string();
            }
        }
    }
    DEFAULT_TASK_TITLE.to_string()
}

fn extract_section_text(body: &str, heading: &str) -> Option<String> {
    section_regex(heading)
        .captures(body)
        .map(|c| c[1].trim().to_string())
}

fn extract_section_list(body: &str, heading: &str) -> Vec<String> {
    extract_section_text(body, heading)
        .map(|text| {
            text.lines()
                .filter_map(|line| {
                    let trimmed = line.trim();
                    trimmed.strip_prefix('-').map(|item| item.trim().to_string())
                })
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Parses every `@@@task` block in `plan_text` into a fresh, PENDING Task
/// belonging to `workspace_id`. Text outside blocks is ignored; blocks with
/// a whitespace-only body still produce a Task with the default title.
pub fn parse_tasks(plan_text: &str, workspace_id: &str) -> Vec<Task> {
    block_regex()
        .captures_iter(plan_text)
        .map(|caps| {
            let body = caps[1].to_string();
            let mut task = Task::new(workspace_id, extract_title(&body));
            task.objective = extract_section_text(&body, "Objective").unwrap_or_default();
            task.scope = extract_section_list(&body, "Scope");
            task.acceptance_criteria = extract_section_list(&body, "Definition of Done");
            task.verification_commands = extract_section_list(&body, "Verification");
            task
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_TASK_PLAN: &str = r#"
Some preamble the coordinator writes that should be ignored entirely.

@@@task
# Implement Login API

## Objective
Add a POST /login endpoint that issues a session token.

## Scope
- Add route handler
- Validate credentials against the user store

## Definition of Done
- Endpoint returns 200 with a token on success
- Endpoint returns 401 on bad credentials

## Verification
- cargo test login
@@@

Some text between blocks.

@@@task
# Add User Registration

## Objective
Allow new users to sign up.

## Scope
- Add registration route

## Definition of Done
- New user can sign up and then log in

## Verification
- cargo test registration
@@@
"#;

    #[test]
    fn parses_two_full_blocks() {
        let tasks = parse_tasks(TWO_TASK_PLAN, "ws1");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "Implement Login API");
        assert_eq!(tasks[1].title, "Add User Registration");
        assert_eq!(tasks[0].scope.len(), 2);
        assert_eq!(tasks[0].acceptance_criteria.len(), 2);
        assert_eq!(tasks[0].verification_commands, vec!["cargo test login"]);
        assert!(tasks[0].objective.contains("session token"));
    }

    #[test]
    fn text_outside_blocks_is_ignored() {
        let tasks = parse_tasks("no task blocks here at all", "ws1");
        assert!(tasks.is_empty());
    }

    #[test]
    fn whitespace_only_body_still_yields_default_title() {
        let plan = "@@@task\n   \n@@@";
        let tasks = parse_tasks(plan, "ws1");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Untitled Task");
        assert!(tasks[0].scope.is_empty());
    }

    #[test]
    fn missing_sections_become_empty_fields() {
        let plan = "@@@task\n# Only A Title\n@@@";
        let tasks = parse_tasks(plan, "ws1");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Only A Title");
        assert_eq!(tasks[0].objective, "");
        assert!(tasks[0].scope.is_empty());
    }

    #[test]
    fn parser_never_fails_on_garbage_input() {
        let garbage = "@@@task\n### not a title line\n## Scope\nnot a dash item\n@@@@@@";
        let tasks = parse_tasks(garbage, "ws1");
        assert_eq!(tasks.len(), 1);
    }
}
