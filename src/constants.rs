//! Crate-wide constants not exposed through `Config`.

/// Conservative fallback when a `@@@task` block has no `# ` title line.
pub const DEFAULT_TASK_TITLE: &str = "Untitled Task";

/// Number of trailing words used to build a Task's display slug.
pub const TITLE_SLUG_WORD_COUNT: usize = 5;

/// Verdict keyword the GATE must emit for a task to be approved. Checked
/// case-sensitively against the report text per spec.md §4.6 ("NOT
/// APPROVED" always wins over a same-report "APPROVED").
pub const VERDICT_APPROVED: &str = "APPROVED";
pub const VERDICT_NOT_APPROVED: &str = "NOT APPROVED";
