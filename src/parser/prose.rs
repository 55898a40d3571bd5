//! Prose (markdown) command files
//!
//! A prose file mixes human-readable text with optional executable content.
//! The first top-level heading names the command (falling back to the file's
//! base name), the first second-level heading or plain line describes it, and
//! the first non-empty fenced block tagged `bash`/`sh`/`shell` becomes a
//! shell-command template. Without a shell block the whole file is handed to
//! the AI orchestrator verbatim as a prompt, which is a structurally
//! different outcome than a shell dispatch.

use crate::command::{CommandAction, CommandMetadata, CommandOutcome, CommandRecord};
use crate::error::Result;
use crate::parser::data::shell_action;
use std::path::Path;
use std::sync::Arc;
use tracing::error;

const SHELL_FENCE_TAGS: &[&str] = &["bash", "sh", "shell"];

/// Maximum length of a sanitized command name
const MAX_NAME_LEN: usize = 50;

/// Sanitize free-form heading text into a command name.
///
/// The exact sequence matters for compatibility: drop non-ASCII (empty here
/// means no name), lower-case, keep only `[a-z0-9 -]`, collapse whitespace
/// runs to single hyphens, strip any non-letter prefix, collapse repeated
/// hyphens, trim edge hyphens, truncate to 50 characters.
pub fn sanitize_name(input: &str) -> Option<String> {
    let ascii: String = input.chars().filter(char::is_ascii).collect();
    if ascii.is_empty() {
        return None;
    }

    let kept: String = ascii
        .to_lowercase()
        .chars()
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | ' ' | '-'))
        .collect();

    let mut collapsed = String::with_capacity(kept.len());
    let mut in_whitespace = false;
    for c in kept.chars() {
        if c == ' ' {
            if !in_whitespace {
                collapsed.push('-');
            }
            in_whitespace = true;
        } else {
            collapsed.push(c);
            in_whitespace = false;
        }
    }

    let stripped = collapsed.trim_start_matches(|c: char| !c.is_ascii_lowercase());

    let mut deduped = String::with_capacity(stripped.len());
    let mut previous_hyphen = false;
    for c in stripped.chars() {
        if c == '-' {
            if !previous_hyphen {
                deduped.push(c);
            }
            previous_hyphen = true;
        } else {
            deduped.push(c);
            previous_hyphen = false;
        }
    }

    let name: String = deduped.trim_matches('-').chars().take(MAX_NAME_LEN).collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// What a single scan of the file yields
#[derive(Debug, Default)]
struct ProseScan {
    heading: Option<String>,
    sub_heading: Option<String>,
    first_plain_line: Option<String>,
    shell_template: Option<String>,
}

fn scan(text: &str) -> ProseScan {
    let mut result = ProseScan::default();
    let mut in_fence = false;
    let mut fence_is_shell = false;
    let mut block = String::new();

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") {
            if in_fence {
                // Closing fence: keep only the first non-empty shell block
                if fence_is_shell
                    && result.shell_template.is_none()
                    && !block.trim().is_empty()
                {
                    result.shell_template = Some(block.trim().to_string());
                }
                in_fence = false;
            } else {
                in_fence = true;
                let tag = trimmed.trim_start_matches('`').trim().to_lowercase();
                fence_is_shell = SHELL_FENCE_TAGS.contains(&tag.as_str());
                block.clear();
            }
            continue;
        }

        if in_fence {
            if fence_is_shell && result.shell_template.is_none() {
                block.push_str(line);
                block.push('\n');
            }
            continue;
        }

        if let Some(text) = trimmed.strip_prefix("## ") {
            if result.sub_heading.is_none() {
                result.sub_heading = Some(text.trim().to_string());
            }
        } else if let Some(text) = trimmed.strip_prefix("# ") {
            if result.heading.is_none() {
                result.heading = Some(text.trim().to_string());
            }
        } else if !trimmed.is_empty()
            && !trimmed.starts_with('#')
            && result.first_plain_line.is_none()
        {
            result.first_plain_line = Some(trimmed.to_string());
        }
    }

    result
}

/// Parse one markdown file into a command record.
///
/// Returns `Ok(None)` when no usable name can be derived; that is logged and
/// never escalated.
pub async fn parse_prose_file(path: &Path) -> Result<Option<CommandRecord>> {
    let text = tokio::fs::read_to_string(path).await?;
    let result = scan(&text);

    let name = result
        .heading
        .as_deref()
        .and_then(sanitize_name)
        .or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .and_then(sanitize_name)
        });
    let name = match name {
        Some(name) => name,
        None => {
            error!(
                path = %path.display(),
                "prose command has no usable name in its heading or file name; skipping"
            );
            return Ok(None);
        }
    };

    let description = result.sub_heading.or(result.first_plain_line);
    let has_shell = result.shell_template.is_some();

    let action: CommandAction = match result.shell_template {
        Some(template) => shell_action(template, None, None),
        None => prompt_action(text.trim().to_string()),
    };

    Ok(Some(CommandRecord {
        name,
        alt_name: None,
        description,
        action: Some(action),
        completion: None,
        sub_commands: Vec::new(),
        metadata: CommandMetadata {
            can_execute_shell: has_shell,
            ..CommandMetadata::default()
        },
    }))
}

/// Pass-through action: forward the file's content (plus the user's raw
/// arguments on a new paragraph) as conversational input
fn prompt_action(content: String) -> CommandAction {
    Arc::new(move |_context, raw_args| {
        let raw_args = raw_args.trim();
        let content = if raw_args.is_empty() {
            content.clone()
        } else {
            format!("{}\n\n{}", content, raw_args)
        };
        Ok(CommandOutcome::Prompt { content })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandContext;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn prose_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_sanitize_basic() {
        assert_eq!(sanitize_name("Build"), Some("build".to_string()));
        assert_eq!(sanitize_name("Hello World!"), Some("hello-world".to_string()));
        assert_eq!(sanitize_name("  Fix   Bugs  "), Some("fix-bugs".to_string()));
    }

    #[test]
    fn test_sanitize_strips_non_letter_prefix() {
        assert_eq!(sanitize_name("123 Fix Bugs"), Some("fix-bugs".to_string()));
        assert_eq!(sanitize_name("--weird"), Some("weird".to_string()));
    }

    #[test]
    fn test_sanitize_non_ascii() {
        assert_eq!(sanitize_name("模块"), None);
        // Mixed input keeps the ASCII part
        assert_eq!(sanitize_name("模块 build"), Some("build".to_string()));
    }

    #[test]
    fn test_sanitize_collapses_hyphens_and_trims() {
        assert_eq!(sanitize_name("a -- b"), Some("a-b".to_string()));
        assert_eq!(sanitize_name("run!!!"), Some("run".to_string()));
        assert_eq!(sanitize_name("!!!"), None);
    }

    #[test]
    fn test_sanitize_truncates_to_fifty() {
        let long = "a".repeat(80);
        assert_eq!(sanitize_name(&long).unwrap().len(), 50);
    }

    #[tokio::test]
    async fn test_build_command_from_heading_and_bash_block() {
        let file = prose_file("# Build\n\nCompile the project.\n\n```bash\nnpm run build\n```\n");
        let record = parse_prose_file(file.path()).await.unwrap().unwrap();

        assert_eq!(record.name, "build");
        assert_eq!(record.description.as_deref(), Some("Compile the project."));
        assert!(record.metadata.can_execute_shell);

        let outcome = record.invoke(&CommandContext::new(), "").unwrap();
        match outcome {
            CommandOutcome::ShellDispatch { command, .. } => {
                assert_eq!(command, "npm run build")
            }
            other => panic!("Expected ShellDispatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_description_prefers_second_level_heading() {
        let file = prose_file("# Deploy\n\nSome intro prose.\n\n## Push to production\n");
        let record = parse_prose_file(file.path()).await.unwrap().unwrap();
        assert_eq!(record.description.as_deref(), Some("Push to production"));
    }

    #[tokio::test]
    async fn test_first_shell_block_wins_empty_blocks_skipped() {
        let file = prose_file(
            "# Test\n\n```bash\n\n```\n\n```sh\ncargo test\n```\n\n```bash\nnever used\n```\n",
        );
        let record = parse_prose_file(file.path()).await.unwrap().unwrap();
        let outcome = record.invoke(&CommandContext::new(), "").unwrap();
        match outcome {
            CommandOutcome::ShellDispatch { command, .. } => assert_eq!(command, "cargo test"),
            other => panic!("Expected ShellDispatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_untagged_fence_is_not_a_shell_template() {
        let file = prose_file("# Review\n\n```\nnot a command\n```\n");
        let record = parse_prose_file(file.path()).await.unwrap().unwrap();
        let outcome = record.invoke(&CommandContext::new(), "").unwrap();
        assert!(matches!(outcome, CommandOutcome::Prompt { .. }));
        assert!(!record.metadata.can_execute_shell);
    }

    #[tokio::test]
    async fn test_prompt_fallback_appends_args_as_paragraph() {
        let file = prose_file("# Explain\n\nExplain the following code.\n");
        let record = parse_prose_file(file.path()).await.unwrap().unwrap();

        let outcome = record.invoke(&CommandContext::new(), "fn main() {}").unwrap();
        match outcome {
            CommandOutcome::Prompt { content } => {
                assert!(content.starts_with("# Explain"));
                assert!(content.ends_with("\n\nfn main() {}"));
            }
            other => panic!("Expected Prompt, got {:?}", other),
        }

        // No args: content passed through verbatim, trimmed
        let outcome = record.invoke(&CommandContext::new(), "").unwrap();
        match outcome {
            CommandOutcome::Prompt { content } => {
                assert_eq!(content, "# Explain\n\nExplain the following code.")
            }
            other => panic!("Expected Prompt, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_ascii_heading_falls_back_to_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rebuild.md");
        tokio::fs::write(&path, "# 模块\n\nRebuild things.\n")
            .await
            .unwrap();

        let record = parse_prose_file(&path).await.unwrap().unwrap();
        assert_eq!(record.name, "rebuild");
    }

    #[tokio::test]
    async fn test_unusable_name_everywhere_yields_no_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("模块.md");
        tokio::fs::write(&path, "# 模块\n\ncontent\n").await.unwrap();

        let record = parse_prose_file(&path).await.unwrap();
        assert!(record.is_none());
    }

    #[tokio::test]
    async fn test_heading_inside_fence_is_ignored() {
        let file = prose_file("```text\n# Not A Name\n```\n\n# Actual\n\nbody\n");
        let record = parse_prose_file(file.path()).await.unwrap().unwrap();
        assert_eq!(record.name, "actual");
    }

    #[test]
    fn test_scan_does_not_take_fence_line_as_plain_description() {
        let result = scan("# X\n\n```bash\necho hi\n```\nAfter block.\n");
        assert_eq!(result.first_plain_line.as_deref(), Some("After block."));
    }

    #[tokio::test]
    async fn test_shell_template_receives_args() {
        let file = prose_file("# Grep\n\n```sh\nrg --context 2\n```\n");
        let record = parse_prose_file(file.path()).await.unwrap().unwrap();
        let outcome = record.invoke(&CommandContext::new(), "needle").unwrap();
        match outcome {
            CommandOutcome::ShellDispatch { command, .. } => {
                assert_eq!(command, "rg --context 2 needle")
            }
            other => panic!("Expected ShellDispatch, got {:?}", other),
        }
    }

    #[test]
    fn test_sanitize_handles_pathbuf_stems() {
        // Underscores fall outside [a-z0-9 -] and are dropped
        let stem = PathBuf::from("run_all_tests.md");
        let stem = stem.file_stem().unwrap().to_str().unwrap();
        assert_eq!(sanitize_name(stem), Some("runalltests".to_string()));
    }
}
