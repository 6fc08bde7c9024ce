//! Pipeline runner: splits a command string on unquoted `|`, preprocesses
//! a trailing `< file` redirect into a literal stdin read, and dispatches
//! each segment left-to-right with short-circuit on non-zero exit, per
//! spec.md §4.5.

use regex_lite::Regex;

use crate::auth::AuthContext;
use crate::dispatcher::Dispatcher;
use crate::lexer::split_pipeline;
use crate::result::BashResult;

fn redirect_pattern() -> Regex {
    Regex::new(r"^(.+?)\s*<\s*(\S+)\s*$").unwrap()
}

/// Rewrites `cmd < file` into `(cmd, Some(file))`, leaving anything else
/// untouched. Only applies to the whole segment, not the command text
/// after shell-level redirect parsing inside the segment itself.
fn strip_input_redirect(segment: &str) -> (String, Option<String>) {
    let pattern = redirect_pattern();
    match pattern.captures(segment) {
        Some(caps) => (caps.get(1).unwrap().as_str().to_string(), Some(caps.get(2).unwrap().as_str().to_string())),
        None => (segment.to_string(), None),
    }
}

impl Dispatcher {
    /// Runs a (possibly single-segment) pipeline, feeding each segment's
    /// stdout forward as the next segment's stdin. Stops at the first
    /// stage to return a non-zero exit code.
    pub(crate) async fn run_pipeline(&self, command_text: &str, external_stdin: String, ctx: &AuthContext) -> BashResult {
        let segments = split_pipeline(command_text);
        if segments.is_empty() {
            return self.dispatch_segment("", external_stdin, ctx).await;
        }

        let mut stdin = external_stdin;
        let mut last = BashResult::success(String::new());

        for segment in &segments {
            let trimmed = segment.trim();
            let (command, redirect_file) = strip_input_redirect(trimmed);

            let (dispatched_command, stage_stdin) = match redirect_file {
                Some(path) if self.fs_is_bound() => match self.read_redirect_source(&path).await {
                    Ok(content) => (command, content),
                    Err(message) => return BashResult::failure(message, 1),
                },
                // No filesystem capability bound: leave the segment text
                // untouched and let the AST parser's own redirect handling
                // (silently unconsumed by the native kernel) take it instead.
                _ => (trimmed.to_string(), stdin.clone()),
            };

            last = self.dispatch_segment(&dispatched_command, stage_stdin, ctx).await;
            if last.exit_code != 0 {
                return last;
            }
            stdin = last.stdout.clone();
        }

        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_input_redirect() {
        let (command, file) = strip_input_redirect("cat < /tmp/in.txt");
        assert_eq!(command, "cat");
        assert_eq!(file, Some("/tmp/in.txt".to_string()));
    }

    #[test]
    fn leaves_non_redirect_segments_untouched() {
        let (command, file) = strip_input_redirect("sort -r");
        assert_eq!(command, "sort -r");
        assert_eq!(file, None);
    }
}
