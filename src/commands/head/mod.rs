//! `head`: print the leading lines (or bytes) of each file, falling back
//! to stdin when no files are given. Argument parsing and the multi-file
//! `==>` header convention live in `utils::head_tail`, shared with `tail`.

use async_trait::async_trait;
use crate::commands::utils::{get_head, process_head_tail_files, parse_head_tail_args, HeadTailParseResult};
use crate::commands::{Command, CommandContext, CommandResult};

pub struct HeadCommand;

const HELP: &str = "Usage: head [OPTION]... [FILE]...

Print the first 10 lines of each FILE to standard output.
With more than one FILE, precede each with a header giving its name.

Options:
  -c, --bytes=NUM    print the first NUM bytes of each file
  -n, --lines=NUM    print the first NUM lines instead of the first 10
  -q, --quiet        never print headers giving file names
  -v, --verbose      always print headers giving file names
      --help         display this help and exit
";

#[async_trait]
impl Command for HeadCommand {
    fn name(&self) -> &'static str {
        "head"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }

        let opts = match parse_head_tail_args(&ctx.args, "head") {
            HeadTailParseResult::Ok(opts) => opts,
            HeadTailParseResult::Err(result) => return result,
        };

        process_head_tail_files(&ctx, &opts, "head", |content| get_head(content, opts.lines, opts.bytes)).await
    }
}
