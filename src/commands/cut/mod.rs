//! `cut`: select a subset of each line's characters or fields (spec.md's
//! text-filter group). `-c`/`-f` both resolve through the same LIST
//! grammar (`RangeSpec` + `expand_indices`); only the unit they slice
//! (chars vs. delimiter-separated fields) differs.

use async_trait::async_trait;
use crate::commands::{Command, CommandContext, CommandResult};

pub struct CutCommand;

const HELP: &str = "Usage: cut OPTION... [FILE]...

Print selected parts of lines from each FILE to standard output.

Options:
  -c LIST    select only these characters
  -f LIST    select only these fields
  -d DELIM   use DELIM instead of TAB for field delimiter
  --complement  select the complement of the chosen set
  -s, --only-delimited  do not print lines not containing delimiters
      --help display this help and exit
";

#[derive(Debug, Clone)]
enum RangeSpec {
    Single(usize),
    Range(usize, usize),
    FromStart(usize),
    ToEnd(usize),
}

fn parse_list(list: &str) -> Result<Vec<RangeSpec>, String> {
    let mut specs = Vec::new();
    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let spec = match part.find('-') {
            Some(idx) => {
                let (left, right) = (&part[..idx], &part[idx + 1..]);
                match (left.is_empty(), right.is_empty()) {
                    (true, true) => return Err("cut: invalid range with no endpoint: -".to_string()),
                    (true, false) => RangeSpec::FromStart(parse_positive(right, part)?),
                    (false, true) => RangeSpec::ToEnd(parse_positive(left, part)?),
                    (false, false) => RangeSpec::Range(parse_positive(left, part)?, parse_positive(right, part)?),
                }
            }
            None => RangeSpec::Single(parse_positive(part, part)?),
        };
        specs.push(spec);
    }
    if specs.is_empty() {
        return Err("cut: invalid list argument".to_string());
    }
    Ok(specs)
}

fn parse_positive(text: &str, whole: &str) -> Result<usize, String> {
    let n: usize = text.parse().map_err(|_| format!("cut: invalid range: {whole}"))?;
    if n == 0 {
        return Err("cut: fields and positions are numbered from 1".to_string());
    }
    Ok(n)
}

fn expand_indices(specs: &[RangeSpec], max: usize, complement: bool) -> Vec<usize> {
    let mut indices = Vec::new();
    for spec in specs {
        match *spec {
            RangeSpec::Single(n) => {
                if n <= max {
                    indices.push(n);
                }
            }
            RangeSpec::Range(n, m) => indices.extend(n..=m.min(max)),
            RangeSpec::FromStart(m) => indices.extend(1..=m.min(max)),
            RangeSpec::ToEnd(n) => indices.extend(n..=max),
        }
    }
    indices.sort_unstable();
    indices.dedup();
    if complement {
        (1..=max).filter(|i| !indices.contains(i)).collect()
    } else {
        indices
    }
}

#[derive(Default)]
struct Options {
    char_list: Option<String>,
    field_list: Option<String>,
    delimiter: Option<String>,
    complement: bool,
    only_delimited: bool,
}

fn parse_args(args: &[String]) -> Result<(Options, Vec<String>), String> {
    let mut opts = Options::default();
    let mut files = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "-s" | "--only-delimited" => opts.only_delimited = true,
            "--complement" => opts.complement = true,
            "-c" | "-f" | "-d" => {
                let label = arg.chars().nth(1).unwrap();
                i += 1;
                let value = args.get(i).ok_or_else(|| format!("cut: option requires an argument -- '{label}'\n"))?.clone();
                match label {
                    'c' => opts.char_list = Some(value),
                    'f' => opts.field_list = Some(value),
                    _ => opts.delimiter = Some(value),
                }
            }
            s if s.starts_with("-c") && s.len() > 2 => opts.char_list = Some(s[2..].to_string()),
            s if s.starts_with("-f") && s.len() > 2 => opts.field_list = Some(s[2..].to_string()),
            s if s.starts_with("-d") && s.len() > 2 => opts.delimiter = Some(s[2..].to_string()),
            s if !s.starts_with('-') || s == "-" => files.push(s.to_string()),
            _ => {}
        }
        i += 1;
    }
    Ok((opts, files))
}

#[async_trait]
impl Command for CutCommand {
    fn name(&self) -> &'static str {
        "cut"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }

        let (opts, files) = match parse_args(&ctx.args) {
            Ok(v) => v,
            Err(e) => return CommandResult::error(e),
        };

        if opts.char_list.is_none() && opts.field_list.is_none() {
            return CommandResult::error("cut: you must specify a list of bytes, characters, or fields\n".to_string());
        }

        let delim = opts.delimiter.unwrap_or_else(|| "\t".to_string());
        let delim_char = delim.chars().next().unwrap_or('\t');

        let input = if files.is_empty() || (files.len() == 1 && files[0] == "-") {
            ctx.stdin.clone()
        } else {
            let path = ctx.fs.resolve_path(&ctx.cwd, &files[0]);
            match ctx.fs.read_file(&path).await {
                Ok(c) => c,
                Err(_) => return CommandResult::error(format!("cut: {}: No such file or directory\n", files[0])),
            }
        };

        if input.is_empty() {
            return CommandResult::success(String::new());
        }

        let lines: Vec<&str> = input.lines().collect();
        let mut output = String::new();

        if let Some(clist) = &opts.char_list {
            let specs = match parse_list(clist) {
                Ok(s) => s,
                Err(e) => return CommandResult::error(format!("{e}\n")),
            };
            for line in &lines {
                let chars: Vec<char> = line.chars().collect();
                let indices = expand_indices(&specs, chars.len(), opts.complement);
                output.extend(indices.iter().filter_map(|&i| chars.get(i - 1)));
                output.push('\n');
            }
        } else if let Some(flist) = &opts.field_list {
            let specs = match parse_list(flist) {
                Ok(s) => s,
                Err(e) => return CommandResult::error(format!("{e}\n")),
            };
            for line in &lines {
                if !line.contains(delim_char) {
                    if !opts.only_delimited {
                        output.push_str(line);
                        output.push('\n');
                    }
                    continue;
                }
                let fields: Vec<&str> = line.split(delim_char).collect();
                let indices = expand_indices(&specs, fields.len(), opts.complement);
                let selected: Vec<&str> = indices.iter().filter_map(|&i| fields.get(i - 1).copied()).collect();
                output.push_str(&selected.join(&delim_char.to_string()));
                output.push('\n');
            }
        }

        CommandResult::success(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::types::FileSystem;
    use crate::fs::InMemoryFs;
    use std::collections::HashMap;
    use std::sync::Arc;

    async fn ctx(args: Vec<&str>, stdin: &str, files: Vec<(&str, &str)>) -> CommandContext {
        let fs = Arc::new(InMemoryFs::new());
        for (path, content) in files {
            fs.write_file(path, content.as_bytes()).await.unwrap();
        }
        CommandContext { args: args.into_iter().map(String::from).collect(), stdin: stdin.to_string(), cwd: "/".to_string(), env: HashMap::new(), fs, exec_fn: None, fetch_fn: None }
    }

    #[tokio::test]
    async fn first_colon_field_is_selected() {
        let c = ctx(vec!["-d:", "-f1"], "root:x:0:0\nuser:x:1000:1000\n", vec![]).await;
        let result = CutCommand.execute(c).await;
        assert_eq!(result.stdout, "root\nuser\n");
    }

    #[tokio::test]
    async fn a_comma_separated_field_list_selects_each_one() {
        let c = ctx(vec!["-d:", "-f1,3"], "a:b:c:d\n1:2:3:4\n", vec![]).await;
        let result = CutCommand.execute(c).await;
        assert_eq!(result.stdout, "a:c\n1:3\n");
    }

    #[tokio::test]
    async fn a_field_range_selects_consecutive_fields() {
        let c = ctx(vec!["-d:", "-f2-4"], "a:b:c:d:e\n", vec![]).await;
        let result = CutCommand.execute(c).await;
        assert_eq!(result.stdout, "b:c:d\n");
    }

    #[tokio::test]
    async fn the_delimiter_can_be_any_character() {
        let c = ctx(vec!["-d,", "-f2"], "name,age,city\njohn,30,nyc\n", vec![]).await;
        let result = CutCommand.execute(c).await;
        assert_eq!(result.stdout, "age\n30\n");
    }

    #[tokio::test]
    async fn the_default_delimiter_is_a_tab() {
        let c = ctx(vec!["-f1"], "a\tb\tc\n1\t2\t3\n", vec![]).await;
        let result = CutCommand.execute(c).await;
        assert_eq!(result.stdout, "a\n1\n");
    }

    #[tokio::test]
    async fn a_character_range_selects_consecutive_characters() {
        let c = ctx(vec!["-c1-5"], "hello world\n", vec![]).await;
        let result = CutCommand.execute(c).await;
        assert_eq!(result.stdout, "hello\n");
    }

    #[tokio::test]
    async fn scattered_character_positions_are_concatenated() {
        let c = ctx(vec!["-c1,3,5"], "abcdefg\n", vec![]).await;
        let result = CutCommand.execute(c).await;
        assert_eq!(result.stdout, "ace\n");
    }

    #[tokio::test]
    async fn an_open_ended_range_runs_to_the_last_field() {
        let c = ctx(vec!["-d:", "-f3-"], "a:b:c:d:e\n", vec![]).await;
        let result = CutCommand.execute(c).await;
        assert_eq!(result.stdout, "c:d:e\n");
    }

    #[tokio::test]
    async fn a_missing_file_is_an_error() {
        let c = ctx(vec!["-d:", "-f1", "/nonexistent.txt"], "", vec![]).await;
        let result = CutCommand.execute(c).await;
        assert_ne!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn omitting_both_c_and_f_is_an_error() {
        let c = ctx(vec![], "hello\n", vec![]).await;
        let result = CutCommand.execute(c).await;
        assert_ne!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn only_delimited_drops_lines_without_the_delimiter() {
        let c = ctx(vec!["-d:", "-f1", "-s"], "a:b\nno-delim\nc:d\n", vec![]).await;
        let result = CutCommand.execute(c).await;
        assert_eq!(result.stdout, "a\nc\n");
    }

    #[tokio::test]
    async fn complement_selects_everything_not_named_by_the_list() {
        let c = ctx(vec!["-d:", "-f2", "--complement"], "a:b:c:d\n", vec![]).await;
        let result = CutCommand.execute(c).await;
        assert_eq!(result.stdout, "a:c:d\n");
    }
}
