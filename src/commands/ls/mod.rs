//! `ls`: list directory contents (spec.md's filesystem-inspection
//! group). `-S`/`-t` both need each entry's `FsStat` before sorting, so
//! the short-listing path fetches stats up front instead of only when
//! `-l` asks for them.

use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};
use crate::commands::{Command, CommandContext, CommandResult};
use crate::fs::FsStat;

pub struct LsCommand;

const HELP: &str = "Usage: ls [OPTION]... [FILE]...

List directory contents.

Options:
  -a, --all          do not ignore entries starting with .
  -A, --almost-all   do not list implied . and ..
  -l                 use a long listing format
  -h, --human-readable  with -l, print sizes in human readable format
  -r, --reverse      reverse order while sorting
  -S                 sort by file size, largest first
  -t                 sort by time, newest first
  -d, --directory    list directories themselves, not their contents
      --help         display this help and exit
";

fn format_mode(mode: u32, is_dir: bool, is_link: bool) -> String {
    let file_type = if is_link { 'l' } else if is_dir { 'd' } else { '-' };
    let perms = [0o400, 0o200, 0o100, 0o040, 0o020, 0o010, 0o004, 0o002, 0o001]
        .iter()
        .zip(['r', 'w', 'x', 'r', 'w', 'x', 'r', 'w', 'x'])
        .map(|(bit, letter)| if mode & bit != 0 { letter } else { '-' })
        .collect::<String>();
    format!("{file_type}{perms}")
}

fn format_size(size: u64, human_readable: bool) -> String {
    if !human_readable || size < 1024 {
        return size.to_string();
    }
    let (scaled, suffix) = if size < 1024 * 1024 {
        (size as f64 / 1024.0, 'K')
    } else if size < 1024 * 1024 * 1024 {
        (size as f64 / (1024.0 * 1024.0), 'M')
    } else {
        (size as f64 / (1024.0 * 1024.0 * 1024.0), 'G')
    };
    if scaled < 10.0 { format!("{scaled:.1}{suffix}") } else { format!("{}{suffix}", scaled as u64) }
}

fn format_time(mtime: SystemTime) -> String {
    let duration = mtime.duration_since(UNIX_EPOCH).unwrap_or_default();
    let secs = duration.as_secs();
    let months = ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];

    let days_since_epoch = secs / 86400;
    let year = 1970 + (days_since_epoch / 365) as i32;
    let day_of_year = days_since_epoch % 365;
    let month = (day_of_year / 30).min(11) as usize;
    let day = (day_of_year % 30) + 1;

    let time_of_day = secs % 86400;
    let hour = time_of_day / 3600;
    let minute = (time_of_day % 3600) / 60;

    let now_secs = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let six_months_ago = now_secs.saturating_sub(180 * 86400);

    if secs > six_months_ago {
        format!("{} {day:>2} {hour:02}:{minute:02}", months[month])
    } else {
        format!("{} {day:>2}  {year}", months[month])
    }
}

#[derive(Default)]
struct Options {
    show_all: bool,
    show_almost_all: bool,
    long_format: bool,
    human_readable: bool,
    reverse: bool,
    sort_by_size: bool,
    sort_by_time: bool,
    list_dir_itself: bool,
}

fn parse_args(args: &[String]) -> (Options, Vec<String>) {
    let mut opts = Options::default();
    let mut paths = Vec::new();
    for arg in args {
        match arg.as_str() {
            "-a" | "--all" => opts.show_all = true,
            "-A" | "--almost-all" => opts.show_almost_all = true,
            "-l" => opts.long_format = true,
            "-h" | "--human-readable" => opts.human_readable = true,
            "-r" | "--reverse" => opts.reverse = true,
            "-S" => opts.sort_by_size = true,
            "-t" => opts.sort_by_time = true,
            "-d" | "--directory" => opts.list_dir_itself = true,
            "-la" | "-al" => {
                opts.long_format = true;
                opts.show_all = true;
            }
            "-lh" | "-hl" => {
                opts.long_format = true;
                opts.human_readable = true;
            }
            s if !s.starts_with('-') => paths.push(s.to_string()),
            _ => {}
        }
    }
    (opts, paths)
}

fn sort_entries(entries: &mut Vec<(String, FsStat)>, opts: &Options) {
    if opts.sort_by_size {
        entries.sort_by(|a, b| b.1.size.cmp(&a.1.size).then_with(|| a.0.cmp(&b.0)));
    } else if opts.sort_by_time {
        entries.sort_by(|a, b| b.1.mtime.cmp(&a.1.mtime).then_with(|| a.0.cmp(&b.0)));
    } else {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
    }
    if opts.reverse {
        entries.reverse();
    }
}

fn render_entry(name: &str, stat: &FsStat, opts: &Options) -> String {
    if opts.long_format {
        let mode_str = format_mode(stat.mode, stat.is_directory, stat.is_symlink);
        let size_str = format_size(stat.size, opts.human_readable);
        let time_str = format_time(stat.mtime);
        format!("{mode_str} 1 user user {size_str:>5} {time_str} {name}\n")
    } else {
        format!("{name}\n")
    }
}

#[async_trait]
impl Command for LsCommand {
    fn name(&self) -> &'static str {
        "ls"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.has_flag(&["--help"]) {
            return CommandResult::success(HELP.to_string());
        }

        let (opts, mut paths) = parse_args(&ctx.args);
        if paths.is_empty() {
            paths.push(".".to_string());
        }

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;
        let show_path_header = paths.len() > 1;

        for (idx, path) in paths.iter().enumerate() {
            let full_path = ctx.fs.resolve_path(&ctx.cwd, path);

            let stat = match ctx.fs.stat(&full_path).await {
                Ok(s) => s,
                Err(_) => {
                    stderr.push_str(&format!("ls: cannot access '{path}': No such file or directory\n"));
                    exit_code = 2;
                    continue;
                }
            };

            if !stat.is_directory || opts.list_dir_itself {
                stdout.push_str(&render_entry(path, &stat, &opts));
                continue;
            }

            if show_path_header {
                if idx > 0 {
                    stdout.push('\n');
                }
                stdout.push_str(&format!("{path}:\n"));
            }

            let entries = match ctx.fs.readdir_with_file_types(&full_path).await {
                Ok(e) => e,
                Err(_) => {
                    stderr.push_str(&format!("ls: cannot open directory '{path}'\n"));
                    exit_code = 2;
                    continue;
                }
            };

            let filtered = entries.into_iter().filter(|e| {
                if opts.show_all {
                    return true;
                }
                if opts.show_almost_all {
                    return e.name != "." && e.name != "..";
                }
                !e.name.starts_with('.')
            });

            let mut with_stats: Vec<(String, FsStat)> = Vec::new();
            for entry in filtered {
                let entry_path = ctx.fs.resolve_path(&full_path, &entry.name);
                let stat = ctx.fs.stat(&entry_path).await.unwrap_or(FsStat {
                    is_file: !entry.is_directory,
                    is_directory: entry.is_directory,
                    is_symlink: entry.is_symlink,
                    mode: 0o644,
                    size: 0,
                    mtime: UNIX_EPOCH,
                    uid: 0,
                    gid: 0,
                });
                with_stats.push((entry.name, stat));
            }

            sort_entries(&mut with_stats, &opts);

            for (name, stat) in with_stats {
                stdout.push_str(&render_entry(&name, &stat, &opts));
            }
        }

        CommandResult::with_exit_code(stdout, stderr, exit_code)
    }
}
