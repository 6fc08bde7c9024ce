//! Key parsing and comparison logic for `sort` (spec.md's text-filter
//! group). `-k` key specs, `-t` field separators, and the numeric/human/
//! version/month comparison modes all live here; `mod.rs` only handles
//! argument parsing and I/O.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CompareMode {
    #[default]
    String,
    Numeric,
    HumanNumeric,
    Version,
    Month,
}

#[derive(Debug, Clone, Default)]
pub struct KeyOptions {
    pub ignore_leading_blanks: bool,
    pub dictionary_order: bool,
    pub ignore_case: bool,
    pub human_numeric: bool,
    pub month_sort: bool,
    pub numeric: bool,
    pub reverse: bool,
    pub version_sort: bool,
}

/// A key specification parsed from `-k KEYDEF`. Field/char positions are
/// 1-indexed as GNU `sort` documents them; 0 means "to the end".
#[derive(Debug, Clone)]
pub struct KeySpec {
    pub start_field: usize,
    pub start_char: usize,
    pub end_field: usize,
    pub end_char: usize,
    pub options: KeyOptions,
}

#[derive(Debug, Clone, Default)]
pub struct SortOptions {
    pub reverse: bool,
    pub numeric: bool,
    pub unique: bool,
    pub ignore_case: bool,
    pub human_numeric: bool,
    pub version_sort: bool,
    pub dictionary_order: bool,
    pub month_sort: bool,
    pub ignore_leading_blanks: bool,
    pub stable: bool,
    pub check: bool,
    pub output_file: Option<String>,
    pub keys: Vec<KeySpec>,
    pub field_separator: Option<char>,
}

/// One half of a KEYDEF position, e.g. the "2.3nr" in "2.3nr,4".
struct KeyPosition {
    field: usize,
    char_pos: usize,
    option_chars: String,
}

fn parse_key_position(s: &str) -> KeyPosition {
    let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let field = s[..digits_end].parse().unwrap_or(0);
    let rest = &s[digits_end..];

    let (char_pos, option_chars) = if let Some(rest) = rest.strip_prefix('.') {
        let char_digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        (rest[..char_digits_end].parse().unwrap_or(0), rest[char_digits_end..].to_string())
    } else {
        (0, rest.to_string())
    };

    KeyPosition { field, char_pos, option_chars }
}

fn parse_key_options(opts: &str) -> KeyOptions {
    let mut key_opts = KeyOptions::default();
    for c in opts.chars() {
        match c {
            'b' => key_opts.ignore_leading_blanks = true,
            'd' => key_opts.dictionary_order = true,
            'f' => key_opts.ignore_case = true,
            'h' => key_opts.human_numeric = true,
            'M' => key_opts.month_sort = true,
            'n' => key_opts.numeric = true,
            'r' => key_opts.reverse = true,
            'V' => key_opts.version_sort = true,
            _ => {}
        }
    }
    key_opts
}

/// Parse a KEYDEF string like "2", "2,2", "2n", "1.2,3.4nr".
pub fn parse_key_spec(keydef: &str) -> KeySpec {
    let mut parts = keydef.splitn(2, ',');
    let start = parse_key_position(parts.next().unwrap_or(""));
    let end = parts.next().map(parse_key_position);

    let combined_opts = match &end {
        Some(e) => format!("{}{}", start.option_chars, e.option_chars),
        None => start.option_chars.clone(),
    };

    KeySpec {
        start_field: start.field,
        start_char: start.char_pos,
        end_field: end.as_ref().map(|e| e.field).unwrap_or(0),
        end_char: end.as_ref().map(|e| e.char_pos).unwrap_or(0),
        options: parse_key_options(&combined_opts),
    }
}

fn split_fields<'a>(line: &'a str, separator: Option<char>) -> Vec<&'a str> {
    match separator {
        Some(sep) => line.split(sep).collect(),
        None => line.split_whitespace().collect(),
    }
}

/// Extract the key substring from `line` per `key`'s field/char range.
pub fn extract_key(line: &str, key: &KeySpec, separator: Option<char>) -> String {
    let fields = split_fields(line, separator);

    if fields.is_empty() || key.start_field == 0 {
        return line.to_string();
    }

    let start_idx = key.start_field.saturating_sub(1);
    if start_idx >= fields.len() {
        return String::new();
    }

    let end_idx = if key.end_field == 0 {
        fields.len() - 1
    } else {
        (key.end_field.saturating_sub(1)).min(fields.len() - 1)
    };

    if start_idx > end_idx {
        return String::new();
    }

    if key.start_char == 0 && key.end_char == 0 {
        return fields[start_idx..=end_idx].join(" ");
    }

    let mut result = String::new();
    for (i, &field) in fields[start_idx..=end_idx].iter().enumerate() {
        let actual_idx = start_idx + i;
        let start_c = if actual_idx == start_idx && key.start_char > 0 {
            (key.start_char - 1).min(field.len())
        } else {
            0
        };
        let end_c = if actual_idx == end_idx && key.end_char > 0 {
            key.end_char.min(field.len())
        } else {
            field.len()
        };

        if start_c < end_c {
            if !result.is_empty() {
                result.push(' ');
            }
            result.push_str(&field[start_c..end_c]);
        }
    }

    result
}

fn effective_mode(key_opts: &KeyOptions, global: &SortOptions) -> CompareMode {
    if key_opts.numeric || global.numeric {
        CompareMode::Numeric
    } else if key_opts.human_numeric || global.human_numeric {
        CompareMode::HumanNumeric
    } else if key_opts.version_sort || global.version_sort {
        CompareMode::Version
    } else if key_opts.month_sort || global.month_sort {
        CompareMode::Month
    } else {
        CompareMode::String
    }
}

fn month_number(s: &str) -> u32 {
    let trimmed = s.trim().to_uppercase();
    let prefix = if trimmed.len() >= 3 { &trimmed[..3] } else { &trimmed };
    match prefix {
        "JAN" => 1, "FEB" => 2, "MAR" => 3, "APR" => 4, "MAY" => 5, "JUN" => 6,
        "JUL" => 7, "AUG" => 8, "SEP" => 9, "OCT" => 10, "NOV" => 11, "DEC" => 12,
        _ => 0,
    }
}

pub fn compare_months(a: &str, b: &str) -> Ordering {
    month_number(a).cmp(&month_number(b))
}

fn parse_human_size(s: &str) -> f64 {
    let trimmed = s.trim();
    let Some(last) = trimmed.chars().last() else { return 0.0 };
    let multiplier = match last.to_ascii_uppercase() {
        'K' => 1024.0,
        'M' => 1024.0_f64.powi(2),
        'G' => 1024.0_f64.powi(3),
        'T' => 1024.0_f64.powi(4),
        _ => return trimmed.parse().unwrap_or(0.0),
    };
    trimmed[..trimmed.len() - 1].parse::<f64>().unwrap_or(0.0) * multiplier
}

pub fn compare_human_sizes(a: &str, b: &str) -> Ordering {
    parse_human_size(a).partial_cmp(&parse_human_size(b)).unwrap_or(Ordering::Equal)
}

#[derive(Debug, PartialEq)]
enum VersionPart {
    Num(u64),
    Str(String),
}

fn split_version(s: &str) -> Vec<VersionPart> {
    let mut parts = Vec::new();
    let mut chars = s.chars().peekable();
    while chars.peek().is_some() {
        let is_digit_run = chars.peek().is_some_and(char::is_ascii_digit);
        let run: String = if is_digit_run {
            std::iter::from_fn(|| chars.by_ref().next_if(char::is_ascii_digit)).collect()
        } else {
            std::iter::from_fn(|| chars.by_ref().next_if(|c| !c.is_ascii_digit())).collect()
        };
        parts.push(if is_digit_run { VersionPart::Num(run.parse().unwrap_or(0)) } else { VersionPart::Str(run) });
    }
    parts
}

pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parts_a = split_version(a);
    let parts_b = split_version(b);

    for (pa, pb) in parts_a.iter().zip(parts_b.iter()) {
        let ord = match (pa, pb) {
            (VersionPart::Num(na), VersionPart::Num(nb)) => na.cmp(nb),
            (VersionPart::Str(sa), VersionPart::Str(sb)) => sa.cmp(sb),
            (VersionPart::Num(_), VersionPart::Str(_)) => Ordering::Less,
            (VersionPart::Str(_), VersionPart::Num(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    parts_a.len().cmp(&parts_b.len())
}

fn dictionary_filter(s: &str) -> String {
    s.chars().filter(|c| c.is_alphanumeric() || c.is_whitespace()).collect()
}

pub fn compare_values(a: &str, b: &str, mode: CompareMode, ignore_case: bool, dict_order: bool) -> Ordering {
    let a_val = if dict_order { dictionary_filter(a) } else { a.to_string() };
    let b_val = if dict_order { dictionary_filter(b) } else { b.to_string() };

    match mode {
        CompareMode::String if ignore_case => a_val.to_lowercase().cmp(&b_val.to_lowercase()),
        CompareMode::String => a_val.cmp(&b_val),
        CompareMode::Numeric => {
            let na = a_val.trim().parse::<f64>().unwrap_or(0.0);
            let nb = b_val.trim().parse::<f64>().unwrap_or(0.0);
            na.partial_cmp(&nb).unwrap_or(Ordering::Equal)
        }
        CompareMode::HumanNumeric => compare_human_sizes(&a_val, &b_val),
        CompareMode::Version => compare_versions(&a_val, &b_val),
        CompareMode::Month => compare_months(&a_val, &b_val),
    }
}

/// Build the line comparator GNU `sort` uses: per-key comparisons in
/// order, falling back to the whole line unless `-s/--stable` is set.
pub fn create_comparator(opts: &SortOptions) -> Box<dyn Fn(&str, &str) -> Ordering + '_> {
    Box::new(move |a: &str, b: &str| {
        if opts.keys.is_empty() {
            let mode = effective_mode(&KeyOptions::default(), opts);
            let mut ord = compare_values(a, b, mode, opts.ignore_case, opts.dictionary_order);
            if opts.reverse {
                ord = ord.reverse();
            }
            return ord;
        }

        for key in &opts.keys {
            let key_a = extract_key(a, key, opts.field_separator);
            let key_b = extract_key(b, key, opts.field_separator);

            let mode = effective_mode(&key.options, opts);
            let ignore_case = key.options.ignore_case || opts.ignore_case;
            let dict = key.options.dictionary_order || opts.dictionary_order;

            let mut ord = compare_values(&key_a, &key_b, mode, ignore_case, dict);
            if key.options.reverse ^ opts.reverse {
                ord = ord.reverse();
            }
            if ord != Ordering::Equal {
                return ord;
            }
        }

        if opts.stable { Ordering::Equal } else { a.cmp(b) }
    })
}
