//! Text loaders for genomes plus the shared tokenizer and diagnostics.
//!
//! Both instruction-set and genome files are line based, with `#` starting a
//! comment. Errors carry 1-based line and column numbers so they can be shown
//! with [`render_diagnostic`].

use crate::hardware::errors::HardwareError;
use crate::hardware::genome::Genome;
use crate::hardware::inst_set::InstSet;
use std::fmt::Write;
use std::fs;
use std::path::Path;

/// Drops everything from the first `#` on.
pub(crate) fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    }
}

/// Whitespace separated tokens of one line with their 1-based columns.
pub(crate) fn tokens(line: &str) -> Vec<(usize, &str)> {
    let line = strip_comment(line);
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in line.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                out.push((line[..s].chars().count() + 1, &line[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((line[..s].chars().count() + 1, &line[s..]));
    }
    out
}

/// Parses a genome written as instruction names.
pub fn parse_genome(inst_set: &InstSet, source: &str) -> Result<Genome, HardwareError> {
    let mut insts = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        for (column, name) in tokens(line) {
            let inst = inst_set
                .inst(name)
                .ok_or_else(|| HardwareError::UnknownInstruction {
                    name: name.to_string(),
                    line: idx + 1,
                    offset: column,
                })?;
            insts.push(inst);
        }
    }
    if insts.is_empty() {
        return Err(HardwareError::EmptyGenome);
    }
    Ok(Genome::new(insts))
}

/// Reads and parses a genome file.
pub fn load_genome<P: AsRef<Path>>(inst_set: &InstSet, path: P) -> Result<Genome, HardwareError> {
    let source = fs::read_to_string(path)?;
    parse_genome(inst_set, &source)
}

/// Renders a compiler-style diagnostic with a caret under the offending column.
pub fn render_diagnostic(
    file: &str,
    source: &str,
    line: usize,
    offset: usize,
    message: &str,
) -> String {
    let mut diag = String::new();
    let _ = writeln!(diag, "error: {message}");
    let _ = writeln!(diag, " --> {file}:{line}:{offset}");

    if let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) {
        let line_text = raw_line.trim_end_matches('\r');
        let underline = " ".repeat(offset.saturating_sub(1));
        let _ = writeln!(diag, "  |");
        let _ = writeln!(diag, "{:>4} | {}", line, line_text);
        let _ = writeln!(diag, "  | {}^", underline);
    }

    diag
}

/// Formats `err` as a diagnostic when it points into `source`, plainly otherwise.
pub fn describe_error(file: &str, source: &str, err: &HardwareError) -> String {
    match err.location() {
        Some((line, offset)) => render_diagnostic(file, source, line, offset, &err.to_string()),
        None => format!("error: {err}"),
    }
}
