//! Header parser: builds the symbol table from the declaration section
//!
//! Consumes tokens up to `$enddefinitions`. Scope nesting is tracked with an
//! explicit stack, so arbitrarily deep hierarchies cost no call-stack depth.
//! Any problem in this phase is fatal: a dump whose declarations cannot be
//! trusted cannot be profiled.

use crate::formats::{Token, VcdLexer};
use crate::signals::table::{ScopeId, SignalKind, SignalTable};
use crate::types::{Metadata, ProfilerError, Result, TimeUnit};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::io::BufRead;

/// Parsed declaration section
#[derive(Debug)]
pub(crate) struct Header {
    pub table: SignalTable,
    pub metadata: Metadata,
}

fn structural(message: String, line: usize) -> ProfilerError {
    ProfilerError::Structural {
        message,
        line,
        near_time: 0,
    }
}

/// Parse everything up to and including `$enddefinitions $end`
///
/// On return the lexer is positioned at the first body token.
pub(crate) fn parse_header<R: BufRead>(lexer: &mut VcdLexer<R>) -> Result<Header> {
    let mut table = SignalTable::new();
    let mut metadata = Metadata::default();
    let mut stack: Vec<ScopeId> = Vec::new();
    let mut in_declarations = false;

    loop {
        let token = match lexer.next_token() {
            Some(Ok(token)) => token,
            Some(Err(e)) => return Err(structural(e.message, e.line)),
            None => {
                return Err(structural(
                    "end of file before $enddefinitions".to_string(),
                    lexer.line(),
                ))
            }
        };

        match token {
            Token::Date(text) => metadata.date = parse_date(&text),
            Token::Version(text) => metadata.version = Some(text),
            Token::Timescale(text) => {
                let line = lexer.line();
                metadata.timescale = Some(parse_timescale(&text).map_err(|m| structural(m, line))?)
            }
            Token::Comment(_) => {}
            Token::ScopeBegin { kind, name } => {
                if !in_declarations {
                    log::debug!("Entering declaration section at line {}", lexer.line());
                    in_declarations = true;
                }
                let parent = stack.last().copied();
                let id = table.add_scope(name, kind, parent);
                stack.push(id);
            }
            Token::ScopeEnd => {
                if stack.pop().is_none() {
                    return Err(structural(
                        "$upscope without matching $scope".to_string(),
                        lexer.line(),
                    ));
                }
            }
            Token::Var {
                var_type,
                width,
                code,
                name,
            } => {
                if !in_declarations {
                    log::debug!("Entering declaration section at line {}", lexer.line());
                    in_declarations = true;
                }
                if width == 0 {
                    return Err(structural(
                        format!("signal `{}` declared with width 0", name),
                        lexer.line(),
                    ));
                }
                // anonymous scopes are transparent in the dotted path
                let path: Vec<String> = stack
                    .iter()
                    .map(|&sid| table.scope(sid).name.clone())
                    .filter(|n| !n.is_empty())
                    .collect();
                match table.signal_by_code(&code) {
                    Some(existing) => {
                        let declared = table.signal(existing).width;
                        if declared != width {
                            return Err(structural(
                                format!(
                                    "duplicate identifier code `{}`: redeclared with width {} \
                                     (previously {})",
                                    code, width, declared
                                ),
                                lexer.line(),
                            ));
                        }
                        // same code, same width: a VCD alias for one net
                        table.add_alias(name, &path, existing);
                    }
                    None => {
                        let kind = signal_kind(&var_type);
                        table.add_signal(
                            code,
                            name,
                            path,
                            width,
                            kind,
                            var_type,
                            stack.last().copied(),
                        );
                    }
                }
            }
            Token::EndDefinitions => break,
            Token::DumpDirective(_)
            | Token::Timestamp(_)
            | Token::Scalar { .. }
            | Token::Vector { .. }
            | Token::Real { .. } => {
                return Err(structural(
                    "value change before $enddefinitions".to_string(),
                    lexer.line(),
                ));
            }
        }
    }

    if !stack.is_empty() {
        log::warn!(
            "{} scope(s) still open at $enddefinitions",
            stack.len()
        );
    }

    let stats = table.stats();
    log::info!(
        "Declared {} signals in {} scopes (widest {} bits)",
        stats.num_signals,
        stats.num_scopes,
        stats.max_width
    );

    Ok(Header { table, metadata })
}

fn signal_kind(var_type: &str) -> SignalKind {
    match var_type {
        "real" | "realtime" | "shortreal" => SignalKind::Real,
        _ => SignalKind::BitVector,
    }
}

/// `$date` bodies are free text; most simulators write asctime. Unparseable
/// dates are tolerated, the field is informational.
fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    const FORMATS: [&str; 2] = ["%a %b %e %H:%M:%S %Y", "%a %b %d %H:%M:%S %Y"];
    for format in FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    log::debug!("Unparseable $date `{}`", text);
    None
}

fn parse_timescale(text: &str) -> std::result::Result<(u32, TimeUnit), String> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let digits: String = compact.chars().take_while(|c| c.is_ascii_digit()).collect();
    let unit = &compact[digits.len()..];

    let magnitude: u32 = digits
        .parse()
        .map_err(|_| format!("$timescale `{}` has no magnitude", text))?;
    let unit = match unit {
        "fs" => TimeUnit::Fs,
        "ps" => TimeUnit::Ps,
        "ns" => TimeUnit::Ns,
        "us" => TimeUnit::Us,
        "ms" => TimeUnit::Ms,
        "s" => TimeUnit::S,
        other => return Err(format!("$timescale unit `{}` is not recognized", other)),
    };
    Ok((magnitude, unit))
}
