//! VCD (Value Change Dump) lexer
//!
//! Streams a VCD file as a lazy, forward-only sequence of tokens: header
//! commands, `$var` declarations, `#<time>` markers and value-change
//! records. The lexer never loads the file into memory; it keeps at most a
//! handful of whitespace-split words buffered.
//!
//! Error policy is split between the lexer and its consumer: the lexer
//! reports every malformed record as an `Err` item and keeps going. Whether
//! that is fatal (header phase) or merely counted (body phase) is the
//! consumer's call.

use crate::types::Timestamp;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

/// One token from a VCD stream
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `$date ... $end`, body joined with single spaces
    Date(String),
    /// `$version ... $end`
    Version(String),
    /// `$timescale ... $end`, e.g. `1ns` or `10 ps`
    Timescale(String),
    /// `$comment ... $end`
    Comment(String),
    /// `$scope <kind> <name> $end`; `name` is empty for anonymous scopes
    ScopeBegin { kind: String, name: String },
    /// `$upscope $end`
    ScopeEnd,
    /// `$var <type> <width> <code> <name> $end`
    Var {
        var_type: String,
        width: u32,
        code: String,
        name: String,
    },
    /// `$enddefinitions $end`
    EndDefinitions,
    /// `$dumpvars` / `$dumpall` / `$dumpon` / `$dumpoff`; the value entries
    /// that follow stream as ordinary value tokens
    DumpDirective(String),
    /// `#<ticks>` timestamp marker
    Timestamp(Timestamp),
    /// Scalar value change, e.g. `1!`
    Scalar { bit: char, code: String },
    /// Vector value change, e.g. `b1010 !`
    Vector { bits: String, code: String },
    /// Real value change, e.g. `r3.14 !`
    Real { literal: String, code: String },
}

/// Problem found while tokenizing one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// 1-based line in the dump
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Streaming VCD tokenizer
///
/// Words are read line by line, split on ASCII whitespace, and assembled
/// into tokens. Commands may span lines until their `$end`.
pub struct VcdLexer<R: BufRead> {
    reader: R,
    words: VecDeque<(String, usize)>,
    lines_read: usize,
    token_line: usize,
    eof: bool,
}

impl VcdLexer<io::BufReader<File>> {
    /// Open a VCD file for tokenizing
    pub fn open(path: &Path) -> io::Result<Self> {
        log::info!("Opening VCD dump: {:?}", path);
        let file = File::open(path)?;
        Ok(Self::new(io::BufReader::new(file)))
    }
}

impl<R: BufRead> VcdLexer<R> {
    /// Wrap any buffered reader (tests use an in-memory cursor)
    pub fn new(reader: R) -> Self {
        VcdLexer {
            reader,
            words: VecDeque::new(),
            lines_read: 0,
            token_line: 0,
            eof: false,
        }
    }

    /// Line of the most recently returned token or error
    pub fn line(&self) -> usize {
        self.token_line
    }

    fn next_word(&mut self) -> io::Result<Option<(String, usize)>> {
        while self.words.is_empty() && !self.eof {
            let mut buf = String::new();
            let bytes = self.reader.read_line(&mut buf)?;
            if bytes == 0 {
                self.eof = true;
                break;
            }
            self.lines_read += 1;
            for word in buf.split_ascii_whitespace() {
                self.words.push_back((word.to_string(), self.lines_read));
            }
        }
        Ok(self.words.pop_front())
    }

    /// Collect words up to the matching `$end`, joined with single spaces
    fn text_until_end(&mut self, command: &str) -> Result<String, SyntaxError> {
        let mut parts: Vec<String> = Vec::new();
        loop {
            match self.next_word().map_err(|e| self.io_error(e))? {
                Some((word, _)) if word == "$end" => return Ok(parts.join(" ")),
                Some((word, _)) => parts.push(word),
                None => {
                    return Err(SyntaxError {
                        line: self.token_line,
                        message: format!("`{}` not terminated by $end", command),
                    })
                }
            }
        }
    }

    /// Consume exactly one `$end`
    fn expect_end(&mut self, command: &str) -> Result<(), SyntaxError> {
        match self.next_word().map_err(|e| self.io_error(e))? {
            Some((word, _)) if word == "$end" => Ok(()),
            Some((word, line)) => Err(SyntaxError {
                line,
                message: format!("expected $end after `{}`, found `{}`", command, word),
            }),
            None => Err(SyntaxError {
                line: self.token_line,
                message: format!("expected $end after `{}`, found end of file", command),
            }),
        }
    }

    fn io_error(&self, err: io::Error) -> SyntaxError {
        SyntaxError {
            line: self.lines_read,
            message: format!("read failed: {}", err),
        }
    }

    fn lex_command(&mut self, word: &str) -> Result<Option<Token>, SyntaxError> {
        match word {
            "$date" => Ok(Some(Token::Date(self.text_until_end(word)?))),
            "$version" => Ok(Some(Token::Version(self.text_until_end(word)?))),
            "$timescale" => Ok(Some(Token::Timescale(self.text_until_end(word)?))),
            "$comment" => Ok(Some(Token::Comment(self.text_until_end(word)?))),
            "$scope" => {
                let (kind, _) = self.require_word(word)?;
                let (next, _) = self.require_word(word)?;
                // scopes without names occur in the wild; tolerate them
                if next == "$end" {
                    return Ok(Some(Token::ScopeBegin {
                        kind,
                        name: String::new(),
                    }));
                }
                self.expect_end(word)?;
                Ok(Some(Token::ScopeBegin { kind, name: next }))
            }
            "$upscope" => {
                self.expect_end(word)?;
                Ok(Some(Token::ScopeEnd))
            }
            "$var" => {
                let (var_type, _) = self.require_word(word)?;
                let (width_word, width_line) = self.require_word(word)?;
                let width: u32 = width_word.parse().map_err(|_| SyntaxError {
                    line: width_line,
                    message: format!("`$var` width `{}` is not a number", width_word),
                })?;
                let (code, _) = self.require_word(word)?;
                // the name may span several words; a trailing `[msb:lsb]`
                // bit-select belongs to the declaration, not the name
                let mut name_parts: Vec<String> = Vec::new();
                loop {
                    match self.require_word(word)? {
                        (w, _) if w == "$end" => break,
                        (w, _) if w.starts_with('[') => {}
                        (w, _) => name_parts.push(w),
                    }
                }
                Ok(Some(Token::Var {
                    var_type,
                    width,
                    code,
                    name: name_parts.join(" "),
                }))
            }
            "$enddefinitions" => {
                self.expect_end(word)?;
                Ok(Some(Token::EndDefinitions))
            }
            "$dumpvars" | "$dumpall" | "$dumpon" | "$dumpoff" => {
                Ok(Some(Token::DumpDirective(word.to_string())))
            }
            // closes an earlier dump directive; not a token of its own
            "$end" => Ok(None),
            other => {
                // unrecognized commands are skimmed to their $end
                log::debug!("Skipping unrecognized command `{}`", other);
                self.text_until_end(other)?;
                Ok(None)
            }
        }
    }

    fn require_word(&mut self, command: &str) -> Result<(String, usize), SyntaxError> {
        match self.next_word().map_err(|e| self.io_error(e))? {
            Some(pair) => Ok(pair),
            None => Err(SyntaxError {
                line: self.token_line,
                message: format!("`{}` truncated by end of file", command),
            }),
        }
    }

    /// Next token, or `None` at end of input
    ///
    /// An `Err` item covers exactly one malformed record; lexing continues
    /// with the following word.
    pub fn next_token(&mut self) -> Option<Result<Token, SyntaxError>> {
        loop {
            let (word, line) = match self.next_word() {
                Ok(Some(pair)) => pair,
                Ok(None) => return None,
                Err(e) => return Some(Err(self.io_error(e))),
            };
            self.token_line = line;

            if let Some(stripped) = word.strip_prefix('#') {
                return Some(stripped.parse::<Timestamp>().map(Token::Timestamp).map_err(
                    |_| SyntaxError {
                        line,
                        message: format!("timestamp `{}` is not a number", word),
                    },
                ));
            }

            if word.starts_with('$') {
                match self.lex_command(&word) {
                    Ok(Some(token)) => return Some(Ok(token)),
                    Ok(None) => continue,
                    Err(e) => return Some(Err(e)),
                }
            }

            let mut chars = word.chars();
            let head = match chars.next() {
                Some(c) => c,
                None => continue,
            };
            let rest: String = chars.collect();
            match head {
                '0' | '1' | 'x' | 'X' | 'z' | 'Z' => {
                    if rest.is_empty() {
                        return Some(Err(SyntaxError {
                            line,
                            message: format!("scalar change `{}` has no identifier code", word),
                        }));
                    }
                    return Some(Ok(Token::Scalar {
                        bit: head,
                        code: rest,
                    }));
                }
                'b' | 'B' | 'r' | 'R' => {
                    if rest.is_empty() {
                        return Some(Err(SyntaxError {
                            line,
                            message: format!("value change `{}` has no digits", word),
                        }));
                    }
                    let code = match self.next_word() {
                        Ok(Some((code, _))) => code,
                        Ok(None) => {
                            return Some(Err(SyntaxError {
                                line,
                                message: format!(
                                    "value change `{}` has no identifier code",
                                    word
                                ),
                            }))
                        }
                        Err(e) => return Some(Err(self.io_error(e))),
                    };
                    let token = if head == 'b' || head == 'B' {
                        Token::Vector { bits: rest, code }
                    } else {
                        Token::Real {
                            literal: rest,
                            code,
                        }
                    };
                    return Some(Ok(token));
                }
                _ => {
                    return Some(Err(SyntaxError {
                        line,
                        message: format!("unrecognized record `{}`", word),
                    }));
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for VcdLexer<R> {
    type Item = Result<Token, SyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}
