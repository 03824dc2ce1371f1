//! Canonical layout of serialized s-expression text.
//!
//! [`prettify`] works on characters, not on a parsed tree: whatever a writer
//! produced, single-line or already indented, is re-laid out so that two files
//! holding the same data differ in no whitespace. Running it twice gives the
//! same text as running it once.
//!
//! Layout rules, all measured in characters:
//!
//! - a list starts on a new line indented by its depth, except the first
//!   character of the document and the special cases below;
//! - a list closes on the line of its last child unless it contains a nested
//!   list or was wrapped, in which case the paren gets a line of its own;
//! - whitespace between tokens collapses to one space, and becomes a line break
//!   once the line reaches the wrap threshold;
//! - consecutive coordinate lists share a line until the column budget runs out;
//! - compact lists such as `stroke` and library table rows never break.
use crate::options::FormatOptions;

/// Failures of [`prettify`]. All of them mean the input is not a well-formed
/// s-expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("unbalanced `)` at byte {offset}")]
    UnbalancedClose { offset: usize },
    #[error("{depth} list(s) left open at end of input")]
    UnclosedList { depth: usize },
    #[error("unterminated string at end of input")]
    UnterminatedString,
    #[error("atom outside of any list at byte {offset}")]
    TopLevelAtom { offset: usize },
}

/// Rewrites `source` into canonical layout, in place.
///
/// On error `source` is left exactly as it was.
pub fn prettify(source: &mut String, options: &FormatOptions) -> Result<(), FormatError> {
    let formatted = Prettifier::new(options, source.len()).run(source)?;
    *source = formatted;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    /// Sibling coordinate lists at `depth` share lines.
    Coordinates { depth: usize },
    /// Everything until the list opened at `depth` closes stays inline.
    Compact { depth: usize },
    TableRow { depth: usize },
}

struct Prettifier<'o> {
    options: &'o FormatOptions,
    out: String,
    list_depth: usize,
    column: usize,
    in_quote: bool,
    backslashes: usize,
    /// Per open list, whether a token wrap has broken it over lines.
    wrapped: Vec<bool>,
    last_non_whitespace: Option<char>,
    mode: Mode,
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// The keyword of a list whose opening paren precedes `rest`.
fn keyword_after(rest: &str) -> &str {
    let rest = rest.trim_start_matches(is_whitespace);
    let end = rest
        .find(|c: char| is_whitespace(c) || matches!(c, '(' | ')' | '"'))
        .unwrap_or(rest.len());
    &rest[..end]
}

impl<'o> Prettifier<'o> {
    fn new(options: &'o FormatOptions, capacity: usize) -> Self {
        Self {
            options,
            out: String::with_capacity(capacity + capacity / 4),
            list_depth: 0,
            column: 0,
            in_quote: false,
            backslashes: 0,
            wrapped: Vec::new(),
            last_non_whitespace: None,
            mode: Mode::Normal,
        }
    }

    fn run(mut self, source: &str) -> Result<String, FormatError> {
        let mut cursor = 0;
        while let Some(c) = source[cursor..].chars().next() {
            let offset = cursor;
            cursor += c.len_utf8();

            if self.in_quote {
                self.push(c);
                if c == '"' && self.backslashes % 2 == 0 {
                    self.in_quote = false;
                }
                self.count_backslash(c);
                continue;
            }

            match c {
                c if is_whitespace(c) => {
                    let rest = source[cursor..].trim_start_matches(is_whitespace);
                    cursor = source.len() - rest.len();
                    self.whitespace(rest.chars().next());
                }
                '(' => self.open(keyword_after(&source[cursor..])),
                ')' => self.close(offset)?,
                _ if self.list_depth == 0 => return Err(FormatError::TopLevelAtom { offset }),
                '"' => {
                    self.push(c);
                    self.in_quote = self.backslashes % 2 == 0;
                }
                _ => self.push(c),
            }
            self.count_backslash(c);
        }

        if self.in_quote {
            return Err(FormatError::UnterminatedString);
        }
        if self.list_depth > 0 {
            return Err(FormatError::UnclosedList {
                depth: self.list_depth,
            });
        }

        self.out.push('\n');
        Ok(self.out)
    }

    fn push(&mut self, c: char) {
        self.out.push(c);
        if c == '\n' {
            self.column = 0;
        } else {
            self.column += 1;
        }
        if !is_whitespace(c) {
            self.last_non_whitespace = Some(c);
        }
    }

    fn newline(&mut self, depth: usize) {
        self.push('\n');
        for _ in 0..depth * self.options.indent_size {
            self.push(self.options.indent_char);
        }
    }

    fn count_backslash(&mut self, c: char) {
        self.backslashes = if c == '\\' { self.backslashes + 1 } else { 0 };
    }

    /// Handles a run of whitespace followed by `next`.
    fn whitespace(&mut self, next: Option<char>) {
        if self.list_depth == 0
            || self.out.ends_with('(')
            || matches!(next, None | Some('(' | ')'))
        {
            return;
        }

        if self.mode == Mode::Normal && self.column >= self.options.wrap_threshold {
            self.newline(self.list_depth);
            if let Some(wrapped) = self.wrapped.last_mut() {
                *wrapped = true;
            }
        } else {
            self.push(' ');
        }
    }

    fn open(&mut self, keyword: &str) {
        let options = self.options;
        let is_coordinate = keyword == options.coordinate_keyword;
        let inline = match self.mode {
            Mode::Compact { .. } | Mode::TableRow { .. } => true,
            Mode::Coordinates { depth } => {
                is_coordinate
                    && depth == self.list_depth
                    && self.column < options.coordinate_column_limit
            }
            Mode::Normal => false,
        };

        if self.out.is_empty() {
            // the document's first paren
        } else if inline {
            self.push(' ');
        } else {
            self.newline(self.list_depth);
        }
        self.push('(');

        if !matches!(self.mode, Mode::Compact { .. } | Mode::TableRow { .. }) {
            let depth = self.list_depth;
            self.mode = if is_coordinate {
                Mode::Coordinates { depth }
            } else if options.is_compact(keyword) {
                Mode::Compact { depth }
            } else if options.is_table_row(keyword) {
                Mode::TableRow { depth }
            } else {
                Mode::Normal
            };
        }
        self.list_depth += 1;
        self.wrapped.push(false);
    }

    fn close(&mut self, offset: usize) -> Result<(), FormatError> {
        if self.list_depth == 0 {
            return Err(FormatError::UnbalancedClose { offset });
        }
        self.list_depth -= 1;
        let wrapped = self.wrapped.pop().unwrap_or(false);

        match self.mode {
            Mode::Compact { depth } | Mode::TableRow { depth } => {
                self.push(')');
                if self.list_depth == depth {
                    self.mode = Mode::Normal;
                }
            }
            Mode::Normal | Mode::Coordinates { .. } => {
                if self.last_non_whitespace == Some(')') || wrapped {
                    self.newline(self.list_depth);
                }
                self.push(')');
                if let Mode::Coordinates { depth } = self.mode {
                    if self.list_depth < depth {
                        self.mode = Mode::Normal;
                    }
                }
            }
        }
        Ok(())
    }
}
