use parse_display::Display;
use std::convert::Infallible;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::sync::LazyLock;

mod encoding;
mod expr;
mod value;
mod vars;

mod tests_readme;

use expr::Expr;
pub use value::{Bindings, Value};
pub use vars::Vars;

/// RFC6570 Level 4, expanded and matched in reverse.
///
/// Construction never fails: an expression missing its closing `}` takes the rest of the
/// template up to the next `{` as its variable list.
#[derive(Clone)]
pub struct UriTemplate {
    source: String,
    /// `exprs.len() + 1` ranges into `source`.
    literals: Vec<Range<usize>>,
    exprs: Vec<Expr>,
}
impl fmt::Debug for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\"", self.source)
    }
}
impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}
impl FromStr for UriTemplate {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl UriTemplate {
    pub fn new(s: &str) -> Self {
        let mut literals = Vec::new();
        let mut exprs = Vec::new();
        let mut chunks = s.split('{');
        let mut offset = 0;
        if let Some(head) = chunks.next() {
            offset = head.len();
            literals.push(0..offset);
        }
        for chunk in chunks {
            let start = offset + 1;
            let end = start + chunk.len();
            let (spec, literal_start) = match chunk.find('}') {
                Some(i) => (&chunk[..i], start + i + 1),
                None => (chunk, end),
            };
            exprs.push(Expr::new(spec));
            literals.push(literal_start..end);
            offset = end;
        }
        Self {
            source: s.to_string(),
            literals,
            exprs,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Expands the template. Variables that `vars` does not provide expand to nothing.
    pub fn fill(&self, mut vars: impl Vars) -> String {
        let mut out = String::from(self.literal(0));
        for (i, expr) in self.exprs.iter().enumerate() {
            expr.expand(&mut vars, &mut out);
            out.push_str(self.literal(i + 1));
        }
        out
    }

    /// Expands the template, looking each variable up with `f`.
    pub fn fill_with(&self, f: impl FnMut(&str) -> Option<Value>) -> String {
        self.fill(vars::FnVars(f))
    }

    /// Recovers the variables that would expand to `uri`.
    ///
    /// Returns `Ok(None)` when the literal text of the template does not line up with `uri`.
    /// When several variables share an expression the result is a best guess, see
    /// [`Captures::bindings`].
    pub fn from_uri(&self, uri: &str) -> Result<Option<Bindings>> {
        match self.captures(uri) {
            Some(captures) => captures.bindings().map(Some),
            None => Ok(None),
        }
    }

    /// Splits `input` into the text produced by each expression.
    pub fn captures<'a>(&'a self, input: &'a str) -> Option<Captures<'a>> {
        let last = self.literals.len() - 1;
        let mut ms = Vec::with_capacity(self.exprs.len());
        let mut pos = 0;
        for i in 0..=last {
            let literal = self.literal(i);
            if !input[pos..].starts_with(literal) {
                tracing::trace!(template = %self, input, literal, pos, "literal mismatch");
                return None;
            }
            pos += literal.len();
            if i == last {
                if pos != input.len() {
                    tracing::trace!(template = %self, input, pos, "trailing input");
                    return None;
                }
                break;
            }

            let rest = &input[pos..];
            let mut offset = i;
            let len = loop {
                let next = self.literal(offset + 1);
                if offset + 1 == last {
                    break rest.strip_suffix(next)?.len();
                } else if !next.is_empty() {
                    break rest.find(next)?;
                }
                let prefix = self.exprs[offset + 1].op.prefix();
                if !prefix.is_empty() {
                    break rest.find(prefix).unwrap_or(rest.len());
                }
                // Adjacent expressions with nothing between them share one run of text.
                offset += 1;
            };
            ms.push(Match {
                input,
                range: pos..pos + len,
                template: self,
                index: i,
            });
            pos += len;
        }
        Some(Captures { template: self, ms })
    }

    fn literal(&self, index: usize) -> &str {
        &self.source[self.literals[index].clone()]
    }

    /// Every variable name in template order.
    pub fn var_names(&self) -> impl Iterator<Item = &str> {
        self.exprs
            .iter()
            .flat_map(|expr| expr.var_specs.iter().map(|spec| spec.name.as_str()))
    }
    pub fn find_var_name(&self, name: &str) -> Option<usize> {
        self.exprs
            .iter()
            .position(|expr| expr.var_specs.iter().any(|spec| spec.name == name))
    }
}

/// The text matched by each expression of a template.
#[derive(Debug)]
pub struct Captures<'a> {
    template: &'a UriTemplate,
    ms: Vec<Match<'a>>,
}

impl Captures<'_> {
    pub fn empty() -> Self {
        static DUMMY_TEMPLATE: LazyLock<UriTemplate> = LazyLock::new(|| UriTemplate::new(""));
        Self {
            template: &DUMMY_TEMPLATE,
            ms: Vec::new(),
        }
    }

    /// The match of the first expression that declares `name`.
    pub fn name(&self, name: &str) -> Option<&Match> {
        self.get(self.template.find_var_name(name)?)
    }
    pub fn get(&self, i: usize) -> Option<&Match> {
        self.ms.get(i)
    }
    pub fn len(&self) -> usize {
        self.ms.len()
    }
    pub fn is_empty(&self) -> bool {
        self.ms.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.ms.iter()
    }

    /// Recovers variable values from every match, in template order.
    ///
    /// Values repeated across expressions accumulate into lists. Positional tokens of an
    /// expression with several variables are assigned leading-first, then trailing, and
    /// anything left over goes to the first exploded variable.
    pub fn bindings(&self) -> Result<Bindings> {
        let mut bindings = Bindings::new();
        for m in &self.ms {
            m.unsubstitute(&mut bindings)?;
        }
        Ok(bindings)
    }
}

/// The text one expression produced.
pub struct Match<'a> {
    input: &'a str,
    range: Range<usize>,
    template: &'a UriTemplate,
    index: usize,
}
impl fmt::Debug for Match<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Match")
            .field("index", &self.index)
            .field("range", &self.range)
            .field("text", &self.as_str())
            .finish()
    }
}
impl<'a> Match<'a> {
    fn expr(&self) -> &'a Expr {
        &self.template.exprs[self.index]
    }
    /// Position of the expression in the template.
    pub fn index(&self) -> usize {
        self.index
    }
    pub fn var_names(&self) -> impl Iterator<Item = &'a str> + use<'a> {
        self.expr().var_specs.iter().map(|spec| spec.name.as_str())
    }
    /// The raw text, still carrying the operator prefix and percent-encoding.
    pub fn as_str(&self) -> &'a str {
        &self.input[self.range.clone()]
    }
    pub fn start(&self) -> usize {
        self.range.start
    }
    pub fn end(&self) -> usize {
        self.range.end
    }
    /// Recovers this expression's variables on their own.
    pub fn values(&self) -> Result<Bindings> {
        let mut bindings = Bindings::new();
        self.unsubstitute(&mut bindings)?;
        Ok(bindings)
    }
    fn unsubstitute(&self, bindings: &mut Bindings) -> Result<()> {
        self.expr()
            .unsubstitute(self.input, self.range.clone(), bindings)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidPercentEncoding,
    InvalidUtf8,
}

/// A percent-escape in matched text that cannot be decoded.
///
/// Displays the whole URI with `>>>>` marking where decoding failed.
#[derive(Clone, Debug)]
pub struct Error {
    source: String,
    source_index: usize,
    kind: ErrorKind,
}

impl Error {
    fn new(source: &str, source_index: usize, kind: ErrorKind) -> Self {
        Self {
            source: source.to_string(),
            source_index,
            kind,
        }
    }
    /// Re-points an error raised on `source[offset..]` at the whole of `source`.
    fn relocate(self, source: &str, offset: usize) -> Self {
        Self::new(source, offset + self.source_index, self.kind)
    }
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} (\"{} >>>> {}\")",
            self.kind,
            &self.source[..self.source_index],
            &self.source[self.source_index..],
        )
    }
}

impl std::error::Error for Error {}
