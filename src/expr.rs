use indexmap::IndexMap;
use indexmap::map::Entry;
use std::ops::Range;

use crate::encoding::{decode_component, encode_component, encode_reserved};
use crate::{Bindings, Result, Value, Vars};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum Operator {
    Simple,
    /// `+`
    Reserved,
    /// `#`
    Fragment,
    /// `.`
    Label,
    /// `/`
    Path,
    /// `;`
    PathParam,
    /// `?`
    Query,
    /// `&`
    QueryContinuation,
}
impl Operator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Reserved),
            '#' => Some(Self::Fragment),
            '.' => Some(Self::Label),
            '/' => Some(Self::Path),
            ';' => Some(Self::PathParam),
            '?' => Some(Self::Query),
            '&' => Some(Self::QueryContinuation),
            _ => None,
        }
    }
    pub(crate) fn prefix(self) -> &'static str {
        match self {
            Self::Simple | Self::Reserved => "",
            Self::Fragment => "#",
            Self::Label => ".",
            Self::Path => "/",
            Self::PathParam => ";",
            Self::Query => "?",
            Self::QueryContinuation => "&",
        }
    }
    fn separator(self) -> &'static str {
        match self {
            Self::Simple | Self::Reserved | Self::Fragment => ",",
            Self::Label => ".",
            Self::Path => "/",
            Self::PathParam => ";",
            Self::Query | Self::QueryContinuation => "&",
        }
    }
    fn escape(self) -> bool {
        !matches!(self, Self::Reserved | Self::Fragment)
    }
    fn named(self) -> bool {
        matches!(self, Self::PathParam | Self::Query | Self::QueryContinuation)
    }
    fn trim_empty(self) -> bool {
        self == Self::PathParam
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VarSpec {
    pub(crate) name: String,
    truncate: Option<usize>,
    explode: bool,
}
impl VarSpec {
    fn new(s: &str) -> Self {
        if let Some((name, len)) = s.split_once(':') {
            let digits = len.find(|c: char| !c.is_ascii_digit()).unwrap_or(len.len());
            return Self {
                name: name.to_string(),
                truncate: Some(len[..digits].parse().unwrap_or(0)),
                explode: false,
            };
        }
        let name = s.trim_end_matches('*');
        Self {
            name: name.to_string(),
            truncate: None,
            explode: name.len() != s.len(),
        }
    }
    fn truncated<'a>(&self, s: &'a str) -> &'a str {
        match self.truncate.and_then(|n| s.char_indices().nth(n)) {
            Some((i, _)) => &s[..i],
            None => s,
        }
    }
}

/// One compiled `{...}` expression. Always holds at least one [`VarSpec`].
#[derive(Debug, Clone)]
pub(crate) struct Expr {
    pub(crate) op: Operator,
    pub(crate) var_specs: Vec<VarSpec>,
}
impl Expr {
    pub(crate) fn new(spec: &str) -> Self {
        let mut chars = spec.chars();
        let (op, list) = match chars.next().and_then(Operator::from_char) {
            Some(op) => (op, chars.as_str()),
            None => (Operator::Simple, spec),
        };
        Self {
            op,
            var_specs: list.split(',').map(VarSpec::new).collect(),
        }
    }

    fn encode(&self, s: &str, out: &mut String) {
        if self.op.escape() {
            encode_component(s, out);
        } else {
            encode_reserved(s, out);
        }
    }
    fn encode_value(&self, value: &Value, out: &mut String) {
        match value {
            Value::Null => {}
            Value::String(s) => self.encode(s, out),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    self.encode_value(item, out);
                }
            }
            Value::Map(entries) => {
                for (i, (key, item)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    self.encode(key, out);
                    out.push(',');
                    self.encode_value(item, out);
                }
            }
        }
    }

    pub(crate) fn expand(&self, vars: &mut impl Vars, out: &mut String) {
        let separator = self.op.separator();
        let named = self.op.named();
        let mut first = true;
        for spec in &self.var_specs {
            let Some(value) = vars.var(&spec.name) else {
                continue;
            };
            if value.is_undefined() {
                continue;
            }
            out.push_str(if first { self.op.prefix() } else { separator });
            first = false;

            match &*value {
                Value::Null => {}
                Value::String(s) => {
                    if named {
                        out.push_str(&spec.name);
                        if !self.op.trim_empty() || !s.is_empty() {
                            out.push('=');
                        }
                    }
                    self.encode(spec.truncated(s), out);
                }
                Value::List(items) => {
                    if named {
                        out.push_str(&spec.name);
                        out.push('=');
                    }
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            if spec.explode {
                                out.push_str(separator);
                                if named {
                                    out.push_str(&spec.name);
                                    out.push('=');
                                }
                            } else {
                                out.push(',');
                            }
                        }
                        self.encode_value(item, out);
                    }
                }
                Value::Map(entries) => {
                    if named && !spec.explode {
                        out.push_str(&spec.name);
                        out.push('=');
                    }
                    for (i, (key, item)) in entries.iter().enumerate() {
                        if i > 0 {
                            out.push_str(if spec.explode { separator } else { "," });
                        }
                        self.encode(key, out);
                        out.push(if spec.explode { '=' } else { ',' });
                        self.encode_value(item, out);
                    }
                }
            }
        }
    }

    fn decode(&self, s: &str) -> Result<String> {
        if self.op.escape() {
            decode_component(s)
        } else {
            Ok(s.to_string())
        }
    }
    /// Decodes `part`, which sits at `input[start..]`. Errors point into `input`.
    fn decode_at(&self, input: &str, start: usize, part: &str) -> Result<String> {
        self.decode(part).map_err(|e| e.relocate(input, start))
    }
    fn decode_parts(&self, input: &str, start: usize, token: &str) -> Result<Vec<String>> {
        split_offsets(token, ",")
            .map(|(offset, part)| self.decode_at(input, start + offset, part))
            .collect()
    }

    /// Recovers variable values from `input[range]`, the text this expression produced.
    ///
    /// Text that does not start with the operator's prefix contributes nothing.
    pub(crate) fn unsubstitute(
        &self,
        input: &str,
        range: Range<usize>,
        bindings: &mut Bindings,
    ) -> Result<()> {
        let prefix = self.op.prefix();
        let Some(raw) = input[range.clone()].strip_prefix(prefix) else {
            tracing::trace!(raw = &input[range], prefix, "expression prefix not found");
            return Ok(());
        };
        let start = range.start + prefix.len();
        match self.var_specs.as_slice() {
            [spec] if spec.explode => {
                self.unsubstitute_exploded(spec, input, start, raw, bindings)
            }
            _ => self.unsubstitute_list(input, start, raw, bindings),
        }
    }

    fn unsubstitute_exploded(
        &self,
        spec: &VarSpec,
        input: &str,
        start: usize,
        raw: &str,
        bindings: &mut Bindings,
    ) -> Result<()> {
        let separator = self.op.separator();
        // Without `=` there is no telling a list from a map.
        let has_equals = self.op.escape() && raw.contains('=');

        // Values cannot contain `=` here, so a piece without one was split off its value.
        let mut tokens: Vec<(usize, String)> = Vec::new();
        for (offset, token) in split_offsets(raw, separator) {
            match tokens.last_mut() {
                Some((_, last)) if has_equals && !token.contains('=') => {
                    last.push_str(separator);
                    last.push_str(token);
                }
                _ => tokens.push((offset, token.to_string())),
            }
        }
        let items = tokens
            .iter()
            .map(|(offset, token)| self.decode_parts(input, start + offset, token))
            .collect::<Result<Vec<_>>>()?;

        if !self.op.named() && !has_equals {
            let items = items.into_iter().map(parts_to_value).collect();
            extend(bindings, &spec.name, items);
            return Ok(());
        }

        let mut entries = match bindings.get(&spec.name) {
            Some(Value::Map(entries)) => entries.clone(),
            _ => IndexMap::new(),
        };
        if !(self.op.named() && raw.is_empty()) {
            for mut parts in items {
                let (key, rest) = split_pair(&parts[0]);
                parts[0] = rest;
                accumulate(&mut entries, key, parts_to_value(parts));
            }
        }
        if entries.len() == 1 {
            if let Some(value) = entries.swap_remove(&spec.name) {
                bindings.insert(spec.name.clone(), value);
                return Ok(());
            }
        }
        if !entries.is_empty() {
            bindings.insert(spec.name.clone(), Value::Map(entries));
        }
        Ok(())
    }

    fn unsubstitute_list(
        &self,
        input: &str,
        start: usize,
        raw: &str,
        bindings: &mut Bindings,
    ) -> Result<()> {
        let named = self.op.named();
        let tokens: Vec<(usize, &str)> = if self.var_specs.len() == 1 {
            vec![(0, raw)]
        } else {
            split_offsets(raw, self.op.separator()).collect()
        };
        for (i, &(offset, token)) in tokens.iter().enumerate() {
            if named && token.is_empty() {
                continue;
            }
            let mut parts: Vec<(usize, &str)> = split_offsets(token, ",").collect();
            let (name, spec) = if named {
                let (head_offset, head) = parts[0];
                let (name, rest) = head.split_once('=').unwrap_or((head, ""));
                parts[0] = (head_offset + name.len() + 1, rest);
                let spec = self
                    .var_specs
                    .iter()
                    .find(|s| s.name == name)
                    .unwrap_or(&self.var_specs[0]);
                (name, spec)
            } else {
                let spec = &self.var_specs[self.spec_index(i, tokens.len())];
                (spec.name.as_str(), spec)
            };
            let parts = parts
                .into_iter()
                .map(|(part_offset, part)| {
                    self.decode_at(input, start + offset + part_offset, part)
                })
                .collect::<Result<Vec<_>>>()?;

            if (named || spec.explode) && bindings.contains_key(name) {
                extend(bindings, name, parts.into_iter().map(Value::String).collect());
            } else if parts.len() == 1 && !spec.explode {
                bindings.insert(name.to_string(), parts_to_value(parts));
            } else {
                bindings.insert(name.to_string(), Value::list(parts));
            }
        }
        Ok(())
    }

    /// Picks the variable for positional token `i` of `n`.
    ///
    /// Leading tokens pair with leading non-exploded variables, trailing tokens with trailing
    /// non-exploded variables. Anything else goes to the first exploded variable, which is a
    /// guess when several exploded variables are adjacent.
    fn spec_index(&self, i: usize, n: usize) -> usize {
        let m = self.var_specs.len();
        let head = self
            .var_specs
            .iter()
            .take(i.min(m - 1))
            .position(|s| s.explode)
            .unwrap_or(i.min(m - 1));
        if head == i {
            return i;
        }
        if let Some(tail) = m.checked_sub(n - i) {
            if tail > 0 && self.var_specs[tail..].iter().all(|s| !s.explode) {
                return tail;
            }
        }
        head
    }
}

/// Splits `s` on `sep`, pairing each piece with its byte offset in `s`.
fn split_offsets<'a>(s: &'a str, sep: &'a str) -> impl Iterator<Item = (usize, &'a str)> {
    let mut start = 0;
    s.split(sep).map(move |part| {
        let offset = start;
        start += part.len() + sep.len();
        (offset, part)
    })
}

fn split_pair(s: &str) -> (String, String) {
    match s.split_once('=') {
        Some((key, value)) => (key.to_string(), value.to_string()),
        None => (s.to_string(), String::new()),
    }
}

fn parts_to_value(mut parts: Vec<String>) -> Value {
    if parts.len() == 1 {
        Value::String(parts.remove(0))
    } else {
        Value::list(parts)
    }
}

fn accumulate(entries: &mut IndexMap<String, Value>, key: String, value: Value) {
    match entries.entry(key) {
        Entry::Vacant(e) => {
            e.insert(value);
        }
        Entry::Occupied(mut e) => match e.get_mut() {
            Value::List(items) => items.push(value),
            existing => {
                let old = std::mem::take(existing);
                *existing = Value::List(vec![old, value]);
            }
        },
    }
}

fn extend(bindings: &mut Bindings, name: &str, items: Vec<Value>) {
    match bindings.get_mut(name) {
        Some(Value::List(existing)) => existing.extend(items),
        Some(existing) => {
            let mut list = vec![std::mem::take(existing)];
            list.extend(items);
            *existing = Value::List(list);
        }
        None => {
            bindings.insert(name.to_string(), Value::List(items));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_table() {
        let rows = [
            ("", "", ",", true, false, false),
            ("+", "", ",", false, false, false),
            (".", ".", ".", true, false, false),
            ("/", "/", "/", true, false, false),
            ("#", "#", ",", false, false, false),
            (";", ";", ";", true, true, true),
            ("?", "?", "&", true, true, false),
            ("&", "&", "&", true, true, false),
        ];
        for (op, prefix, separator, escape, named, trim_empty) in rows {
            let expr = Expr::new(&format!("{op}x"));
            assert_eq!(expr.op.prefix(), prefix, "operator `{op}`");
            assert_eq!(expr.op.separator(), separator, "operator `{op}`");
            assert_eq!(expr.op.escape(), escape, "operator `{op}`");
            assert_eq!(expr.op.named(), named, "operator `{op}`");
            assert_eq!(expr.op.trim_empty(), trim_empty, "operator `{op}`");
            assert_eq!(expr.var_specs[0].name, "x");
        }
    }

    #[test]
    fn var_specs() {
        let expr = Expr::new("/a,b:3,c*,d:12x,e:");
        let specs: Vec<_> = expr
            .var_specs
            .iter()
            .map(|s| (s.name.as_str(), s.truncate, s.explode))
            .collect();
        assert_eq!(
            specs,
            [
                ("a", None, false),
                ("b", Some(3), false),
                ("c", None, true),
                ("d", Some(12), false),
                ("e", Some(0), false),
            ]
        );
    }

    #[test]
    fn empty_expression_has_one_var() {
        let expr = Expr::new("");
        assert_eq!(expr.op, Operator::Simple);
        assert_eq!(expr.var_specs.len(), 1);
        assert_eq!(expr.var_specs[0].name, "");
    }

    #[test]
    fn truncate_counts_chars() {
        let spec = VarSpec::new("v:2");
        assert_eq!(spec.truncated("あいう"), "あい");
        assert_eq!(spec.truncated("a"), "a");
    }

    #[test]
    fn spec_index_prefers_trailing_plain_vars() {
        let expr = Expr::new("/a*,b");
        let picks: Vec<_> = (0..3).map(|i| expr.spec_index(i, 3)).collect();
        assert_eq!(picks, [0, 0, 1]);

        let expr = Expr::new("/a,b,c");
        let picks: Vec<_> = (0..2).map(|i| expr.spec_index(i, 2)).collect();
        assert_eq!(picks, [0, 1]);

        let expr = Expr::new("/a*,b*");
        let picks: Vec<_> = (0..3).map(|i| expr.spec_index(i, 3)).collect();
        assert_eq!(picks, [0, 0, 0]);
    }

    #[test]
    fn split_offsets_point_into_source() {
        let pieces: Vec<_> = split_offsets("a&&bc&d", "&").collect();
        assert_eq!(pieces, [(0, "a"), (2, ""), (3, "bc"), (6, "d")]);
        for (offset, piece) in pieces {
            assert_eq!(&"a&&bc&d"[offset..offset + piece.len()], piece);
        }
    }
}
