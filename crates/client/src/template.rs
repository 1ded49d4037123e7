//! URI template expansion (RFC 6570, levels 1-3 plus prefix modifiers).
//!
//! Registry hrefs and HAL links come back as templates such as
//! `…/searches/simple{?search,offset,limit,sort}`. Only string values are
//! supported; unset variables are dropped from the expansion.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use ctms_domain::error::{Error, Result};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Operator {
    first: &'static str,
    sep: &'static str,
    named: bool,
    if_empty: &'static str,
    allow_reserved: bool,
}

const SIMPLE: Operator = Operator {
    first: "",
    sep: ",",
    named: false,
    if_empty: "",
    allow_reserved: false,
};

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        let op = |first, sep, named, if_empty, allow_reserved| Operator {
            first,
            sep,
            named,
            if_empty,
            allow_reserved,
        };
        Some(match c {
            '+' => op("", ",", false, "", true),
            '#' => op("#", ",", false, "", true),
            '.' => op(".", ".", false, "", false),
            '/' => op("/", "/", false, "", false),
            ';' => op(";", ";", true, "", false),
            '?' => op("?", "&", true, "=", false),
            '&' => op("&", "&", true, "=", false),
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct VarSpec {
    name: String,
    prefix: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Expression { op: Operator, vars: Vec<VarSpec> },
}

static EXPRESSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]*)\}").expect("EXPRESSION_RE should compile"));

/// A parsed URI template plus the variable values set so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    source: String,
    parts: Vec<Part>,
    values: BTreeMap<String, String>,
}

impl UriTemplate {
    /// Parse a template. Unbalanced braces and unknown operators are
    /// [`Error::Parse`].
    pub fn parse(template: &str) -> Result<Self> {
        let mut parts = Vec::new();
        let mut last = 0;
        for caps in EXPRESSION_RE.captures_iter(template) {
            let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            push_literal(&mut parts, &template[last..whole.start()], template)?;
            parts.push(parse_expression(body.as_str(), template)?);
            last = whole.end();
        }
        push_literal(&mut parts, &template[last..], template)?;

        Ok(Self {
            source: template.to_owned(),
            parts,
            values: BTreeMap::new(),
        })
    }

    /// The template text as parsed.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the template has any expressions at all.
    pub fn is_templated(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, Part::Expression { .. }))
    }

    /// Variable names in order of first appearance.
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for part in &self.parts {
            if let Part::Expression { vars, .. } = part {
                for v in vars {
                    if !names.contains(&v.name.as_str()) {
                        names.push(&v.name);
                    }
                }
            }
        }
        names
    }

    /// Set a variable; chainable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn expand(&self) -> String {
        let mut out = String::with_capacity(self.source.len());
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Expression { op, vars } => self.expand_expression(&mut out, *op, vars),
            }
        }
        out
    }

    fn expand_expression(&self, out: &mut String, op: Operator, vars: &[VarSpec]) {
        let defined = vars
            .iter()
            .filter_map(|v| self.values.get(&v.name).map(|value| (v, value)));

        let mut first = true;
        for (spec, value) in defined {
            out.push_str(if first { op.first } else { op.sep });
            first = false;

            let value = match spec.prefix {
                Some(n) => value.chars().take(n).collect::<String>(),
                None => value.clone(),
            };
            if op.named {
                out.push_str(&spec.name);
                if value.is_empty() {
                    out.push_str(op.if_empty);
                    continue;
                }
                out.push('=');
            }
            out.push_str(&encode(&value, op.allow_reserved));
        }
    }
}

fn push_literal(parts: &mut Vec<Part>, text: &str, template: &str) -> Result<()> {
    if text.contains(['{', '}']) {
        return Err(Error::Parse(format!(
            "unbalanced braces in uri template '{template}'"
        )));
    }
    if !text.is_empty() {
        parts.push(Part::Literal(text.to_owned()));
    }
    Ok(())
}

fn parse_expression(body: &str, template: &str) -> Result<Part> {
    // A name may contain '.', but never start with it.
    let leading = body
        .chars()
        .next()
        .filter(|c| *c == '.' || !is_varchar(*c));
    let (op, list) = match leading {
        Some(c) => {
            let op = Operator::from_char(c).ok_or_else(|| {
                Error::Parse(format!("unknown operator '{c}' in uri template '{template}'"))
            })?;
            (op, &body[c.len_utf8()..])
        }
        None => (SIMPLE, body),
    };

    let mut vars = Vec::new();
    for raw in list.split(',') {
        let raw = raw.trim_end_matches('*');
        let (name, prefix) = match raw.split_once(':') {
            Some((name, len)) => {
                let len = len.parse::<usize>().map_err(|_| {
                    Error::Parse(format!("bad prefix '{len}' in uri template '{template}'"))
                })?;
                (name, Some(len))
            }
            None => (raw, None),
        };
        if name.is_empty() || !name.chars().all(is_varchar) {
            return Err(Error::Parse(format!(
                "bad expression '{{{body}}}' in uri template '{template}'"
            )));
        }
        vars.push(VarSpec {
            name: name.to_owned(),
            prefix,
        });
    }
    Ok(Part::Expression { op, vars })
}

fn is_varchar(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '%')
}

const RESERVED: &str = ":/?#[]@!$&'()*+,;=";

fn encode(value: &str, allow_reserved: bool) -> String {
    if !allow_reserved {
        return urlencoding::encode(value).into_owned();
    }
    let mut out = String::with_capacity(value.len());
    let bytes = value.as_bytes();
    for (i, c) in value.char_indices() {
        let pct_triplet = c == '%'
            && bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
            && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
        if pct_triplet || RESERVED.contains(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expression_pattern_captures_brace_bodies() {
        let bodies: Vec<&str> = EXPRESSION_RE
            .captures_iter("/a/{id}/b{?offset,limit}")
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();
        assert_eq!(bodies, ["id", "?offset,limit"]);
    }

    fn expand(template: &str, vars: &[(&str, &str)]) -> String {
        let mut t = UriTemplate::parse(template).unwrap();
        for (k, v) in vars {
            t.set(*k, *v);
        }
        t.expand()
    }

    #[test]
    fn query_expansion_drops_unset_variables() {
        let t = "https://ctms/apis/avid.mam.assets.access;version=0;realm=BEEF/searches/simple{?search,offset,limit,sort}";
        assert_eq!(
            expand(t, &[("search", "Avid Clip & more"), ("limit", "25")]),
            "https://ctms/apis/avid.mam.assets.access;version=0;realm=BEEF/searches/simple?search=Avid%20Clip%20%26%20more&limit=25"
        );
        assert_eq!(
            expand(t, &[]),
            "https://ctms/apis/avid.mam.assets.access;version=0;realm=BEEF/searches/simple"
        );
    }

    #[test]
    fn continuation_appends_to_existing_query() {
        assert_eq!(
            expand("/items?lang=en{&offset,limit}", &[("offset", "50")]),
            "/items?lang=en&offset=50"
        );
    }

    #[test]
    fn simple_and_reserved_expansion() {
        assert_eq!(expand("/assets/{id}", &[("id", "a/b c")]), "/assets/a%2Fb%20c");
        assert_eq!(expand("{+base}/assets", &[("base", "/apis/x;v=0")]), "/apis/x;v=0/assets");
        assert_eq!(expand("{+p}", &[("p", "50%25 off")]), "50%25%20off");
        assert_eq!(expand("/doc{#section}", &[("section", "a/b")]), "/doc#a/b");
    }

    #[test]
    fn path_label_and_matrix_operators() {
        assert_eq!(expand("/folders{/a,b}", &[("a", "x"), ("b", "y")]), "/folders/x/y");
        assert_eq!(expand("file{.ext}", &[("ext", "mxf")]), "file.mxf");
        assert_eq!(
            expand("/apis/svc{;version,realm}", &[("version", "0"), ("realm", "")]),
            "/apis/svc;version=0;realm"
        );
        assert_eq!(expand("/q{?empty}", &[("empty", "")]), "/q?empty=");
    }

    #[test]
    fn prefix_modifier_truncates_by_character() {
        assert_eq!(expand("/{name:3}", &[("name", "école")]), "/%C3%A9co");
    }

    #[test]
    fn variables_are_listed_once_in_order() {
        let t = UriTemplate::parse("/p/{id}{?offset,limit}{&offset}").unwrap();
        assert_eq!(t.variables(), vec!["id", "offset", "limit"]);
        assert!(t.is_templated());
        assert!(!UriTemplate::parse("/plain").unwrap().is_templated());
    }

    #[test]
    fn malformed_templates_are_rejected() {
        assert!(matches!(UriTemplate::parse("/a{b"), Err(Error::Parse(_))));
        assert!(matches!(UriTemplate::parse("/a}b"), Err(Error::Parse(_))));
        assert!(matches!(UriTemplate::parse("/a{}"), Err(Error::Parse(_))));
        assert!(matches!(UriTemplate::parse("/a{x:y}"), Err(Error::Parse(_))));
        assert!(matches!(UriTemplate::parse("/a{!x}"), Err(Error::Parse(_))));
    }
}
