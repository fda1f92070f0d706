//! Route pattern compilation and matching.
//!
//! A pattern is split on `/` into segments. Each segment is one of:
//!
//! | Form                       | Kind                                        |
//! |----------------------------|---------------------------------------------|
//! | `users`                    | literal                                     |
//! | `:id` / `{id}`             | parameter, captures one segment             |
//! | `:id(\d+)` / `{id:\d+}`    | parameter with a regex constraint           |
//! | `:page?` / `{page?}`       | optional trailing parameter                 |
//! | `:page(\d+)?`              | optional constrained parameter              |
//! | `:page?=1` / `:page=1`     | optional trailing parameter with a default  |
//! | `*rest`                    | catch-all, captures the remaining segments  |
//!
//! Constraints are anchored to the whole segment and may not contain `/`.
//! A default must satisfy its parameter's constraint.
//!
//! Path segments are percent-decoded before matching: literals, constraints
//! and captured values all see the decoded text. [`CompiledPattern::build`]
//! encodes what it renders, so built paths match their pattern again.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;

use regex::Regex;

use crate::error::PatternError;
use crate::params::Params;

/// A compiled regex constraint on a parameter.
#[derive(Debug, Clone)]
pub struct Constraint {
    source: String,
    regex: Regex,
}

impl Constraint {
    fn compile(pattern: &str, name: &str, source: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(&format!("^(?:{source})$")).map_err(|e| {
            PatternError::InvalidConstraint {
                pattern: pattern.to_string(),
                name: name.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// The constraint as written, without anchors.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns true if `value` satisfies the constraint.
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// A named parameter segment.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: String,
    /// Regex the captured segment must satisfy.
    pub constraint: Option<Constraint>,
    /// Whether the segment may be absent from the path.
    pub optional: bool,
    /// Value used when an optional segment is absent.
    pub default: Option<String>,
}

/// One compiled segment of a pattern.
#[derive(Debug, Clone)]
pub enum Segment {
    /// Matches the exact text.
    Literal(String),
    /// Captures one path segment.
    Param(ParamSpec),
    /// Captures all remaining segments (at least one).
    CatchAll(String),
}

impl Segment {
    fn name(&self) -> Option<&str> {
        match self {
            Self::Literal(_) => None,
            Self::Param(spec) => Some(&spec.name),
            Self::CatchAll(name) => Some(name),
        }
    }
}

/// Ordering key used by the route table to try candidates.
///
/// Greater means more specific: more literal segments, then a longer leading
/// run of literals, then more constrained parameters, then no catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    literals: usize,
    literal_prefix: usize,
    constrained: usize,
    bounded: bool,
}

/// A route pattern ready for matching.
///
/// # Example
///
/// ```rust
/// use switchyard_router::CompiledPattern;
///
/// let pattern = CompiledPattern::compile(r"/users/:id(\d+)/:tab?=profile").unwrap();
///
/// let params = pattern.match_path("/users/42").unwrap();
/// assert_eq!(params.get("id"), Some("42"));
/// assert_eq!(params.get("tab"), Some("profile"));
///
/// assert!(pattern.match_path("/users/abc").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    segments: Vec<Segment>,
    canonical: String,
    specificity: Specificity,
}

impl CompiledPattern {
    /// Compiles a pattern.
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        Self::compile_with_rules(pattern, &HashMap::new())
    }

    /// Compiles a pattern, applying per-parameter regex overrides.
    ///
    /// A rule replaces any inline constraint on the parameter with the same
    /// name. A rule for a name the pattern does not declare is an error.
    pub fn compile_with_rules(
        pattern: &str,
        rules: &HashMap<String, String>,
    ) -> Result<Self, PatternError> {
        let mut segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|raw| parse_segment(pattern, raw))
            .collect::<Result<Vec<_>, _>>()?;

        validate(pattern, &segments)?;

        for (name, source) in rules {
            let spec = segments
                .iter_mut()
                .find_map(|s| match s {
                    Segment::Param(spec) if spec.name == *name => Some(spec),
                    _ => None,
                })
                .ok_or_else(|| PatternError::UnknownRule {
                    pattern: pattern.to_string(),
                    name: name.clone(),
                })?;
            spec.constraint = Some(Constraint::compile(pattern, name, source)?);
        }
        check_defaults(pattern, &segments)?;

        let canonical = render_canonical(&segments);
        let specificity = specificity_of(&segments);

        Ok(Self {
            source: pattern.to_string(),
            segments,
            canonical,
            specificity,
        })
    }

    /// The pattern text as declared.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Normalized pattern text, including applied rules. Two patterns with the
    /// same canonical form match exactly the same paths.
    #[must_use]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// The compiled segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Ordering key for candidate selection.
    #[must_use]
    pub fn specificity(&self) -> Specificity {
        self.specificity
    }

    /// Names of every parameter, in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(Segment::name)
    }

    /// Matches a request path, returning captured parameters.
    ///
    /// Empty path segments are ignored, so `/users/` and `/users` are the same.
    /// Each segment is percent-decoded first; one that does not decode to
    /// UTF-8 is used as written.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Params> {
        let parts: Vec<Cow<'_, str>> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode_segment)
            .collect();
        let mut params = Params::with_capacity(self.segments.len());
        let mut idx = 0;

        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => {
                    if parts.get(idx).map(|part| &**part) != Some(lit.as_str()) {
                        return None;
                    }
                    idx += 1;
                }
                Segment::Param(spec) => match parts.get(idx) {
                    Some(value) => {
                        if let Some(constraint) = &spec.constraint {
                            if !constraint.is_match(value) {
                                return None;
                            }
                        }
                        params.push(spec.name.as_str(), &**value);
                        idx += 1;
                    }
                    None if spec.optional => {
                        if let Some(default) = &spec.default {
                            params.push(spec.name.as_str(), default.as_str());
                        }
                    }
                    None => return None,
                },
                Segment::CatchAll(name) => {
                    if idx >= parts.len() {
                        return None;
                    }
                    params.push(name.as_str(), parts[idx..].join("/"));
                    idx = parts.len();
                }
            }
        }

        (idx == parts.len()).then_some(params)
    }

    /// Renders a concrete path from parameter values.
    ///
    /// Optional parameters without a value (and without a default) end the
    /// path. Values are checked against their constraints, then
    /// percent-encoded; a catch-all value is encoded per `/`-separated part.
    pub fn build(&self, params: &Params) -> Result<String, PatternError> {
        let mut parts: Vec<Cow<'_, str>> = Vec::with_capacity(self.segments.len());

        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => parts.push(urlencoding::encode(lit)),
                Segment::Param(spec) => {
                    let value = params.get(&spec.name).or(spec.default.as_deref());
                    let Some(value) = value else {
                        if spec.optional {
                            break;
                        }
                        return Err(PatternError::MissingParam {
                            pattern: self.source.clone(),
                            name: spec.name.clone(),
                        });
                    };
                    if let Some(constraint) = &spec.constraint {
                        if !constraint.is_match(value) {
                            return Err(PatternError::ConstraintViolation {
                                pattern: self.source.clone(),
                                name: spec.name.clone(),
                                value: value.to_string(),
                            });
                        }
                    }
                    parts.push(urlencoding::encode(value));
                }
                Segment::CatchAll(name) => {
                    let value = params.get(name).ok_or_else(|| PatternError::MissingParam {
                        pattern: self.source.clone(),
                        name: name.clone(),
                    })?;
                    parts.extend(
                        value
                            .split('/')
                            .filter(|s| !s.is_empty())
                            .map(urlencoding::encode),
                    );
                }
            }
        }

        Ok(format!("/{}", parts.join("/")))
    }
}

impl fmt::Display for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

fn decode_segment(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn parse_segment(pattern: &str, raw: &str) -> Result<Segment, PatternError> {
    let malformed = || PatternError::MalformedSegment {
        pattern: pattern.to_string(),
        segment: raw.to_string(),
    };
    let empty = || PatternError::EmptyName {
        pattern: pattern.to_string(),
    };

    if let Some(name) = raw.strip_prefix('*') {
        if name.is_empty() {
            return Err(empty());
        }
        if !name.chars().all(is_name_char) {
            return Err(malformed());
        }
        return Ok(Segment::CatchAll(name.to_string()));
    }

    let (body, braced) = if let Some(inner) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        (inner, true)
    } else if let Some(body) = raw.strip_prefix(':') {
        (body, false)
    } else if raw.contains(['{', '}']) {
        return Err(malformed());
    } else {
        return Ok(Segment::Literal(raw.to_string()));
    };

    let name_end = body.find(|c: char| !is_name_char(c)).unwrap_or(body.len());
    let name = &body[..name_end];
    if name.is_empty() {
        return Err(empty());
    }

    let mut rest = &body[name_end..];
    let mut optional = false;
    let mut constraint = None;
    let mut default = None;

    if let Some(r) = rest.strip_prefix('?') {
        optional = true;
        rest = r;
    }

    if braced {
        if let Some(source) = rest.strip_prefix(':') {
            constraint = Some(source);
            rest = "";
        }
    } else if rest.starts_with('(') {
        let close = group_end(rest).ok_or_else(malformed)?;
        constraint = Some(&rest[1..close]);
        rest = &rest[close + 1..];
        if let Some(r) = rest.strip_prefix('?') {
            if optional {
                return Err(malformed());
            }
            optional = true;
            rest = r;
        }
    }

    if let Some(value) = rest.strip_prefix('=') {
        optional = true;
        default = Some(value.to_string());
        rest = "";
    }

    if !rest.is_empty() {
        return Err(malformed());
    }

    let constraint = constraint
        .map(|source| Constraint::compile(pattern, name, source))
        .transpose()?;

    Ok(Segment::Param(ParamSpec {
        name: name.to_string(),
        constraint,
        optional,
        default,
    }))
}

fn check_defaults(pattern: &str, segments: &[Segment]) -> Result<(), PatternError> {
    for segment in segments {
        if let Segment::Param(ParamSpec {
            name,
            constraint: Some(constraint),
            default: Some(default),
            ..
        }) = segment
        {
            if !constraint.is_match(default) {
                return Err(PatternError::DefaultViolatesConstraint {
                    pattern: pattern.to_string(),
                    name: name.clone(),
                    value: default.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Index of the `)` closing the group that opens at `s[0]`.
fn group_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn validate(pattern: &str, segments: &[Segment]) -> Result<(), PatternError> {
    let mut seen = HashSet::new();
    let mut last_optional: Option<&ParamSpec> = None;

    for (i, segment) in segments.iter().enumerate() {
        if let Some(name) = segment.name() {
            if !seen.insert(name) {
                return Err(PatternError::DuplicateParam {
                    pattern: pattern.to_string(),
                    name: name.to_string(),
                });
            }
        }

        match segment {
            Segment::Param(spec) if spec.optional => last_optional = Some(spec),
            Segment::CatchAll(name) if i + 1 != segments.len() => {
                return Err(PatternError::CatchAllNotLast {
                    pattern: pattern.to_string(),
                    name: name.clone(),
                });
            }
            required => {
                if let Some(optional) = last_optional {
                    if optional.default.is_some() {
                        return Err(PatternError::DefaultNotTrailing {
                            pattern: pattern.to_string(),
                            name: optional.name.clone(),
                        });
                    }
                    return Err(PatternError::RequiredAfterOptional {
                        pattern: pattern.to_string(),
                        segment: render_segment(required),
                    });
                }
            }
        }
    }

    Ok(())
}

fn render_segment(segment: &Segment) -> String {
    match segment {
        Segment::Literal(lit) => lit.clone(),
        Segment::Param(spec) => {
            let mut out = format!(":{}", spec.name);
            if let Some(c) = &spec.constraint {
                out.push('(');
                out.push_str(c.as_str());
                out.push(')');
            }
            if spec.optional {
                out.push('?');
            }
            if let Some(d) = &spec.default {
                out.push('=');
                out.push_str(d);
            }
            out
        }
        Segment::CatchAll(name) => format!("*{name}"),
    }
}

fn render_canonical(segments: &[Segment]) -> String {
    let body: Vec<String> = segments.iter().map(render_segment).collect();
    format!("/{}", body.join("/"))
}

fn specificity_of(segments: &[Segment]) -> Specificity {
    let literals = segments
        .iter()
        .filter(|s| matches!(s, Segment::Literal(_)))
        .count();
    let literal_prefix = segments
        .iter()
        .take_while(|s| matches!(s, Segment::Literal(_)))
        .count();
    let constrained = segments
        .iter()
        .filter(|s| matches!(s, Segment::Param(p) if p.constraint.is_some()))
        .count();
    let bounded = !segments.iter().any(|s| matches!(s, Segment::CatchAll(_)));

    Specificity {
        literals,
        literal_prefix,
        constrained,
        bounded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_literal_pattern() {
        let p = CompiledPattern::compile("/api/v1/health").unwrap();
        assert!(p.match_path("/api/v1/health").unwrap().is_empty());
        assert!(p.match_path("/api/v1/health/").is_some());
        assert!(p.match_path("/api/v1").is_none());
        assert!(p.match_path("/api/v1/health/extra").is_none());
    }

    #[test]
    fn test_root_pattern() {
        let p = CompiledPattern::compile("/").unwrap();
        assert!(p.match_path("/").is_some());
        assert!(p.match_path("").is_some());
        assert!(p.match_path("/x").is_none());
        assert_eq!(p.canonical(), "/");
    }

    #[test]
    fn test_colon_and_brace_params_are_equivalent() {
        let colon = CompiledPattern::compile("/users/:id").unwrap();
        let brace = CompiledPattern::compile("/users/{id}").unwrap();

        assert_eq!(colon.canonical(), brace.canonical());
        assert_eq!(colon.match_path("/users/7").unwrap().get("id"), Some("7"));
        assert_eq!(brace.match_path("/users/7").unwrap().get("id"), Some("7"));
    }

    #[test]
    fn test_constraint_rejects_segment() {
        let p = CompiledPattern::compile(r"/users/:id(\d+)").unwrap();
        assert_eq!(p.match_path("/users/42").unwrap().get("id"), Some("42"));
        assert!(p.match_path("/users/abc").is_none());
        assert!(p.match_path("/users/42abc").is_none());
    }

    #[test]
    fn test_brace_constraint() {
        let p = CompiledPattern::compile(r"/years/{year:\d{4}}").unwrap();
        assert!(p.match_path("/years/2024").is_some());
        assert!(p.match_path("/years/24").is_none());
    }

    #[test]
    fn test_nested_group_in_constraint() {
        let p = CompiledPattern::compile(r"/files/:ext((png|jpe?g))").unwrap();
        assert!(p.match_path("/files/jpeg").is_some());
        assert!(p.match_path("/files/gif").is_none());
    }

    #[test]
    fn test_optional_trailing_with_default() {
        let p = CompiledPattern::compile("/posts/:page?=1").unwrap();
        assert_eq!(p.match_path("/posts").unwrap().get("page"), Some("1"));
        assert_eq!(p.match_path("/posts/4").unwrap().get("page"), Some("4"));
    }

    #[test]
    fn test_optional_trailing_without_default_is_absent() {
        let p = CompiledPattern::compile("/posts/:page?").unwrap();
        let params = p.match_path("/posts").unwrap();
        assert!(!params.contains("page"));
    }

    #[test]
    fn test_equals_implies_optional() {
        let p = CompiledPattern::compile("/search/:sort=recent").unwrap();
        assert_eq!(p.match_path("/search").unwrap().get("sort"), Some("recent"));
    }

    #[test]
    fn test_several_trailing_optionals() {
        let p = CompiledPattern::compile("/archive/:year?/:month?=01").unwrap();
        let params = p.match_path("/archive").unwrap();
        assert!(!params.contains("year"));
        assert_eq!(params.get("month"), Some("01"));

        let params = p.match_path("/archive/2023").unwrap();
        assert_eq!(params.get("year"), Some("2023"));
        assert_eq!(params.get("month"), Some("01"));
    }

    #[test]
    fn test_catch_all() {
        let p = CompiledPattern::compile("/static/*path").unwrap();
        assert_eq!(
            p.match_path("/static/css/site.css").unwrap().get("path"),
            Some("css/site.css")
        );
        assert!(p.match_path("/static").is_none());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            CompiledPattern::compile("/users/:"),
            Err(PatternError::EmptyName { .. })
        ));
        assert!(matches!(
            CompiledPattern::compile("/files/*"),
            Err(PatternError::EmptyName { .. })
        ));
        assert!(matches!(
            CompiledPattern::compile("/users/{}"),
            Err(PatternError::EmptyName { .. })
        ));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = CompiledPattern::compile("/a/:id/b/:id").unwrap_err();
        assert_eq!(
            err,
            PatternError::DuplicateParam {
                pattern: "/a/:id/b/:id".to_string(),
                name: "id".to_string(),
            }
        );
    }

    #[test]
    fn test_default_on_non_trailing_rejected() {
        assert!(matches!(
            CompiledPattern::compile("/list/:page=1/items"),
            Err(PatternError::DefaultNotTrailing { ref name, .. }) if name == "page"
        ));
    }

    #[test]
    fn test_required_after_optional_rejected() {
        assert!(matches!(
            CompiledPattern::compile("/list/:page?/:id"),
            Err(PatternError::RequiredAfterOptional { ref segment, .. }) if segment == ":id"
        ));
    }

    #[test]
    fn test_catch_all_must_be_last() {
        assert!(matches!(
            CompiledPattern::compile("/files/*path/meta"),
            Err(PatternError::CatchAllNotLast { .. })
        ));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        assert!(matches!(
            CompiledPattern::compile(r"/users/:id([0-9)"),
            Err(PatternError::MalformedSegment { .. }) | Err(PatternError::InvalidConstraint { .. })
        ));
        assert!(matches!(
            CompiledPattern::compile(r"/users/{id:[0-9}"),
            Err(PatternError::InvalidConstraint { .. })
        ));
    }

    #[test]
    fn test_malformed_segments_rejected() {
        assert!(matches!(
            CompiledPattern::compile("/users/:id-x"),
            Err(PatternError::MalformedSegment { .. })
        ));
        assert!(matches!(
            CompiledPattern::compile("/users/pre{id}"),
            Err(PatternError::MalformedSegment { .. })
        ));
    }

    #[test]
    fn test_rules_override_inline_constraint() {
        let p = CompiledPattern::compile_with_rules(r"/users/:id(\d+)", &rules(&[("id", "[a-z]+")]))
            .unwrap();
        assert!(p.match_path("/users/abc").is_some());
        assert!(p.match_path("/users/42").is_none());
        assert_eq!(p.canonical(), "/users/:id([a-z]+)");
    }

    #[test]
    fn test_rule_for_unknown_param_rejected() {
        assert!(matches!(
            CompiledPattern::compile_with_rules("/users/:id", &rules(&[("slug", ".+")])),
            Err(PatternError::UnknownRule { ref name, .. }) if name == "slug"
        ));
    }

    #[test]
    fn test_specificity_ordering() {
        let literal = CompiledPattern::compile("/users/me").unwrap();
        let constrained = CompiledPattern::compile(r"/users/:id(\d+)").unwrap();
        let plain = CompiledPattern::compile("/users/:id").unwrap();
        let catch_all = CompiledPattern::compile("/users/*rest").unwrap();

        assert!(literal.specificity() > constrained.specificity());
        assert!(constrained.specificity() > plain.specificity());
        assert!(plain.specificity() > catch_all.specificity());
    }

    #[test]
    fn test_build_path() {
        let p = CompiledPattern::compile(r"/orgs/:org/users/:id(\d+)/:tab?").unwrap();
        let params: Params = [("org", "acme"), ("id", "7")].into_iter().collect();
        assert_eq!(p.build(&params).unwrap(), "/orgs/acme/users/7");

        let params: Params = [("org", "acme"), ("id", "7"), ("tab", "posts")]
            .into_iter()
            .collect();
        assert_eq!(p.build(&params).unwrap(), "/orgs/acme/users/7/posts");
    }

    #[test]
    fn test_build_rejects_missing_and_invalid() {
        let p = CompiledPattern::compile(r"/users/:id(\d+)").unwrap();
        assert!(matches!(
            p.build(&Params::new()),
            Err(PatternError::MissingParam { .. })
        ));

        let params: Params = [("id", "abc")].into_iter().collect();
        assert!(matches!(
            p.build(&params),
            Err(PatternError::ConstraintViolation { .. })
        ));
    }

    #[test]
    fn test_optional_marker_after_constraint() {
        let p = CompiledPattern::compile(r"/posts/:page(\d+)?").unwrap();
        assert!(!p.match_path("/posts").unwrap().contains("page"));
        assert_eq!(p.match_path("/posts/3").unwrap().get("page"), Some("3"));
        assert!(p.match_path("/posts/abc").is_none());
        assert_eq!(p.canonical(), r"/posts/:page(\d+)?");

        let p = CompiledPattern::compile(r"/posts/:page(\d+)?=1").unwrap();
        assert_eq!(p.match_path("/posts").unwrap().get("page"), Some("1"));

        assert!(matches!(
            CompiledPattern::compile(r"/posts/:page?(\d+)?"),
            Err(PatternError::MalformedSegment { .. })
        ));
    }

    #[test]
    fn test_default_must_satisfy_constraint() {
        assert_eq!(
            CompiledPattern::compile(r"/posts/:page?(\d+)=abc").unwrap_err(),
            PatternError::DefaultViolatesConstraint {
                pattern: r"/posts/:page?(\d+)=abc".to_string(),
                name: "page".to_string(),
                value: "abc".to_string(),
            }
        );
        assert!(matches!(
            CompiledPattern::compile_with_rules("/posts/:page=1", &rules(&[("page", "[a-z]+")])),
            Err(PatternError::DefaultViolatesConstraint { .. })
        ));
    }

    #[test]
    fn test_captured_values_are_percent_decoded() {
        let p = CompiledPattern::compile("/books/:slug").unwrap();
        assert_eq!(
            p.match_path("/books/the%20hobbit").unwrap().get("slug"),
            Some("the hobbit")
        );
        // `+` is only a space in query strings.
        assert_eq!(p.match_path("/books/a+b").unwrap().get("slug"), Some("a+b"));
        // Not UTF-8 once decoded: kept as written.
        assert_eq!(p.match_path("/books/%FF").unwrap().get("slug"), Some("%FF"));

        let constrained = CompiledPattern::compile("/tags/:tag([a-z ]+)").unwrap();
        assert!(constrained.match_path("/tags/science%20fiction").is_some());

        let literal = CompiledPattern::compile("/caf\u{e9}/menu").unwrap();
        assert!(literal.match_path("/caf%C3%A9/menu").is_some());

        let files = CompiledPattern::compile("/static/*path").unwrap();
        assert_eq!(
            files.match_path("/static/my%20docs/a.txt").unwrap().get("path"),
            Some("my docs/a.txt")
        );
    }

    #[test]
    fn test_build_encodes_values() {
        let p = CompiledPattern::compile("/books/:slug/*rest").unwrap();
        let params: Params = [("slug", "the hobbit"), ("rest", "ch 1/p?2")].into_iter().collect();
        let path = p.build(&params).unwrap();
        assert_eq!(path, "/books/the%20hobbit/ch%201/p%3F2");
        assert_eq!(p.match_path(&path).unwrap(), params);
    }

    #[test]
    fn test_param_names() {
        let p = CompiledPattern::compile("/a/:x/b/:y?/").unwrap();
        assert_eq!(p.param_names().collect::<Vec<_>>(), vec!["x", "y"]);
    }
}
