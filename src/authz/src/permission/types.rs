//! Named permission type definitions and wildcard parsing
//!
//! A permission is encoded as `domain[:actions][:targets]`. Each
//! colon-separated part holds one or more comma-separated tokens.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::kind::PermissionKind;

/// Token that matches any token in the same position
pub const WILDCARD_TOKEN: &str = "*";

/// Separator between parts
pub const PART_DIVIDER_TOKEN: char = ':';

/// Separator between tokens within a part
pub const SUBPART_DIVIDER_TOKEN: char = ',';

/// Tokens are folded to lower-case unless requested otherwise
pub const DEFAULT_CASE_SENSITIVE: bool = false;

/// One colon-delimited segment: a set of tokens
pub type Part = BTreeSet<String>;

/// Result type for permission construction
pub type PermissionResult<T> = Result<T, PermissionError>;

/// Errors raised while building a permission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// Domain is empty or blank
    EmptyDomain,
    /// Domain contains a part or token divider
    InvalidDomain(String),
    /// Wildcard string is empty or blank
    EmptyWildcard,
    /// A part contains no tokens
    EmptyPart(usize),
    /// Wildcard string contains nothing but dividers
    OnlyDividers,
}

impl fmt::Display for PermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDomain => write!(f, "domain cannot be empty"),
            Self::InvalidDomain(domain) => write!(
                f,
                "domain '{}' cannot contain '{}' or '{}'",
                domain, PART_DIVIDER_TOKEN, SUBPART_DIVIDER_TOKEN
            ),
            Self::EmptyWildcard => write!(f, "wildcard string cannot be empty"),
            Self::EmptyPart(idx) => {
                write!(f, "wildcard string cannot contain parts with only dividers (part {})", idx)
            }
            Self::OnlyDividers => write!(f, "wildcard string cannot contain only dividers"),
        }
    }
}

impl std::error::Error for PermissionError {}

/// Optional fields for building a permission
///
/// Absent fields follow the encoding rule: no actions and no targets means
/// a domain-wide permission; targets without actions insert a wildcard
/// actions part.
///
/// # Examples
///
/// ```
/// use idm_authz::permission::{NamedPermission, PermissionKind, PermissionOptions};
///
/// let options = PermissionOptions::new().with_targets("report-42");
/// let permission = NamedPermission::with_options("view", &PermissionKind::File, options).unwrap();
/// assert_eq!(permission.to_string(), "file:*:report-42");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOptions {
    /// Explicit domain, overriding the kind's domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Comma-separated actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<String>,

    /// Comma-separated targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<String>,

    /// Keep token case as written
    #[serde(default)]
    pub case_sensitive: bool,
}

impl PermissionOptions {
    /// Options with every field absent
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the domain
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the comma-separated actions
    pub fn with_actions(mut self, actions: impl Into<String>) -> Self {
        self.actions = Some(actions.into());
        self
    }

    /// Set the comma-separated targets
    pub fn with_targets(mut self, targets: impl Into<String>) -> Self {
        self.targets = Some(targets.into());
        self
    }

    /// Keep token case as written
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }
}

/// Wildcard permission with a domain/actions/targets shape
///
/// Equality and hashing consider the parsed parts only; the name is a label.
///
/// # Examples
///
/// ```
/// use idm_authz::permission::NamedPermission;
///
/// let held = NamedPermission::with_actions("docs", "read,write").unwrap();
/// let requested = NamedPermission::with_actions("docs", "read").unwrap();
/// assert!(held.implies(&requested));
/// assert!(!requested.implies(&held));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "PermissionRepr", into = "PermissionRepr")]
pub struct NamedPermission {
    name: String,
    domain: String,
    actions: Option<BTreeSet<String>>,
    targets: Option<BTreeSet<String>>,
    parts: Vec<Part>,
}

impl NamedPermission {
    /// Domain-wide permission: all actions on all targets
    pub fn new(name: impl Into<String>) -> PermissionResult<Self> {
        Self::with_options(name, &PermissionKind::Named, PermissionOptions::new())
    }

    /// Permission for the given actions on all targets
    pub fn with_actions(name: impl Into<String>, actions: &str) -> PermissionResult<Self> {
        Self::with_options(
            name,
            &PermissionKind::Named,
            PermissionOptions::new().with_actions(actions),
        )
    }

    /// Permission for the given actions on the given targets
    pub fn with_actions_and_targets(
        name: impl Into<String>,
        actions: &str,
        targets: &str,
    ) -> PermissionResult<Self> {
        Self::with_options(
            name,
            &PermissionKind::Named,
            PermissionOptions::new().with_actions(actions).with_targets(targets),
        )
    }

    /// Permission with an explicit domain
    pub fn with_domain(
        name: impl Into<String>,
        domain: &str,
        actions: Option<&str>,
        targets: Option<&str>,
    ) -> PermissionResult<Self> {
        let mut options = PermissionOptions::new().with_domain(domain);
        options.actions = actions.map(str::to_string);
        options.targets = targets.map(str::to_string);
        Self::with_options(name, &PermissionKind::Named, options)
    }

    /// Build a permission of `kind` from optional fields
    pub fn with_options(
        name: impl Into<String>,
        kind: &PermissionKind,
        options: PermissionOptions,
    ) -> PermissionResult<Self> {
        let domain = match options.domain {
            Some(domain) => domain,
            None => kind.domain(),
        };
        Self::from_fields(
            name.into(),
            domain,
            options.actions.as_deref(),
            options.targets.as_deref(),
            options.case_sensitive,
        )
    }

    pub(crate) fn from_fields(
        name: String,
        domain: String,
        actions: Option<&str>,
        targets: Option<&str>,
        case_sensitive: bool,
    ) -> PermissionResult<Self> {
        let actions = actions.filter(|a| has_text(a));
        let targets = targets.filter(|t| has_text(t));
        let parts = encode_parts(&domain, actions, targets, case_sensitive)?;
        let targets = targets.map(split_to_set);

        Ok(Self {
            name,
            domain,
            actions: actions
                .map(split_to_set)
                .filter(|set| !implied_actions(set, targets.is_some())),
            targets,
            parts,
        })
    }

    /// Parse a raw wildcard string such as `printer:print,query:lp7200`
    ///
    /// Part 0 becomes the domain, part 1 the actions and part 2 the targets.
    /// The string itself is used as the name.
    pub fn parse(wildcard: &str) -> PermissionResult<Self> {
        Self::parse_with_case(wildcard, DEFAULT_CASE_SENSITIVE)
    }

    /// Parse a raw wildcard string, optionally keeping token case
    pub fn parse_with_case(wildcard: &str, case_sensitive: bool) -> PermissionResult<Self> {
        let parts = parse_parts(wildcard, case_sensitive)?;
        let join = |part: &Part| part.iter().cloned().collect::<Vec<_>>().join(",");

        let targets = parts.get(2).cloned();

        Ok(Self {
            name: wildcard.trim().to_string(),
            domain: join(&parts[0]),
            actions: parts
                .get(1)
                .filter(|set| !implied_actions(set, targets.is_some()))
                .cloned(),
            targets,
            parts,
        })
    }

    /// Permission label
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Domain, as supplied or derived from the kind
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Actions, `None` when all actions are granted
    ///
    /// A lone `*` actions part in front of targets reads as `None`, so
    /// `printer:*:lp7200` reports the same accessors however it was built.
    pub fn actions(&self) -> Option<&BTreeSet<String>> {
        self.actions.as_ref()
    }

    /// Targets, `None` when all targets are granted
    pub fn targets(&self) -> Option<&BTreeSet<String>> {
        self.targets.as_ref()
    }

    /// Parsed parts; never empty, no part is empty
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }
}

impl PartialEq for NamedPermission {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for NamedPermission {}

impl std::hash::Hash for NamedPermission {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.parts.hash(state);
    }
}

impl FromStr for NamedPermission {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NamedPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, part) in self.parts.iter().enumerate() {
            if idx > 0 {
                write!(f, "{}", PART_DIVIDER_TOKEN)?;
            }
            for (pos, token) in part.iter().enumerate() {
                if pos > 0 {
                    write!(f, "{}", SUBPART_DIVIDER_TOKEN)?;
                }
                write!(f, "{}", token)?;
            }
        }
        Ok(())
    }
}

/// Serialized form: the label plus the canonical wildcard string
#[derive(Serialize, Deserialize)]
struct PermissionRepr {
    name: String,
    permission: String,
    #[serde(default)]
    case_sensitive: bool,
}

impl TryFrom<PermissionRepr> for NamedPermission {
    type Error = PermissionError;

    fn try_from(repr: PermissionRepr) -> Result<Self, Self::Error> {
        let mut permission = Self::parse_with_case(&repr.permission, repr.case_sensitive)?;
        permission.name = repr.name;
        Ok(permission)
    }
}

impl From<NamedPermission> for PermissionRepr {
    fn from(permission: NamedPermission) -> Self {
        let rendered = permission.to_string();
        let case_sensitive = rendered != rendered.to_lowercase();
        Self {
            name: permission.name,
            permission: rendered,
            case_sensitive,
        }
    }
}

fn has_text(s: &str) -> bool {
    !s.trim().is_empty()
}

/// A lone wildcard actions part that only positions the targets
fn implied_actions(actions: &BTreeSet<String>, has_targets: bool) -> bool {
    has_targets && actions.len() == 1 && actions.contains(WILDCARD_TOKEN)
}

/// Whether `domain` can stand as a single token of part 0
pub fn is_valid_domain(domain: &str) -> bool {
    !domain.contains(PART_DIVIDER_TOKEN) && !domain.contains(SUBPART_DIVIDER_TOKEN)
}

fn split_to_set(csv: &str) -> BTreeSet<String> {
    csv.split(SUBPART_DIVIDER_TOKEN)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build `domain[:actions][:targets]` and parse it into parts
fn encode_parts(
    domain: &str,
    actions: Option<&str>,
    targets: Option<&str>,
    case_sensitive: bool,
) -> PermissionResult<Vec<Part>> {
    if !has_text(domain) {
        return Err(PermissionError::EmptyDomain);
    }
    if !is_valid_domain(domain) {
        return Err(PermissionError::InvalidDomain(domain.to_string()));
    }

    let mut wildcard = String::from(domain);
    match actions {
        Some(actions) => {
            wildcard.push(PART_DIVIDER_TOKEN);
            wildcard.push_str(actions);
        }
        None if targets.is_some() => {
            wildcard.push(PART_DIVIDER_TOKEN);
            wildcard.push_str(WILDCARD_TOKEN);
        }
        None => {}
    }
    if let Some(targets) = targets {
        wildcard.push(PART_DIVIDER_TOKEN);
        wildcard.push_str(targets);
    }

    parse_parts(&wildcard, case_sensitive)
}

/// Split a wildcard string into token sets
fn parse_parts(wildcard: &str, case_sensitive: bool) -> PermissionResult<Vec<Part>> {
    let wildcard = wildcard.trim();
    if wildcard.is_empty() {
        return Err(PermissionError::EmptyWildcard);
    }
    if wildcard
        .chars()
        .all(|c| c == PART_DIVIDER_TOKEN || c == SUBPART_DIVIDER_TOKEN || c.is_whitespace())
    {
        return Err(PermissionError::OnlyDividers);
    }

    let mut parts = Vec::new();
    for (idx, raw) in wildcard.split(PART_DIVIDER_TOKEN).enumerate() {
        let part: Part = raw
            .split(SUBPART_DIVIDER_TOKEN)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| {
                if case_sensitive {
                    token.to_string()
                } else {
                    token.to_lowercase()
                }
            })
            .collect();

        if part.is_empty() {
            return Err(PermissionError::EmptyPart(idx));
        }
        parts.push(part);
    }

    Ok(parts)
}
