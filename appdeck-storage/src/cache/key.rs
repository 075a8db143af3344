//! Cache key scheme.
//!
//! Every key is `{prefix}{namespace}:{parameter}` where the parameter is a
//! decimal record id or the literal `list`. Keys are only built through
//! [`CacheKey`], so a numeric id can never be rendered any other way.

use std::fmt;

use appdeck_core::ApplicationId;

/// Default key prefix; clear-all never reaches keys outside it.
pub const DEFAULT_KEY_PREFIX: &str = "appdeck:";

const LIST_PARAMETER: &str = "list";

/// A family of cached projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    AppList,
    AppDetail,
    Versions,
    MemberLevels,
}

impl Namespace {
    pub const ALL: [Namespace; 4] = [
        Namespace::AppList,
        Namespace::AppDetail,
        Namespace::Versions,
        Namespace::MemberLevels,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::AppList => "app-list",
            Namespace::AppDetail => "app-detail",
            Namespace::Versions => "versions",
            Namespace::MemberLevels => "member-levels",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Parameter {
    List,
    Id(u64),
}

/// Logical cache key: a namespace plus an entity id or the list marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: Namespace,
    parameter: Parameter,
}

impl CacheKey {
    /// The list of all applications.
    pub fn app_list() -> Self {
        Self::list(Namespace::AppList)
    }

    /// One application with its versions.
    pub fn app_detail(id: ApplicationId) -> Self {
        Self::entity(Namespace::AppDetail, id.get())
    }

    /// Versions of one application, newest first.
    pub fn versions(app_id: ApplicationId) -> Self {
        Self::entity(Namespace::Versions, app_id.get())
    }

    /// Every member level.
    pub fn member_levels() -> Self {
        Self::list(Namespace::MemberLevels)
    }

    /// Member levels of one application.
    pub fn member_levels_for(app_id: ApplicationId) -> Self {
        Self::entity(Namespace::MemberLevels, app_id.get())
    }

    pub fn list(namespace: Namespace) -> Self {
        Self {
            namespace,
            parameter: Parameter::List,
        }
    }

    pub fn entity(namespace: Namespace, id: u64) -> Self {
        Self {
            namespace,
            parameter: Parameter::Id(id),
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Render the physical key under `prefix`.
    pub fn render(&self, prefix: &str) -> String {
        match self.parameter {
            Parameter::List => format!("{}{}:{}", prefix, self.namespace, LIST_PARAMETER),
            Parameter::Id(id) => format!("{}{}:{}", prefix, self.namespace, id),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(""))
    }
}

/// What an invalidation removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPattern {
    /// One key.
    Exact(CacheKey),
    /// Every key in a namespace.
    Namespace(Namespace),
    /// Every key under the prefix.
    All,
}

impl KeyPattern {
    /// Render as a backend glob. Only `Exact` has no wildcard.
    pub fn render(&self, prefix: &str) -> String {
        match self {
            KeyPattern::Exact(key) => key.render(prefix),
            KeyPattern::Namespace(namespace) => format!("{}{}:*", prefix, namespace),
            KeyPattern::All => format!("{}*", prefix),
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, KeyPattern::Exact(_))
    }

    /// Whether a logical key falls under this pattern.
    pub fn matches(&self, key: &CacheKey) -> bool {
        match self {
            KeyPattern::Exact(exact) => exact == key,
            KeyPattern::Namespace(namespace) => key.namespace == *namespace,
            KeyPattern::All => true,
        }
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(""))
    }
}
