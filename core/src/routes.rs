//! Navigation route table of the dashboard.
//!
//! # Design
//! The table is declared as a tree of `RouteEntry` values and compiled once
//! by `RouteTable::new` into a flat list in match order: for each entry in
//! declaration order, its children come first, then the entry itself.
//! Resolution walks that list and returns the first route whose segments
//! line up with the path, so declaration order is the only tie-break.
//! Static segments compare ASCII case-insensitively; parameter values are
//! kept exactly as written.
//!
//! Entries without a name are layouts. They contribute a path prefix and a
//! view to the chain of their descendants but never match on their own.
//!
//! Construction rejects tables with duplicate names, two routes of the same
//! shape (the later one could never match), nameless leaves and malformed
//! `:param` segments.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::RouteError;

/// Identifier of the view a route mounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(String);

impl ViewId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ViewId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One declared route.
///
/// `path` is relative to the parent unless it starts with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub view: ViewId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RouteEntry>,
}

impl RouteEntry {
    /// A named, matchable route.
    pub fn new(path: impl Into<String>, name: impl Into<String>, view: impl Into<ViewId>) -> Self {
        Self {
            path: path.into(),
            name: Some(name.into()),
            view: view.into(),
            children: Vec::new(),
        }
    }

    /// A nameless layout wrapping `children`.
    pub fn layout(path: impl Into<String>, view: impl Into<ViewId>, children: Vec<RouteEntry>) -> Self {
        Self {
            path: path.into(),
            name: None,
            view: view.into(),
            children,
        }
    }

    pub fn with_children(mut self, children: Vec<RouteEntry>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
}

#[derive(Debug, Clone)]
struct CompiledRoute {
    name: String,
    segments: Vec<Segment>,
    /// Views from the outermost layout down to this route.
    chain: Vec<ViewId>,
}

impl CompiledRoute {
    fn matches(&self, parts: &[&str]) -> Option<BTreeMap<String, String>> {
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = BTreeMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Static(s) if s.eq_ignore_ascii_case(part) => {}
                Segment::Static(_) => return None,
                Segment::Param(name) => {
                    let value = urlencoding::decode(part)
                        .map(|v| v.into_owned())
                        .unwrap_or_else(|_| part.to_string());
                    params.insert(name.clone(), value);
                }
            }
        }
        Some(params)
    }

    /// Segments with parameter names erased and static segments lowercased,
    /// for detecting shadowed routes.
    fn shape(&self) -> Vec<Option<String>> {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Static(s) => Some(s.to_ascii_lowercase()),
                Segment::Param(_) => None,
            })
            .collect()
    }
}

/// Result of a successful [`RouteTable::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub name: String,
    pub view: ViewId,
    pub params: BTreeMap<String, String>,
    /// Views to mount, outermost layout first; the last one is `view`.
    pub matched: Vec<ViewId>,
}

/// Immutable, compiled route table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>) -> Result<Self, RouteError> {
        let mut routes = Vec::new();
        for entry in &entries {
            compile(entry, &[], &[], &mut routes)?;
        }

        check_unambiguous(&routes)?;

        Ok(Self { entries, routes })
    }

    /// The tree the table was built from.
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Route names in match order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.name.as_str())
    }

    /// Find the first route matching `path`. Query string and fragment are
    /// ignored, as are empty segments.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        let path = path.split(&['?', '#'][..]).next().unwrap_or_default();
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();

        let found = self.routes.iter().find_map(|route| {
            route.matches(&parts).map(|params| RouteMatch {
                name: route.name.clone(),
                view: route.chain.last().cloned().unwrap_or_else(|| ViewId::new("")),
                params,
                matched: route.chain.clone(),
            })
        });
        trace!(path, route = found.as_ref().map(|m| m.name.as_str()), "resolved route");
        found
    }

    /// Build the concrete path of route `name`, percent-encoding parameter
    /// values. `None` if the route is unknown or a parameter is missing.
    pub fn href(&self, name: &str, params: &[(&str, &str)]) -> Option<String> {
        let route = self.routes.iter().find(|r| r.name == name)?;
        let mut path = String::new();
        for segment in &route.segments {
            path.push('/');
            match segment {
                Segment::Static(s) => path.push_str(s),
                Segment::Param(p) => {
                    let (_, value) = params.iter().find(|(k, _)| *k == p.as_str())?;
                    path.push_str(&urlencoding::encode(value));
                }
            }
        }
        if path.is_empty() {
            path.push('/');
        }
        Some(path)
    }
}

fn compile(
    entry: &RouteEntry,
    prefix: &[Segment],
    chain: &[ViewId],
    out: &mut Vec<CompiledRoute>,
) -> Result<(), RouteError> {
    let mut segments = if entry.path.starts_with('/') {
        Vec::new()
    } else {
        prefix.to_vec()
    };
    segments.extend(parse_pattern(&entry.path)?);

    let mut seen = Vec::new();
    for segment in &segments {
        if let Segment::Param(name) = segment {
            if seen.contains(&name) {
                return Err(RouteError::InvalidParam {
                    path: entry.path.clone(),
                    segment: format!(":{name}"),
                });
            }
            seen.push(name);
        }
    }

    let mut chain = chain.to_vec();
    chain.push(entry.view.clone());

    for child in &entry.children {
        compile(child, &segments, &chain, out)?;
    }

    match &entry.name {
        Some(name) => out.push(CompiledRoute {
            name: name.clone(),
            segments,
            chain,
        }),
        None if entry.children.is_empty() => {
            return Err(RouteError::UnnamedLeaf {
                path: entry.path.clone(),
            })
        }
        None => {}
    }
    Ok(())
}

fn check_unambiguous(routes: &[CompiledRoute]) -> Result<(), RouteError> {
    let mut names = HashSet::new();
    let mut shapes: HashMap<Vec<Option<String>>, &str> = HashMap::new();
    for route in routes {
        if !names.insert(route.name.as_str()) {
            return Err(RouteError::DuplicateName(route.name.clone()));
        }
        if let Some(first) = shapes.insert(route.shape(), &route.name) {
            return Err(RouteError::DuplicatePattern {
                first: first.to_string(),
                second: route.name.clone(),
            });
        }
    }
    Ok(())
}

fn parse_pattern(path: &str) -> Result<Vec<Segment>, RouteError> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix(':') {
            Some(name) if is_param_name(name) => Ok(Segment::Param(name.to_string())),
            Some(_) => Err(RouteError::InvalidParam {
                path: path.to_string(),
                segment: s.to_string(),
            }),
            None => Ok(Segment::Static(s.to_string())),
        })
        .collect()
}

fn is_param_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Route tree of the dashboard: the main layout with the navbar, and the
/// blank layout used for printable pages.
pub fn dashboard_routes() -> Vec<RouteEntry> {
    vec![
        RouteEntry::layout(
            "/",
            "App",
            vec![
                RouteEntry::new("", "Dashboard", "DashboardView"),
                RouteEntry::new("customers", "Customers", "CustomersView"),
                RouteEntry::new("customers/:id", "CustomerDetail", "CustomerDetailView"),
                RouteEntry::new("books", "Books", "BooksView"),
                RouteEntry::new("books/:id", "BookDetail", "BookDetailView"),
                RouteEntry::new("invoices", "Invoices", "InvoicesView"),
                RouteEntry::new("invoices/new", "CreateInvoice", "CreateInvoiceView"),
                RouteEntry::new("authors", "Authors", "AuthorsView"),
                RouteEntry::new("authors/:id", "AuthorDetail", "AuthorDetailView"),
                RouteEntry::new("publishers", "Publishers", "PublishersView"),
                RouteEntry::new("publishers/:id", "PublisherDetail", "PublisherDetailView"),
                RouteEntry::new("/insights", "Insights", "InsightsView"),
                RouteEntry::new("route-axes", "RouteAxes", "RouteAxesView"),
                RouteEntry::new("route-axes/:id", "RouteAxisDetail", "RouteAxisDetailView"),
            ],
        ),
        RouteEntry::layout(
            "/print",
            "BlankLayout",
            vec![RouteEntry::new(
                "invoice/:invoiceId/payment/:paymentId",
                "PrintReceipt",
                "PrintReceiptView",
            )],
        ),
    ]
}
