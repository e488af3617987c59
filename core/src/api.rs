//! Paths of the management API, relative to the client's base URL.
//!
//! Collections follow the REST router convention of the backend: the list
//! lives at `name/`, one record at `name/{id}/`. Every path keeps its
//! trailing slash because the backend redirects (and drops the body) without
//! it.

use std::fmt;

/// A REST collection exposed by the management API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Customers,
    Books,
    Publishers,
    Authors,
    RouteAxes,
    Invoices,
    CreditNotes,
}

impl Resource {
    pub const ALL: [Resource; 7] = [
        Resource::Customers,
        Resource::Books,
        Resource::Publishers,
        Resource::Authors,
        Resource::RouteAxes,
        Resource::Invoices,
        Resource::CreditNotes,
    ];

    /// URL segment of the collection.
    pub fn segment(self) -> &'static str {
        match self {
            Resource::Customers => "customers",
            Resource::Books => "books",
            Resource::Publishers => "publishers",
            Resource::Authors => "authors",
            Resource::RouteAxes => "route-axes",
            Resource::Invoices => "invoices",
            Resource::CreditNotes => "credit-notes",
        }
    }

    pub fn collection_path(self) -> String {
        format!("{}/", self.segment())
    }

    pub fn item_path(self, id: u64) -> String {
        format!("{}/{id}/", self.segment())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

pub const DASHBOARD_STATS_PATH: &str = "dashboard-stats/";
pub const DEBTORS_PATH: &str = "debtors/";
pub const INSIGHTS_PATH: &str = "insights/";

/// Action endpoint recording a payment against one invoice.
pub fn record_payment_path(invoice_id: u64) -> String {
    format!("{}record_payment/", Resource::Invoices.item_path(invoice_id))
}
