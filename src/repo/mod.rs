use std::collections::HashMap;

use async_trait::async_trait;

use chrono::{DateTime, Utc};

use crate::domain::NewTicketResponse;

mod memory;
mod models;
mod postgres;
pub mod query;

pub use memory::MemoryStore;
pub use models::{
    BucketCount, CountTotal, Location, Page, PreparedPdf, Region, RegionCount, TicketCounts,
    TicketListing, TicketResponse, User,
};
pub use postgres::PgStore;
pub use query::TicketQuery;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} {1} does not exist")]
    MissingReference(&'static str, i64),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for submissions, their PDFs and the reference data around them
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a validated submission, stamping its creation time
    async fn insert_ticket(&self, new_ticket: &NewTicketResponse) -> StoreResult<TicketResponse>;

    /// Write back the columns the submission pipeline owns: printed/emailed
    /// timestamps, prepared PDF and filename
    async fn update_ticket(&self, ticket: &TicketResponse) -> StoreResult<()>;

    /// The submission owning a prepared PDF
    async fn fetch_ticket_by_pdf(&self, pdf_id: i64) -> StoreResult<Option<TicketResponse>>;

    async fn list_tickets(&self, query: &TicketQuery) -> StoreResult<Page<TicketListing>>;

    async fn count_tickets(&self) -> StoreResult<TicketCounts>;

    /// Set `printed_by` on every submission whose PDF is in `pdf_ids`, in one
    /// statement. Returns the number of submissions touched.
    async fn mark_printed(
        &self,
        pdf_ids: &[i64],
        printed_by: i64,
        at: DateTime<Utc>,
    ) -> StoreResult<u64>;

    async fn insert_pdf(&self, data: &[u8]) -> StoreResult<i64>;

    async fn fetch_pdf(&self, id: i64) -> StoreResult<Option<PreparedPdf>>;

    /// PDFs in the order of `ids`. Duplicates repeat, unknown ids are skipped.
    async fn fetch_pdfs(&self, ids: &[i64]) -> StoreResult<Vec<PreparedPdf>>;

    async fn fetch_location(&self, id: i64) -> StoreResult<Option<Location>>;

    async fn fetch_locations(&self) -> StoreResult<Vec<Location>>;

    async fn fetch_regions(&self) -> StoreResult<Vec<Region>>;

    async fn fetch_user_by_authorization_id(
        &self,
        authorization_id: &str,
    ) -> StoreResult<Option<User>>;

    /// Look up a demo user, creating it on first login. `None` when the id already
    /// belongs to a real account.
    async fn upsert_demo_user(&self, authorization_id: &str) -> StoreResult<Option<User>>;

    async fn accept_terms(&self, user_id: i64, at: DateTime<Utc>) -> StoreResult<()>;
}

/// Arrange distinct PDFs in the caller's requested order
fn in_requested_order(ids: &[i64], pdfs: Vec<PreparedPdf>) -> Vec<PreparedPdf> {
    let by_id: HashMap<i64, PreparedPdf> = pdfs.into_iter().map(|pdf| (pdf.id, pdf)).collect();

    ids.iter().filter_map(|id| by_id.get(id).cloned()).collect()
}
