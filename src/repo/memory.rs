use async_trait::async_trait;

use chrono::{DateTime, Utc};

use tokio::sync::RwLock;

use crate::domain::NewTicketResponse;
use crate::repo::models::display_name;
use crate::repo::query::TicketQuery;
use crate::repo::{
    in_requested_order, Location, Page, PreparedPdf, Region, Store, StoreError, StoreResult,
    TicketCounts, TicketListing, TicketResponse, User,
};

#[derive(Debug, Default)]
struct State {
    regions: Vec<Region>,
    locations: Vec<Location>,
    users: Vec<User>,
    tickets: Vec<TicketResponse>,
    pdfs: Vec<PreparedPdf>,
    last_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn location(&self, id: i64) -> Option<&Location> {
        self.locations.iter().find(|location| location.id == id)
    }

    fn user(&self, id: i64) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }

    fn listing(&self, ticket: &TicketResponse) -> Option<TicketListing> {
        let location = self.location(ticket.hearing_location_id)?;
        let printed_by = ticket.printed_by.and_then(|id| self.user(id));

        Some(TicketListing {
            ticket: ticket.clone(),
            hearing_location_name: location.name.clone(),
            region_id: location.region_id,
            printed_by_name: printed_by.and_then(User::display_name),
            printed_by_first_name: printed_by.and_then(|user| user.first_name.clone()),
            printed_by_last_name: printed_by.and_then(|user| user.last_name.clone()),
        })
    }
}

/// In-process [`Store`], used by the API tests and for running without a database.
///
/// Ids come from one shared sequence, so a ticket and a PDF never share an id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_region(&self, name: &str) -> Region {
        let mut state = self.state.write().await;
        let region = Region {
            id: state.next_id(),
            name: name.to_string(),
        };
        state.regions.push(region.clone());
        region
    }

    pub async fn add_location(&self, name: &str, region_id: i64) -> Location {
        let mut state = self.state.write().await;
        let location = Location {
            id: state.next_id(),
            name: name.to_string(),
            region_id,
        };
        state.locations.push(location.clone());
        location
    }

    /// Add a regular (non-demo) account
    pub async fn add_user(&self, authorization_id: &str, first_name: &str, last_name: &str) -> User {
        let mut state = self.state.write().await;
        let user = User {
            id: state.next_id(),
            authorization_id: authorization_id.to_string(),
            email: None,
            first_name: Some(first_name.to_string()),
            last_name: Some(last_name.to_string()),
            accepted_terms_at: None,
            is_demo: false,
        };
        state.users.push(user.clone());
        user
    }

    /// Snapshot of every stored submission, in insertion order
    pub async fn tickets(&self) -> Vec<TicketResponse> {
        self.state.read().await.tickets.clone()
    }

    pub async fn pdf_count(&self) -> usize {
        self.state.read().await.pdfs.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_ticket(&self, new_ticket: &NewTicketResponse) -> StoreResult<TicketResponse> {
        let mut state = self.state.write().await;

        if state.location(new_ticket.hearing_location_id).is_none() {
            return Err(StoreError::MissingReference(
                "location",
                new_ticket.hearing_location_id,
            ));
        }

        let ticket = TicketResponse {
            id: state.next_id(),
            first_name: new_ticket.first_name.to_string(),
            middle_name: new_ticket.middle_name.clone(),
            last_name: new_ticket.last_name.to_string(),
            email: new_ticket.email.to_string(),
            ticket_number: new_ticket.ticket_number.to_string(),
            ticket_date: new_ticket.ticket_date,
            hearing_location_id: new_ticket.hearing_location_id,
            hearing_attendance: new_ticket.hearing_attendance.clone(),
            dispute_type: new_ticket.dispute_type.clone(),
            created_date: Utc::now(),
            printed_date: None,
            printed_by: None,
            archived_date: None,
            emailed_date: None,
            prepared_pdf_id: None,
            pdf_filename: None,
        };
        state.tickets.push(ticket.clone());

        Ok(ticket)
    }

    async fn update_ticket(&self, ticket: &TicketResponse) -> StoreResult<()> {
        let mut state = self.state.write().await;

        if let Some(stored) = state.tickets.iter_mut().find(|t| t.id == ticket.id) {
            stored.printed_date = ticket.printed_date;
            stored.emailed_date = ticket.emailed_date;
            stored.prepared_pdf_id = ticket.prepared_pdf_id;
            stored.pdf_filename = ticket.pdf_filename.clone();
        }

        Ok(())
    }

    async fn fetch_ticket_by_pdf(&self, pdf_id: i64) -> StoreResult<Option<TicketResponse>> {
        let state = self.state.read().await;

        Ok(state
            .tickets
            .iter()
            .find(|ticket| ticket.prepared_pdf_id == Some(pdf_id))
            .cloned())
    }

    async fn list_tickets(&self, query: &TicketQuery) -> StoreResult<Page<TicketListing>> {
        let state = self.state.read().await;

        let mut rows: Vec<TicketListing> = state
            .tickets
            .iter()
            .filter_map(|ticket| state.listing(ticket))
            .filter(|row| query.matches(row))
            .collect();
        rows.sort_by(|a, b| query.compare(a, b));

        let count = rows.len() as i64;
        let results = rows
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();

        Ok(Page { count, results })
    }

    async fn count_tickets(&self) -> StoreResult<TicketCounts> {
        let state = self.state.read().await;

        let mut regions = state.regions.clone();
        regions.sort_by_key(|region| region.id);

        let bucket = |region_id: i64, printed: bool| {
            state
                .tickets
                .iter()
                .filter(|ticket| ticket.is_printed() == printed)
                .filter(|ticket| {
                    state
                        .location(ticket.hearing_location_id)
                        .map_or(false, |location| location.region_id == region_id)
                })
                .count() as i64
        };

        let by_region: Vec<(Region, i64, i64)> = regions
            .into_iter()
            .map(|region| {
                let (new, archived) = (bucket(region.id, false), bucket(region.id, true));
                (region, new, archived)
            })
            .collect();

        let archive_total = state.tickets.iter().filter(|t| t.is_printed()).count() as i64;
        let new_total = state.tickets.len() as i64 - archive_total;

        Ok(TicketCounts::from_regions(by_region, new_total, archive_total))
    }

    async fn mark_printed(
        &self,
        pdf_ids: &[i64],
        printed_by: i64,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut state = self.state.write().await;

        if state.user(printed_by).is_none() {
            return Err(StoreError::MissingReference("user", printed_by));
        }

        let mut touched = 0;
        for ticket in state.tickets.iter_mut() {
            if ticket.prepared_pdf_id.map_or(false, |id| pdf_ids.contains(&id)) {
                ticket.printed_by = Some(printed_by);
                ticket.archived_date = Some(at);
                touched += 1;
            }
        }

        Ok(touched)
    }

    async fn insert_pdf(&self, data: &[u8]) -> StoreResult<i64> {
        let mut state = self.state.write().await;
        let id = state.next_id();
        state.pdfs.push(PreparedPdf {
            id,
            data: data.to_vec(),
            created_date: Utc::now(),
        });

        Ok(id)
    }

    async fn fetch_pdf(&self, id: i64) -> StoreResult<Option<PreparedPdf>> {
        let state = self.state.read().await;

        Ok(state.pdfs.iter().find(|pdf| pdf.id == id).cloned())
    }

    async fn fetch_pdfs(&self, ids: &[i64]) -> StoreResult<Vec<PreparedPdf>> {
        let state = self.state.read().await;
        let pdfs = state
            .pdfs
            .iter()
            .filter(|pdf| ids.contains(&pdf.id))
            .cloned()
            .collect();

        Ok(in_requested_order(ids, pdfs))
    }

    async fn fetch_location(&self, id: i64) -> StoreResult<Option<Location>> {
        Ok(self.state.read().await.location(id).cloned())
    }

    async fn fetch_locations(&self) -> StoreResult<Vec<Location>> {
        let mut locations = self.state.read().await.locations.clone();
        locations.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Ok(locations)
    }

    async fn fetch_regions(&self) -> StoreResult<Vec<Region>> {
        let mut regions = self.state.read().await.regions.clone();
        regions.sort_by_key(|region| region.id);

        Ok(regions)
    }

    async fn fetch_user_by_authorization_id(
        &self,
        authorization_id: &str,
    ) -> StoreResult<Option<User>> {
        let state = self.state.read().await;

        Ok(state
            .users
            .iter()
            .find(|user| user.authorization_id == authorization_id)
            .cloned())
    }

    async fn upsert_demo_user(&self, authorization_id: &str) -> StoreResult<Option<User>> {
        let mut state = self.state.write().await;

        if let Some(user) = state
            .users
            .iter()
            .find(|user| user.authorization_id == authorization_id)
        {
            return Ok(user.is_demo.then(|| user.clone()));
        }

        let user = User {
            id: state.next_id(),
            authorization_id: authorization_id.to_string(),
            email: None,
            first_name: Some("Demo".into()),
            last_name: Some("User".into()),
            accepted_terms_at: None,
            is_demo: true,
        };
        state.users.push(user.clone());

        Ok(Some(user))
    }

    async fn accept_terms(&self, user_id: i64, at: DateTime<Utc>) -> StoreResult<()> {
        let mut state = self.state.write().await;

        if let Some(user) = state.users.iter_mut().find(|user| user.id == user_id) {
            user.accepted_terms_at = Some(at);
        }

        Ok(())
    }
}
