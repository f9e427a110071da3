use async_trait::async_trait;

use chrono::{DateTime, Utc};

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::domain::NewTicketResponse;
use crate::repo::query::TicketQuery;
use crate::repo::{
    in_requested_order, Location, Page, PreparedPdf, Region, Store, StoreResult, TicketCounts,
    TicketListing, TicketResponse, User,
};

const TICKET_COLUMNS: &str = "id, first_name, middle_name, last_name, email, ticket_number, \
    ticket_date, hearing_location_id, hearing_attendance, dispute_type, created_date, \
    printed_date, printed_by, archived_date, emailed_date, prepared_pdf_id, pdf_filename";

const USER_COLUMNS: &str =
    "id, authorization_id, email, first_name, last_name, accepted_terms_at, is_demo";

const LISTING_FROM: &str = " from ticket_responses t \
    join locations l on l.id = t.hearing_location_id \
    left join users u on u.id = t.printed_by";

const PRINTED_BY_NAME: &str =
    "nullif(concat_ws(' ', nullif(trim(u.first_name), ''), nullif(trim(u.last_name), '')), '')";

/// Same text the in-memory store searches, see [`crate::repo::query::CREATED_DATE_FORMAT`]
const CREATED_DATE_TEXT: &str = "to_char(t.created_date at time zone 'UTC', 'YYYY-MM-DD HH24:MI:SS')";

const SEARCH_COLUMNS: [&str; 8] = [
    "t.first_name",
    "t.middle_name",
    "t.last_name",
    "t.ticket_number",
    "l.name",
    CREATED_DATE_TEXT,
    "u.last_name",
    "u.first_name",
];

/// PostgreSQL-backed [`Store`]
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// The page query: listing columns, filters, ordering and paging for `query`
fn listing_query(query: &TicketQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "select t.id, t.first_name, t.middle_name, t.last_name, t.email, \
        t.ticket_number, t.ticket_date, t.hearing_location_id, t.hearing_attendance, \
        t.dispute_type, t.created_date, t.printed_date, t.printed_by, t.archived_date, \
        t.emailed_date, t.prepared_pdf_id, t.pdf_filename, \
        l.name as hearing_location_name, l.region_id, ",
    );
    builder
        .push(PRINTED_BY_NAME)
        .push(" as printed_by_name, u.first_name as printed_by_first_name, u.last_name as printed_by_last_name")
        .push(LISTING_FROM);
    push_conditions(&mut builder, query);
    push_ordering(&mut builder, query);
    builder
        .push(" limit ")
        .push_bind(query.limit)
        .push(" offset ")
        .push_bind(query.offset);

    builder
}

/// Append the listing WHERE clause for `query`
fn push_conditions(builder: &mut QueryBuilder<'_, Postgres>, query: &TicketQuery) {
    let filter = &query.filter;

    builder.push(" where true");

    if let Some(region) = filter.region {
        builder.push(" and l.region_id = ").push_bind(region);
    }
    if let Some(attendance) = &filter.hearing_attendance {
        builder
            .push(" and t.hearing_attendance = ")
            .push_bind(attendance.clone());
    }
    if let Some(dispute_type) = &filter.dispute_type {
        builder
            .push(" and t.dispute_type = ")
            .push_bind(dispute_type.clone());
    }
    match filter.is_printed {
        Some(true) => {
            builder.push(" and t.printed_by is not null");
        }
        Some(false) => {
            builder.push(" and t.printed_by is null");
        }
        None => {}
    }
    if let Some(ticket_number) = &filter.ticket_number {
        builder
            .push(" and t.ticket_number = ")
            .push_bind(ticket_number.clone());
    }
    if let Some(location_name) = &filter.hearing_location_name {
        builder
            .push(" and l.name = ")
            .push_bind(location_name.clone());
    }
    if let Some(printed_by_name) = &filter.printed_by_name {
        builder
            .push(" and ")
            .push(PRINTED_BY_NAME)
            .push(" = ")
            .push_bind(printed_by_name.clone());
    }

    for term in &query.search {
        let pattern = format!("%{}%", escape_like(term));

        builder.push(" and (");
        for (i, column) in SEARCH_COLUMNS.iter().enumerate() {
            if i > 0 {
                builder.push(" or ");
            }
            builder
                .push(*column)
                .push(" ilike ")
                .push_bind(pattern.clone());
        }
        builder.push(")");
    }
}

fn push_ordering(builder: &mut QueryBuilder<'_, Postgres>, query: &TicketQuery) {
    builder.push(" order by ");
    for term in &query.ordering {
        let direction = if term.descending { "desc" } else { "asc" };
        builder
            .push(term.key.column())
            .push(" ")
            .push(direction)
            .push(", ");
    }
    builder.push("t.id asc");
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[derive(Debug, sqlx::FromRow)]
struct RegionBucketRow {
    id: i64,
    name: String,
    new_count: i64,
    archive_count: i64,
}

#[async_trait]
impl Store for PgStore {
    #[tracing::instrument(name = "Insert ticket response", skip(self, new_ticket))]
    async fn insert_ticket(&self, new_ticket: &NewTicketResponse) -> StoreResult<TicketResponse> {
        let sql = format!(
            "insert into ticket_responses(first_name, middle_name, last_name, email, \
             ticket_number, ticket_date, hearing_location_id, hearing_attendance, dispute_type) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9) returning {}",
            TICKET_COLUMNS
        );

        let ticket = sqlx::query_as::<_, TicketResponse>(&sql)
            .bind(new_ticket.first_name.as_ref())
            .bind(new_ticket.middle_name.as_deref())
            .bind(new_ticket.last_name.as_ref())
            .bind(new_ticket.email.as_ref())
            .bind(new_ticket.ticket_number.as_ref())
            .bind(new_ticket.ticket_date)
            .bind(new_ticket.hearing_location_id)
            .bind(&new_ticket.hearing_attendance)
            .bind(&new_ticket.dispute_type)
            .fetch_one(&self.pool)
            .await?;

        Ok(ticket)
    }

    #[tracing::instrument(name = "Update ticket response", skip(self, ticket), fields(id = ticket.id))]
    async fn update_ticket(&self, ticket: &TicketResponse) -> StoreResult<()> {
        sqlx::query(
            "update ticket_responses set printed_date=$2, emailed_date=$3, prepared_pdf_id=$4, \
             pdf_filename=$5 where id=$1",
        )
        .bind(ticket.id)
        .bind(ticket.printed_date)
        .bind(ticket.emailed_date)
        .bind(ticket.prepared_pdf_id)
        .bind(ticket.pdf_filename.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(name = "Fetch ticket response by PDF", skip(self))]
    async fn fetch_ticket_by_pdf(&self, pdf_id: i64) -> StoreResult<Option<TicketResponse>> {
        let sql = format!(
            "select {} from ticket_responses where prepared_pdf_id=$1",
            TICKET_COLUMNS
        );

        let ticket = sqlx::query_as::<_, TicketResponse>(&sql)
            .bind(pdf_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ticket)
    }

    #[tracing::instrument(name = "List ticket responses", skip(self))]
    async fn list_tickets(&self, query: &TicketQuery) -> StoreResult<Page<TicketListing>> {
        let mut count_builder = QueryBuilder::<Postgres>::new("select count(*)");
        count_builder.push(LISTING_FROM);
        push_conditions(&mut count_builder, query);

        let count: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder = listing_query(query);
        let results = builder
            .build_query_as::<TicketListing>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page { count, results })
    }

    #[tracing::instrument(name = "Count ticket responses", skip(self))]
    async fn count_tickets(&self) -> StoreResult<TicketCounts> {
        let rows = sqlx::query_as::<_, RegionBucketRow>(
            "select r.id, r.name, \
                 count(t.id) filter (where t.printed_by is null) as new_count, \
                 count(t.id) filter (where t.printed_by is not null) as archive_count \
             from regions r \
             left join locations l on l.region_id = r.id \
             left join ticket_responses t on t.hearing_location_id = l.id \
             group by r.id, r.name \
             order by r.id",
        )
        .fetch_all(&self.pool)
        .await?;

        let (new_total, archive_total) = sqlx::query_as::<_, (i64, i64)>(
            "select count(*) filter (where printed_by is null), \
                    count(*) filter (where printed_by is not null) \
             from ticket_responses",
        )
        .fetch_one(&self.pool)
        .await?;

        let regions = rows.into_iter().map(|row| {
            let region = Region {
                id: row.id,
                name: row.name,
            };
            (region, row.new_count, row.archive_count)
        });

        Ok(TicketCounts::from_regions(regions, new_total, archive_total))
    }

    #[tracing::instrument(name = "Mark ticket responses printed", skip(self))]
    async fn mark_printed(
        &self,
        pdf_ids: &[i64],
        printed_by: i64,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            "update ticket_responses set printed_by=$1, archived_date=$2 \
             where prepared_pdf_id = any($3)",
        )
        .bind(printed_by)
        .bind(at)
        .bind(pdf_ids)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(name = "Insert prepared PDF", skip(self, data), fields(len = data.len()))]
    async fn insert_pdf(&self, data: &[u8]) -> StoreResult<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            "insert into prepared_pdfs(data) values ($1) returning id",
        )
        .bind(data)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    #[tracing::instrument(name = "Fetch prepared PDF", skip(self))]
    async fn fetch_pdf(&self, id: i64) -> StoreResult<Option<PreparedPdf>> {
        let pdf = sqlx::query_as::<_, PreparedPdf>(
            "select id, data, created_date from prepared_pdfs where id=$1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(pdf)
    }

    #[tracing::instrument(name = "Fetch prepared PDFs", skip(self))]
    async fn fetch_pdfs(&self, ids: &[i64]) -> StoreResult<Vec<PreparedPdf>> {
        let pdfs = sqlx::query_as::<_, PreparedPdf>(
            "select id, data, created_date from prepared_pdfs where id = any($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(in_requested_order(ids, pdfs))
    }

    async fn fetch_location(&self, id: i64) -> StoreResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            "select id, name, region_id from locations where id=$1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    #[tracing::instrument(name = "Fetch all locations", skip(self))]
    async fn fetch_locations(&self) -> StoreResult<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>(
            "select id, name, region_id from locations order by name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    #[tracing::instrument(name = "Fetch all regions", skip(self))]
    async fn fetch_regions(&self) -> StoreResult<Vec<Region>> {
        let regions = sqlx::query_as::<_, Region>("select id, name from regions order by id")
            .fetch_all(&self.pool)
            .await?;

        Ok(regions)
    }

    async fn fetch_user_by_authorization_id(
        &self,
        authorization_id: &str,
    ) -> StoreResult<Option<User>> {
        let sql = format!("select {} from users where authorization_id=$1", USER_COLUMNS);

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(authorization_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    #[tracing::instrument(name = "Upsert demo user", skip(self))]
    async fn upsert_demo_user(&self, authorization_id: &str) -> StoreResult<Option<User>> {
        // The no-op update makes `returning` yield the existing demo row
        let sql = format!(
            "insert into users(authorization_id, first_name, last_name, is_demo) \
             values ($1, 'Demo', 'User', true) \
             on conflict (authorization_id) do update set is_demo = users.is_demo \
             where users.is_demo \
             returning {}",
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(authorization_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    #[tracing::instrument(name = "Accept terms", skip(self))]
    async fn accept_terms(&self, user_id: i64, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("update users set accepted_terms_at=$2 where id=$1")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
