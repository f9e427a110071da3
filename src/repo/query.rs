use std::cmp::Ordering;
use std::str::FromStr;

use serde::Deserialize;

use crate::repo::TicketListing;

/// Raw listing query-string parameters
#[derive(Debug, Default, Deserialize)]
pub struct TicketListParams {
    pub region: Option<String>,
    pub hearing_attendance: Option<String>,
    pub dispute_type: Option<String>,
    pub is_printed: Option<String>,
    pub ticket_number: Option<String>,
    #[serde(rename = "hearing_location__name")]
    pub hearing_location_name: Option<String>,
    #[serde(rename = "printed_by__name")]
    pub printed_by_name: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// Page size bounds applied to listing requests
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default: i64,
    pub max: i64,
}

/// Exact-match filters, combined with AND. `None` means "don't filter".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketFilter {
    pub region: Option<i64>,
    pub hearing_attendance: Option<String>,
    pub dispute_type: Option<String>,
    pub is_printed: Option<bool>,
    pub ticket_number: Option<String>,
    pub hearing_location_name: Option<String>,
    pub printed_by_name: Option<String>,
}

/// Sortable listing columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingKey {
    CreatedDate,
    ArchivedDate,
    PrintedDate,
    TicketDate,
    HearingLocationName,
    TicketNumber,
    DisputeType,
    LastName,
    FirstName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderingTerm {
    pub key: OrderingKey,
    pub descending: bool,
}

/// A fully parsed listing request
#[derive(Debug, Clone, PartialEq)]
pub struct TicketQuery {
    pub filter: TicketFilter,
    /// Lower-cased search terms; every term has to match some searchable field
    pub search: Vec<String>,
    pub ordering: Vec<OrderingTerm>,
    pub limit: i64,
    pub offset: i64,
}

impl FromStr for OrderingKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "created_date" => Ok(Self::CreatedDate),
            "archived_date" => Ok(Self::ArchivedDate),
            "printed_date" => Ok(Self::PrintedDate),
            "ticket_date" => Ok(Self::TicketDate),
            "hearing_location__name" => Ok(Self::HearingLocationName),
            "ticket_number" => Ok(Self::TicketNumber),
            "dispute_type" => Ok(Self::DisputeType),
            "last_name" => Ok(Self::LastName),
            "first_name" => Ok(Self::FirstName),
            other => Err(format!("{} is not an ordering field", other)),
        }
    }
}

impl OrderingKey {
    /// Column expression for the listing SQL. Only ever one of these fixed strings.
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedDate => "t.created_date",
            Self::ArchivedDate => "t.archived_date",
            Self::PrintedDate => "t.printed_date",
            Self::TicketDate => "t.ticket_date",
            Self::HearingLocationName => "l.name",
            Self::TicketNumber => "t.ticket_number",
            Self::DisputeType => "t.dispute_type",
            Self::LastName => "t.last_name",
            Self::FirstName => "t.first_name",
        }
    }

    fn compare(&self, a: &TicketListing, b: &TicketListing) -> Ordering {
        let (a_t, b_t) = (&a.ticket, &b.ticket);
        match self {
            Self::CreatedDate => a_t.created_date.cmp(&b_t.created_date),
            Self::ArchivedDate => nulls_last(&a_t.archived_date, &b_t.archived_date),
            Self::PrintedDate => nulls_last(&a_t.printed_date, &b_t.printed_date),
            Self::TicketDate => a_t.ticket_date.cmp(&b_t.ticket_date),
            Self::HearingLocationName => a.hearing_location_name.cmp(&b.hearing_location_name),
            Self::TicketNumber => a_t.ticket_number.cmp(&b_t.ticket_number),
            Self::DisputeType => a_t.dispute_type.cmp(&b_t.dispute_type),
            Self::LastName => a_t.last_name.cmp(&b_t.last_name),
            Self::FirstName => a_t.first_name.cmp(&b_t.first_name),
        }
    }
}

// Postgres puts NULL after every value in ascending order
fn nulls_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
    }
}

pub const DEFAULT_ORDERING: [OrderingTerm; 3] = [
    OrderingTerm {
        key: OrderingKey::HearingLocationName,
        descending: false,
    },
    OrderingTerm {
        key: OrderingKey::CreatedDate,
        descending: false,
    },
    OrderingTerm {
        key: OrderingKey::LastName,
        descending: false,
    },
];

impl TicketQuery {
    /// Parse query-string parameters. Empty values are ignored, unknown ordering
    /// fields are dropped, malformed numbers and booleans are errors.
    pub fn from_params(params: &TicketListParams, limits: PageLimits) -> Result<Self, String> {
        let filter = TicketFilter {
            region: parse_opt(&params.region, "region")?,
            hearing_attendance: non_empty(&params.hearing_attendance),
            dispute_type: non_empty(&params.dispute_type),
            is_printed: parse_bool(&params.is_printed)?,
            ticket_number: non_empty(&params.ticket_number),
            hearing_location_name: non_empty(&params.hearing_location_name),
            printed_by_name: non_empty(&params.printed_by_name),
        };

        let search = params
            .search
            .as_deref()
            .map(search_terms)
            .unwrap_or_default();

        let ordering = params
            .ordering
            .as_deref()
            .map(parse_ordering)
            .filter(|terms| !terms.is_empty())
            .unwrap_or_else(|| DEFAULT_ORDERING.to_vec());

        let limit = parse_opt::<i64>(&params.limit, "limit")?
            .filter(|limit| *limit > 0)
            .unwrap_or(limits.default)
            .min(limits.max);
        // Keeps `offset + limit` representable
        let offset = parse_opt::<i64>(&params.offset, "offset")?
            .unwrap_or(0)
            .clamp(0, i64::MAX.saturating_sub(limit));

        Ok(Self {
            filter,
            search,
            ordering,
            limit,
            offset,
        })
    }

    /// In-process equivalent of the SQL WHERE clause
    pub fn matches(&self, row: &TicketListing) -> bool {
        self.filter.matches(row) && self.search.iter().all(|term| search_matches(row, term))
    }

    /// In-process equivalent of the SQL ORDER BY clause, ties broken by id
    pub fn compare(&self, a: &TicketListing, b: &TicketListing) -> Ordering {
        self.ordering
            .iter()
            .map(|term| {
                let ordering = term.key.compare(a, b);
                if term.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.ticket.id.cmp(&b.ticket.id))
    }
}

impl TicketFilter {
    fn matches(&self, row: &TicketListing) -> bool {
        let ticket = &row.ticket;

        self.region.map_or(true, |region| row.region_id == region)
            && eq_opt(&self.hearing_attendance, &ticket.hearing_attendance)
            && eq_opt(&self.dispute_type, &ticket.dispute_type)
            && self
                .is_printed
                .map_or(true, |printed| ticket.is_printed() == printed)
            && eq_opt(&self.ticket_number, &ticket.ticket_number)
            && eq_opt(&self.hearing_location_name, &row.hearing_location_name)
            && self.printed_by_name.as_ref().map_or(true, |name| {
                row.printed_by_name.as_deref() == Some(name.as_str())
            })
    }
}

fn eq_opt(expected: &Option<String>, actual: &str) -> bool {
    expected.as_deref().map_or(true, |expected| expected == actual)
}

/// Created date as searched, `YYYY-MM-DD HH:MM:SS` in UTC
pub const CREATED_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn search_matches(row: &TicketListing, term: &str) -> bool {
    let ticket = &row.ticket;
    let created = ticket.created_date.format(CREATED_DATE_FORMAT).to_string();

    let fields = [
        Some(ticket.first_name.as_str()),
        ticket.middle_name.as_deref(),
        Some(ticket.last_name.as_str()),
        Some(ticket.ticket_number.as_str()),
        Some(row.hearing_location_name.as_str()),
        Some(created.as_str()),
        row.printed_by_last_name.as_deref(),
        row.printed_by_first_name.as_deref(),
    ];

    let matched = fields
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(term));
    matched
}

/// Split free text into lower-cased terms on whitespace and commas
pub fn search_terms(search: &str) -> Vec<String> {
    search
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Parse `a,-b` style ordering. Unknown fields are skipped.
pub fn parse_ordering(ordering: &str) -> Vec<OrderingTerm> {
    ordering
        .split(',')
        .map(str::trim)
        .filter_map(|field| {
            let (descending, field) = match field.strip_prefix('-') {
                Some(field) => (true, field),
                None => (false, field),
            };
            field
                .parse::<OrderingKey>()
                .ok()
                .map(|key| OrderingTerm { key, descending })
        })
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn parse_opt<T: FromStr>(value: &Option<String>, name: &str) -> Result<Option<T>, String> {
    non_empty(value)
        .map(|v| v.parse::<T>().map_err(|_| format!("Invalid {}: {}", name, v)))
        .transpose()
}

fn parse_bool(value: &Option<String>) -> Result<Option<bool>, String> {
    non_empty(value)
        .map(|v| match v.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(format!("Invalid is_printed: {}", v)),
        })
        .transpose()
}
