use chrono::{DateTime, NaiveDate, Utc};

use serde::Serialize;

/// Stored dispute submission
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct TicketResponse {
    pub id: i64,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    /// Always upper-case
    pub ticket_number: String,
    pub ticket_date: NaiveDate,
    #[serde(rename = "hearing_location")]
    pub hearing_location_id: i64,
    pub hearing_attendance: String,
    pub dispute_type: String,
    pub created_date: DateTime<Utc>,
    /// Stamped when the PDF is prepared, not when staff print it
    pub printed_date: Option<DateTime<Utc>>,
    /// `None` while the submission sits in the "new" bucket
    pub printed_by: Option<i64>,
    /// Stamped when staff mark the submission printed
    pub archived_date: Option<DateTime<Utc>>,
    pub emailed_date: Option<DateTime<Utc>>,
    #[serde(rename = "prepared_pdf")]
    pub prepared_pdf_id: Option<i64>,
    pub pdf_filename: Option<String>,
}

impl TicketResponse {
    pub fn is_printed(&self) -> bool {
        self.printed_by.is_some()
    }
}

/// Listing row: a submission joined with its location, region and printer
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct TicketListing {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub ticket: TicketResponse,
    #[serde(rename = "hearing_location__name")]
    pub hearing_location_name: String,
    pub region_id: i64,
    #[serde(rename = "printed_by__name")]
    pub printed_by_name: Option<String>,
    #[serde(skip)]
    pub printed_by_first_name: Option<String>,
    #[serde(skip)]
    pub printed_by_last_name: Option<String>,
}

/// Opaque stored PDF
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PreparedPdf {
    pub id: i64,
    pub data: Vec<u8>,
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Region {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Location {
    pub id: i64,
    pub name: String,
    #[serde(rename = "region")]
    pub region_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    /// Identity assigned by the external login provider, or the demo login id
    pub authorization_id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub accepted_terms_at: Option<DateTime<Utc>>,
    pub is_demo: bool,
}

impl User {
    /// "First Last", as matched by the `printed_by__name` filter
    pub fn display_name(&self) -> Option<String> {
        display_name(self.first_name.as_deref(), self.last_name.as_deref())
    }
}

pub(crate) fn display_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let name = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    (!name.is_empty()).then_some(name)
}

/// Unprinted/printed submission count for one region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionCount {
    pub id: i64,
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountTotal {
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketCount {
    pub by_region: Vec<RegionCount>,
    pub total: CountTotal,
}

/// Counts for the "new" (unprinted) and "archive" (printed) buckets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketCounts {
    pub new_count: BucketCount,
    pub archive_count: BucketCount,
}

impl TicketCounts {
    /// Assemble both buckets from per-region `(region, new, archived)` rows and totals
    pub fn from_regions(
        regions: impl IntoIterator<Item = (Region, i64, i64)>,
        new_total: i64,
        archive_total: i64,
    ) -> Self {
        let (new_by_region, archive_by_region): (Vec<_>, Vec<_>) = regions
            .into_iter()
            .map(|(region, new, archived)| {
                (
                    RegionCount {
                        id: region.id,
                        name: region.name.clone(),
                        count: new,
                    },
                    RegionCount {
                        id: region.id,
                        name: region.name,
                        count: archived,
                    },
                )
            })
            .unzip();

        Self {
            new_count: BucketCount {
                by_region: new_by_region,
                total: CountTotal { count: new_total },
            },
            archive_count: BucketCount {
                by_region: archive_by_region,
                total: CountTotal {
                    count: archive_total,
                },
            },
        }
    }
}

/// One page of a listing, with the count of every matching row
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub count: i64,
    pub results: Vec<T>,
}
