//! Builds one flat comparison row per eligible vehicle.

use anyhow::Result;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use crate::document::{Feature, Listing, Overview};
use crate::features::{ImperfectionTally, KEYS_COLUMN, TOTAL_COLUMN};

/// The only purchase status that makes a vehicle worth comparing.
pub const PURCHASABLE: &str = "Purchasable";

static FIRST_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid integer pattern"));

/// Why a fetched vehicle gets no row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    /// Sale pending or otherwise not for sale.
    NotPurchasable(String),
    Rental,
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exclusion::NotPurchasable(status) => write!(f, "purchase type is {status}"),
            Exclusion::Rental => write!(f, "former rental"),
        }
    }
}

/// Returns the reason a vehicle should be left out of the table, if any.
pub fn exclusion(overview: &Overview) -> Option<Exclusion> {
    let header = &overview.header;
    if header.purchase_type != PURCHASABLE {
        return Some(Exclusion::NotPurchasable(header.purchase_type.clone()));
    }
    if header.is_rental() {
        return Some(Exclusion::Rental);
    }
    None
}

/// One output row: column name to scalar, in the order columns were first set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRecord {
    values: Map<String, Value>,
}

impl ResultRecord {
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Adds one to an integer column, starting from zero if it was never set.
    pub fn increment(&mut self, column: &str) {
        let count = self.values.get(column).and_then(Value::as_u64).unwrap_or(0);
        self.values.insert(column.to_string(), Value::from(count + 1));
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Fleet-wide inputs shared by every row.
#[derive(Debug, Clone, Copy)]
pub struct RecordContext<'a> {
    pub interesting: &'a BTreeSet<String>,
    pub uninteresting: &'a [String],
    /// Feature columns every row starts with, all null.
    pub template: &'a [String],
    pub imperfections: &'a ImperfectionTally,
}

/// Assembles the row for one eligible vehicle.
///
/// # Errors
///
/// Fails if an imperfection hotspot has no title.
pub fn build_record(url: &str, listing: &Listing, ctx: &RecordContext<'_>) -> Result<ResultRecord> {
    let mut record = ResultRecord::default();
    record.set("url", url);

    add_basics(&mut record, listing);
    add_features(&mut record, listing, ctx);
    add_imperfections(&mut record, listing, ctx)?;

    Ok(record)
}

fn add_basics(record: &mut ResultRecord, listing: &Listing) {
    let header = &listing.header;
    let basics = &listing.details.basics;

    record.set("year", header.year.clone());
    record.set("trim", header.trim.clone());
    record.set("mileage", header.mileage.clone());
    record.set("price", header.price.clone());
    record.set("kbbValue", header.kbb_value.clone());
    record.set("location", header.location.display());

    if let Some(msrp) = &basics.msrp {
        record.set("msrp", msrp.clone());
    }
    let optional = [
        ("vin", &basics.vin),
        ("exteriorColor", &basics.exterior_color),
        ("interiorColor", &basics.interior_color),
        ("engineDescription", &basics.engine_description),
    ];
    for (column, value) in optional {
        if let Some(value) = value {
            record.set(column, value.clone());
        }
    }

    let discount = basics
        .msrp
        .as_ref()
        .and_then(|msrp| discount(msrp, &header.price))
        .map_or(Value::Null, Value::from);
    record.set("discount", discount);
}

/// `round(msrp - price)`, rounding halves to even.
pub fn discount(msrp: &Number, price: &Number) -> Option<i64> {
    let diff = msrp.as_f64()? - price.as_f64()?;
    Some(diff.round_ties_even() as i64)
}

fn add_features(record: &mut ResultRecord, listing: &Listing, ctx: &RecordContext<'_>) {
    for column in ctx.template {
        record.set(column.as_str(), Value::Null);
    }

    for feature in &listing.header.gallery.spinner_data.features {
        if ctx.interesting.contains(&feature.title) {
            record.set(feature.title.as_str(), true);
        }
        if feature.title == KEYS_COLUMN {
            if let Some(count) = key_count(feature) {
                record.set(KEYS_COLUMN, count);
            }
        }
    }

    for highlight in &listing.vdp_highlights {
        if !ctx.uninteresting.contains(&highlight.name) {
            record.set(highlight.name.as_str(), true);
        }
    }
}

/// First integer in the feature description, e.g. 2 for "comes with 2 keys".
pub fn key_count(feature: &Feature) -> Option<u64> {
    let description = feature.description.as_deref()?;
    FIRST_INTEGER.find(description)?.as_str().parse().ok()
}

fn add_imperfections(
    record: &mut ResultRecord,
    listing: &Listing,
    ctx: &RecordContext<'_>,
) -> Result<()> {
    for column in ctx.imperfections.columns() {
        record.set(column, 0);
    }

    for hotspot in listing.header.gallery.hotspots.iter().filter(|h| h.is_imperfection()) {
        let title = hotspot.title()?;
        if ctx.uninteresting.iter().any(|u| u == title) {
            continue;
        }
        record.increment(TOTAL_COLUMN);
        record.increment(&hotspot.attribute()?);
    }
    Ok(())
}
