//! Feature aggregation across all fetched vehicles and the set arithmetic
//! that decides which features become comparison columns.

use anyhow::{Context, Result};
use std::collections::BTreeSet;

use crate::document::Gallery;

/// Column holding the parsed key count; always present in the template.
pub const KEYS_COLUMN: &str = "keys";
/// Column holding the total number of counted imperfections.
pub const TOTAL_COLUMN: &str = "total";

/// Imperfection titles never registered as tally columns.
///
/// The quotes are part of the literal, so this does not match a plain
/// `Tire Inflator Kit` title.
pub static IMPERFECTION_SKIP: &[&str] = &["\"Tire Inflator Kit\""];

/// Every imperfection attribute seen across the fleet, each starting at zero.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImperfectionTally {
    attributes: BTreeSet<String>,
}

impl ImperfectionTally {
    pub fn register(&mut self, attribute: String) {
        self.attributes.insert(attribute);
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.attributes.contains(attribute)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Tally columns in output order: [`TOTAL_COLUMN`] first, then each attribute.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        std::iter::once(TOTAL_COLUMN).chain(self.attributes.iter().map(String::as_str))
    }
}

/// Result of one pass over every fetched listing.
#[derive(Debug, Default)]
pub struct FeatureCatalog {
    /// Every feature title seen on any vehicle.
    pub all_features: BTreeSet<String>,
    /// Feature titles per vehicle, in fetch order.
    pub per_vehicle: Vec<(String, Vec<String>)>,
    pub imperfections: ImperfectionTally,
}

impl FeatureCatalog {
    /// Folds over `(vehicle_id, gallery)` pairs.
    ///
    /// # Errors
    ///
    /// Fails if an imperfection hotspot has no title.
    pub fn aggregate<'a, I>(galleries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a Gallery)>,
    {
        let mut catalog = FeatureCatalog::default();

        for (vehicle_id, gallery) in galleries {
            let titles: Vec<String> = gallery
                .spinner_data
                .features
                .iter()
                .map(|f| f.title.clone())
                .collect();
            catalog.all_features.extend(titles.iter().cloned());
            catalog.per_vehicle.push((vehicle_id.to_string(), titles));

            for hotspot in gallery.hotspots.iter().filter(|h| h.is_imperfection()) {
                let title = hotspot
                    .title()
                    .with_context(|| format!("vehicle {vehicle_id}"))?;
                if IMPERFECTION_SKIP.contains(&title) {
                    continue;
                }
                catalog.imperfections.register(hotspot.attribute()?);
            }
        }

        Ok(catalog)
    }

    pub fn common_features(&self) -> BTreeSet<String> {
        common_features(self.per_vehicle.iter().map(|(_, titles)| titles.as_slice()))
    }
}

/// Features present on every vehicle. No vehicles means no common features.
pub fn common_features<'a, I>(lists: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut lists = lists.into_iter();
    let Some(first) = lists.next() else {
        return BTreeSet::new();
    };

    let mut common: BTreeSet<String> = first.iter().cloned().collect();
    for list in lists {
        common.retain(|feature| list.contains(feature));
    }
    common
}

/// `all - common - uninteresting`.
pub fn interesting_features(
    all: &BTreeSet<String>,
    common: &BTreeSet<String>,
    uninteresting: &[String],
) -> BTreeSet<String> {
    all.iter()
        .filter(|f| !common.contains(*f) && !uninteresting.contains(*f))
        .cloned()
        .collect()
}

/// Feature columns in output order: prioritized features as listed, then
/// [`KEYS_COLUMN`], then the remaining interesting features.
pub fn column_template(priority: &[String], interesting: &BTreeSet<String>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::with_capacity(priority.len() + interesting.len() + 1);
    let tail = std::iter::once(KEYS_COLUMN.to_string()).chain(interesting.iter().cloned());

    for column in priority.iter().cloned().chain(tail) {
        if !columns.contains(&column) {
            columns.push(column);
        }
    }
    columns
}
