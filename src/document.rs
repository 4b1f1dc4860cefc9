//! Vehicle detail documents and the typed view over the fields we read.
//!
//! The raw JSON is kept untouched for snapshots. Two typed views read only the
//! known paths: [`Overview`] is read for every vehicle (gallery and sale
//! status), [`Listing`] only for vehicles that get a row. Required paths fail
//! the run when absent, optional ones come back as `None`.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Number, Value};
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs;
use std::path::{Path, PathBuf};

/// A fetched vehicle-details response. Never mutated after the fetch.
#[derive(Debug, Clone)]
pub struct VehicleDocument {
    pub id: String,
    pub raw: Value,
}

impl VehicleDocument {
    pub fn new(id: impl Into<String>, raw: Value) -> Self {
        Self { id: id.into(), raw }
    }

    /// Extracts the [`Overview`] needed for aggregation and eligibility.
    ///
    /// # Errors
    ///
    /// Returns an error naming the vehicle if the gallery or purchase type is
    /// missing.
    pub fn overview(&self) -> Result<Overview> {
        Overview::deserialize(&self.raw)
            .with_context(|| format!("vehicle {}: unexpected document shape", self.id))
    }

    /// Extracts the typed [`Listing`] view used to build a row.
    ///
    /// # Errors
    ///
    /// Returns an error naming the vehicle if a required path is missing or
    /// has the wrong type.
    pub fn listing(&self) -> Result<Listing> {
        Listing::deserialize(&self.raw)
            .with_context(|| format!("vehicle {}: unexpected document shape", self.id))
    }

    /// Writes the document to `{dir}/{id}.json` with four-space indentation,
    /// replacing any earlier snapshot.
    pub fn write_snapshot(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create snapshot dir {}", dir.display()))?;

        let mut buf = Vec::new();
        let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        serde::Serialize::serialize(&self.raw, &mut ser)?;

        let path = dir.join(format!("{}.json", self.id));
        fs::write(&path, buf)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
        Ok(path)
    }
}

/// What every fetched vehicle must carry, eligible or not.
#[derive(Debug, Clone, Deserialize)]
pub struct Overview {
    pub header: OverviewHeader,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewHeader {
    pub purchase_type: String,
    /// Absent or null counts as not a rental.
    #[serde(default)]
    pub is_rental: Option<bool>,
    pub gallery: Gallery,
}

impl OverviewHeader {
    pub fn is_rental(&self) -> bool {
        self.is_rental.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub header: Header,
    pub details: Details,
    pub vdp_highlights: Vec<Highlight>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    // Copied into the table as-is, whatever their JSON type.
    pub year: Value,
    pub trim: Value,
    pub mileage: Value,
    pub kbb_value: Value,

    pub price: Number,
    pub location: Location,
    pub gallery: Gallery,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub city: String,
    pub state_abbreviation: String,
}

impl Location {
    /// `"{city}, {state}"`, e.g. `"Phoenix, AZ"`.
    pub fn display(&self) -> String {
        format!("{}, {}", self.city, self.state_abbreviation)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gallery {
    pub spinner_data: SpinnerData,
    pub hotspots: Vec<Hotspot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpinnerData {
    pub features: Vec<Feature>,
}

/// An equipment feature from the gallery feature list.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub imperfection_level: Option<Value>,
}

impl Hotspot {
    pub const IMPERFECTION: &'static str = "imperfection";

    pub fn is_imperfection(&self) -> bool {
        self.kind == Self::IMPERFECTION
    }

    pub fn title(&self) -> Result<&str> {
        self.title
            .as_deref()
            .context("imperfection hotspot has no title")
    }

    /// Column name for this imperfection: the title, suffixed with the level when present.
    pub fn attribute(&self) -> Result<String> {
        let title = self.title()?;
        Ok(match &self.imperfection_level {
            None | Some(Value::Null) => title.to_string(),
            Some(Value::String(level)) => format!("{title} {level}"),
            Some(Value::Bool(true)) => format!("{title} True"),
            Some(Value::Bool(false)) => format!("{title} False"),
            Some(level) => format!("{title} {level}"),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Details {
    pub basics: Basics,
}

/// Optional basics; any of them may be missing for older listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Basics {
    pub msrp: Option<Number>,
    pub vin: Option<Value>,
    pub exterior_color: Option<Value>,
    pub interior_color: Option<Value>,
    pub engine_description: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Highlight {
    pub name: String,
}


#[cfg(test)]
mod tests {
    use super::fixtures::sample_raw;
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_listing_reads_known_paths() {
        let doc = VehicleDocument::new("1", sample_raw());
        let listing = doc.listing().unwrap();

        assert_eq!(listing.header.year, json!(2021));
        assert_eq!(listing.header.price.as_f64(), Some(22375.0));
        assert_eq!(listing.header.location.display(), "Phoenix, AZ");
        assert_eq!(listing.header.gallery.spinner_data.features.len(), 2);
        assert_eq!(listing.details.basics.msrp, Some(Number::from(25000)));
        assert_eq!(listing.vdp_highlights[1].name, "One Owner");
    }

    #[test]
    fn test_listing_tolerates_missing_basics_fields() {
        let mut raw = sample_raw();
        raw["details"]["basics"] = json!({});
        let listing = VehicleDocument::new("1", raw).listing().unwrap();

        assert!(listing.details.basics.msrp.is_none());
        assert!(listing.details.basics.vin.is_none());
    }

    #[test]
    fn test_listing_missing_header_field_is_error() {
        let mut raw = sample_raw();
        raw["header"].as_object_mut().unwrap().remove("trim");
        let err = VehicleDocument::new("42", raw).listing().unwrap_err();

        assert!(err.to_string().contains("vehicle 42"));
    }

    #[test]
    fn test_hotspot_attribute_suffixes_level() {
        let listing = VehicleDocument::new("1", sample_raw()).listing().unwrap();
        let hotspots = &listing.header.gallery.hotspots;

        assert_eq!(hotspots[0].attribute().unwrap(), "Scratch 2");
        assert_eq!(hotspots[1].attribute().unwrap(), "Dent");
        assert!(!hotspots[2].is_imperfection());
    }

    #[test]
    fn test_hotspot_string_level_is_unquoted() {
        let hotspot: Hotspot = serde_json::from_value(
            json!({"type": "imperfection", "title": "Chip", "imperfectionLevel": "Minor"}),
        )
        .unwrap();

        assert_eq!(hotspot.attribute().unwrap(), "Chip Minor");
    }

    #[test]
    fn test_hotspot_bool_level_is_capitalized() {
        let hotspot: Hotspot = serde_json::from_value(
            json!({"type": "imperfection", "title": "Dent", "imperfectionLevel": true}),
        )
        .unwrap();

        assert_eq!(hotspot.attribute().unwrap(), "Dent True");
    }

    #[test]
    fn test_overview_needs_only_status_and_gallery() {
        let raw = json!({
            "header": {
                "purchaseType": "Sold",
                "isRental": null,
                "gallery": {"spinnerData": {"features": []}, "hotspots": []}
            }
        });
        let doc = VehicleDocument::new("2002", raw);

        let overview = doc.overview().unwrap();
        assert_eq!(overview.header.purchase_type, "Sold");
        assert!(!overview.header.is_rental());
        assert!(doc.listing().is_err());
    }

    #[test]
    fn test_overview_missing_gallery_is_error() {
        let mut raw = sample_raw();
        raw["header"].as_object_mut().unwrap().remove("gallery");
        let err = VehicleDocument::new("5", raw).overview().unwrap_err();

        assert!(err.to_string().contains("vehicle 5"));
    }

    #[test]
    fn test_write_snapshot_overwrites() {
        let dir = TempDir::new().unwrap();
        let snapshots = dir.path().join("json");

        VehicleDocument::new("7", json!({"old": true}))
            .write_snapshot(&snapshots)
            .unwrap();
        let path = VehicleDocument::new("7", json!({"city": "Zürich"}))
            .write_snapshot(&snapshots)
            .unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content, "{\n    \"city\": \"Zürich\"\n}");
    }
}
