//! End-to-end comparison run: fetch every vehicle once, then aggregate,
//! filter, build rows and write the table from the in-memory documents.
//!
//! Only the gallery and sale status are read from every vehicle; the fields a
//! row needs are read once a vehicle is known to be eligible.

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use crate::cache::ResponseCache;
use crate::config::RunConfig;
use crate::document::{Overview, VehicleDocument};
use crate::features::{FeatureCatalog, column_template, interesting_features};
use crate::fetch::HttpClient;
use crate::input::{dedup_ids, read_lines};
use crate::output::{ResultTable, log_record};
use crate::record::{RecordContext, build_record, exclusion};
use crate::vehicle::VehicleFetcher;

/// What a run did, for the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub fetched: usize,
    pub excluded: usize,
    pub rows_written: usize,
    pub output_path: PathBuf,
}

/// Runs a full comparison with `client` as the network transport.
#[tracing::instrument(skip_all, fields(ids = %config.ids_path.display(), output = %config.output_path.display()))]
pub async fn run<C: HttpClient>(config: &RunConfig, client: C) -> Result<RunSummary> {
    let vehicle_ids = dedup_ids(read_lines(&config.ids_path)?);
    let uninteresting = read_lines(&config.uninteresting_path)?;
    let priority = read_lines(&config.priority_path)?;
    info!(vehicles = vehicle_ids.len(), "Input lists loaded");

    let fetcher = VehicleFetcher::new(
        client,
        ResponseCache::new(&config.cache_dir, config.expire_after),
        config.endpoint.as_str(),
        &config.snapshot_dir,
    );

    let mut documents = Vec::with_capacity(vehicle_ids.len());
    for vehicle_id in &vehicle_ids {
        documents.push(fetcher.fetch(vehicle_id).await?);
    }

    let overviews = documents
        .iter()
        .map(|doc| doc.overview().map(|overview| (doc, overview)))
        .collect::<Result<Vec<(&VehicleDocument, Overview)>>>()?;

    let catalog = FeatureCatalog::aggregate(
        overviews
            .iter()
            .map(|(doc, overview)| (doc.id.as_str(), &overview.header.gallery)),
    )?;
    let common = catalog.common_features();
    let interesting = interesting_features(&catalog.all_features, &common, &uninteresting);
    let template = column_template(&priority, &interesting);
    info!(
        features = catalog.all_features.len(),
        common = common.len(),
        interesting = interesting.len(),
        imperfection_types = catalog.imperfections.len(),
        "Feature sets normalized"
    );

    let ctx = RecordContext {
        interesting: &interesting,
        uninteresting: &uninteresting,
        template: &template,
        imperfections: &catalog.imperfections,
    };

    let mut table = ResultTable::new();
    let mut excluded = 0;
    for (doc, overview) in &overviews {
        if let Some(reason) = exclusion(overview) {
            info!(vehicle_id = %doc.id, %reason, "Vehicle excluded");
            excluded += 1;
            continue;
        }

        let listing = doc.listing()?;
        let record = build_record(&config.listing_url(&doc.id), &listing, &ctx)?;
        log_record(&doc.id, &record);
        table.insert(doc.id.as_str(), record);
    }

    let rows_written = table.write_csv(&config.output_path)?;
    info!(rows_written, excluded, "Result table written");

    Ok(RunSummary {
        fetched: documents.len(),
        excluded,
        rows_written,
        output_path: config.output_path.clone(),
    })
}
