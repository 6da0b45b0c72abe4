//! Full pipeline: YAML configuration, event file, producer, JSON reports
//!
//! Uses the label list shipped in `data/` and a small engine that prefers
//! "top" for jets spread over many pixels and "QCD" for single-pixel jets.

use anyhow::Result;
use jet_image_tagging::producer::{ClientError, EventSource, PseudoAsyncClient, SyncClient};
use jet_image_tagging::{Constituent, Event, EventId, Jet, JetImageProducer, ProducerConfig};
use std::io::Write;
use std::path::PathBuf;

const NPIX: usize = 16;

fn labels_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/jet_classes.txt")
}

fn write_config(dir: &tempfile::TempDir, mode: &str) -> Result<PathBuf> {
    let path = dir.path().join("jet_image.yaml");
    std::fs::write(
        &path,
        format!(
            "jet_tag: ak8\ntop_n: 3\nnpix: {npix}\nncol: 1\nimage_list: {labels}\nclient:\n  mode: {mode}\n  model_path: spread.onnx\n  n_input: {n_input}\n  n_output: 5\n  batch_size: 0\n",
            npix = NPIX,
            labels = labels_path().display(),
            mode = mode,
            n_input = NPIX * NPIX,
        ),
    )?;
    Ok(path)
}

/// QCD scores the hottest pixel, top a quarter of the lit pixel count
fn spread_engine(input: &[f32], _batch_size: usize) -> Result<Vec<f32>, ClientError> {
    Ok(input
        .chunks(NPIX * NPIX)
        .flat_map(|image| {
            let hottest = image.iter().copied().fold(0.0f32, f32::max);
            let lit = image.iter().filter(|v| **v > 0.0).count() as f32;
            [hottest, 0.0, 0.0, 0.0, lit / 4.0]
        })
        .collect())
}

fn single_prong(pt: f64) -> Jet {
    Jet::new(pt, 0.2, -2.0).with_constituents(vec![Constituent::new(pt, 0.2, -2.0)])
}

/// Eight equal constituents on the anti-diagonal, one per eta row
fn spread(pt: f64) -> Jet {
    let constituents = (0..8)
        .map(|i| {
            let step = 0.25 * i as f64;
            Constituent::new(pt / 8.0, 0.2 - 0.9 + step, -2.0 + 0.85 - step)
        })
        .collect();
    Jet::new(pt, 0.2, -2.0).with_constituents(constituents)
}

fn write_events(dir: &tempfile::TempDir) -> Result<PathBuf> {
    let path = dir.path().join("events.jsonl");
    let mut file = std::fs::File::create(&path)?;
    let events = [
        Event::new(EventId { run: 1, lumi: 1, event: 1 })
            .with_collection("ak8", vec![single_prong(400.0), spread(600.0)]),
        Event::new(EventId { run: 1, lumi: 1, event: 2 }).with_collection("ak8", Vec::new()),
        Event::new(EventId { run: 1, lumi: 1, event: 3 })
            .with_collection("ak4", vec![single_prong(50.0)]),
    ];
    for event in &events {
        writeln!(file, "{}", serde_json::to_string(event)?)?;
    }
    Ok(path)
}

#[tokio::test]
async fn test_pipeline_reports() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = ProducerConfig::from_yaml(write_config(&dir, "sync")?)?;
    let client = SyncClient::new("spread", &config.client, spread_engine);
    let mut producer = JetImageProducer::new(&config, client)?;

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for event in EventSource::open(write_events(&dir)?)? {
        match producer.process(&event?).await {
            Ok(report) => reports.push(serde_json::to_value(&report)?),
            Err(e) => failures.push(e),
        }
    }

    assert_eq!(reports.len(), 2);
    assert_eq!(failures.len(), 1);
    assert!(!failures[0].is_fatal());

    let first = &reports[0];
    assert_eq!(first["event"]["event"], 1);
    assert_eq!(first["client"], "spread");
    assert_eq!(first["results"][0]["entries"][0]["label"], "QCD");
    assert_eq!(first["results"][1]["entries"][0]["label"], "top");
    assert_eq!(first["results"][1]["entries"][0]["score"], 2.0);
    assert_eq!(first["results"][0]["entries"].as_array().map(Vec::len), Some(3));

    assert_eq!(reports[1]["results"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn test_pipeline_pseudo_async_matches_sync() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = ProducerConfig::from_yaml(write_config(&dir, "pseudo_async")?)?;
    let event = Event::new(EventId { run: 2, lumi: 3, event: 4 })
        .with_collection("ak8", vec![spread(300.0), single_prong(200.0), spread(100.0)]);

    let mut sync = JetImageProducer::new(
        &config,
        SyncClient::new("sync", &config.client, spread_engine),
    )?;
    let mut threaded = JetImageProducer::new(
        &config,
        PseudoAsyncClient::new("threaded", &config.client, spread_engine)?,
    )?;

    let a = sync.process(&event).await?;
    let b = threaded.process(&event).await?;
    assert_eq!(a.results, b.results);
    assert_eq!(
        b.results.iter().map(|r| r.top().map(|e| e.label.clone())).collect::<Vec<_>>(),
        vec![Some("top".to_string()), Some("QCD".to_string()), Some("top".to_string())]
    );
    Ok(())
}
