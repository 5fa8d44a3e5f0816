use super::support::{json_page, IntegrationHarness, ScriptedTransport, JSON_URL};
use mldeck::config::SamplingDefaults;
use mldeck::discovery::{JsonCatalog, MediaType};
use mldeck::models::SamplingOverrides;
use mldeck::orchestration::{EventType, RunLog};
use mldeck::pipeline::{
    load_species_specs, FetchOptions, FetchRunner, SpeciesIssueReason, FETCH_ERRORS_FILE,
};
use std::path::PathBuf;

const SPEC_CSV: &str = "Species,Limit,Tags\nCarolina Wren,2,wren backyard\nGhost Bird,3,\n";

fn wren_catalog() -> ScriptedTransport {
    ScriptedTransport::new()
        .page(
            JSON_URL,
            "Carolina Wren",
            1,
            &json_page(&[
                ("101", Some(5.0), "Ann"),
                ("102", Some(4.5), "Bo"),
                ("103", Some(4.0), "Cy"),
                ("104", None, "Di"),
            ]),
        )
        .page(JSON_URL, "Carolina Wren", 2, r#"{"results": []}"#)
}

fn options(out: PathBuf) -> FetchOptions {
    FetchOptions {
        out,
        media_type: MediaType::Photo,
        pages: 3,
        seed: 42,
        overrides: SamplingOverrides::default(),
        cache_dir: None,
        dry_run: false,
    }
}

#[test]
fn failing_species_is_reported_and_the_rest_written() {
    let harness = IntegrationHarness::new();
    let specs = load_species_specs(&harness.write("spec.csv", SPEC_CSV)).unwrap();
    let transport = wren_catalog();
    let source = JsonCatalog::new(&transport, JSON_URL);

    let summary = FetchRunner::new(source, options(harness.path("out/photos.csv")), SamplingDefaults::default())
        .run(&specs)
        .unwrap();

    assert_eq!(summary.outcomes.len(), 2);
    assert_eq!(summary.outcomes[0].gathered, 4);
    assert_eq!(summary.outcomes[0].picked, 2);
    assert_eq!(summary.outcomes[1].picked, 0);
    assert_eq!(summary.rows.len(), 2);
    assert!(summary.rows.iter().all(|r| r.species == "Carolina Wren"));
    assert!(summary.rows.iter().all(|r| r.tags == "wren backyard"));

    let written = harness.read("out/photos.csv");
    assert!(written.starts_with("ML_ID,Species,Tags\r\n"));
    assert_eq!(written.lines().count(), 3);

    assert_eq!(summary.issues.len(), 1);
    assert_eq!(summary.issues[0].species, "Ghost Bird");
    assert_eq!(summary.issues[0].reason, SpeciesIssueReason::DiscoveryFailed);
    assert_eq!(summary.errors_path, Some(harness.path(&format!("out/{FETCH_ERRORS_FILE}"))));
    let errors = harness.read(&format!("out/{FETCH_ERRORS_FILE}"));
    assert!(errors.starts_with("Species,Error\r\n"));
    assert!(errors.contains("Ghost Bird,"));
}

#[test]
fn clean_run_clears_an_old_error_report() {
    let harness = IntegrationHarness::new();
    let stale = harness.write(&format!("out/{FETCH_ERRORS_FILE}"), "Species,Error\r\nOld,boom\r\n");
    let specs = load_species_specs(&harness.write("spec.csv", "Species,Limit\nCarolina Wren,2\n")).unwrap();
    let transport = wren_catalog();

    let summary = FetchRunner::new(
        JsonCatalog::new(&transport, JSON_URL),
        options(harness.path("out/photos.csv")),
        SamplingDefaults::default(),
    )
    .run(&specs)
    .unwrap();

    assert!(summary.issues.is_empty());
    assert!(summary.errors_path.is_none());
    assert!(!stale.exists());
}

#[test]
fn same_seed_selects_the_same_rows() {
    let harness = IntegrationHarness::new();
    let specs = load_species_specs(&harness.write("spec.csv", SPEC_CSV)).unwrap();
    let transport = wren_catalog();

    let run = |name: &str| {
        FetchRunner::new(
            JsonCatalog::new(&transport, JSON_URL),
            options(harness.path(name)),
            SamplingDefaults::default(),
        )
        .run(&specs)
        .unwrap()
        .rows
    };
    assert_eq!(run("a.csv"), run("b.csv"));
}

#[test]
fn dry_run_reports_counts_and_writes_nothing() {
    let harness = IntegrationHarness::new();
    let specs = load_species_specs(&harness.write("spec.csv", SPEC_CSV)).unwrap();
    let transport = wren_catalog();
    let cache_dir = harness.path("cache");
    let mut opts = options(harness.path("photos.csv"));
    opts.dry_run = true;
    opts.cache_dir = Some(cache_dir.clone());

    let summary = FetchRunner::new(
        JsonCatalog::new(&transport, JSON_URL),
        opts,
        SamplingDefaults::default(),
    )
    .run(&specs)
    .unwrap();

    assert_eq!(summary.outcomes[0].describe(), "Carolina Wren: gathered=4 picks=2");
    assert_eq!(summary.outcomes[1].describe(), "Ghost Bird: gathered=0 picks=0");
    assert!(summary.rows.is_empty());
    assert!(summary.out_path.is_none());
    assert!(summary.errors_path.is_none());
    assert!(!harness.path("photos.csv").exists());
    assert!(!harness.path(FETCH_ERRORS_FILE).exists());
    assert!(!cache_dir.exists());
}

#[test]
fn cached_candidates_carry_a_species_through_an_outage() {
    let harness = IntegrationHarness::new();
    let specs = load_species_specs(&harness.write(
        "spec.csv",
        "Species,Limit\nCarolina Wren,3\n",
    ))
    .unwrap();
    let mut opts = options(harness.path("photos.csv"));
    opts.cache_dir = Some(harness.path("cache"));

    let online = wren_catalog();
    let first = FetchRunner::new(
        JsonCatalog::new(&online, JSON_URL),
        opts.clone(),
        SamplingDefaults::default(),
    )
    .run(&specs)
    .unwrap();
    assert_eq!(first.rows.len(), 3);
    assert!(harness.path("cache/Carolina_Wren.json").exists());

    let offline = ScriptedTransport::new();
    let second = FetchRunner::new(
        JsonCatalog::new(&offline, JSON_URL),
        opts,
        SamplingDefaults::default(),
    )
    .run(&specs)
    .unwrap();
    assert_eq!(second.outcomes[0].gathered, 4);
    assert_eq!(second.rows.len(), 3);
    assert_eq!(second.issues.len(), 1);
    assert_eq!(second.issues[0].reason, SpeciesIssueReason::DiscoveryFailed);
}

#[test]
fn run_overrides_beat_row_values() {
    let harness = IntegrationHarness::new();
    let specs = load_species_specs(&harness.write(
        "spec.csv",
        "Species,Limit,MinRating\nCarolina Wren,4,1.0\n",
    ))
    .unwrap();
    let transport = wren_catalog();
    let mut opts = options(harness.path("photos.csv"));
    opts.overrides.min_rating = Some(4.5);

    let summary = FetchRunner::new(
        JsonCatalog::new(&transport, JSON_URL),
        opts,
        SamplingDefaults::default(),
    )
    .run(&specs)
    .unwrap();
    // 101 and 102 clear 4.5; the unrated 104 always passes the rating filter.
    let mut ids: Vec<&str> = summary.rows.iter().map(|r| r.ml_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["101", "102", "104"]);
}

#[test]
fn run_events_trace_each_species() {
    let harness = IntegrationHarness::new();
    let specs = load_species_specs(&harness.write("spec.csv", SPEC_CSV)).unwrap();
    let transport = wren_catalog();
    let log = RunLog::new(&harness.path("logs"));

    FetchRunner::new(
        JsonCatalog::new(&transport, JSON_URL),
        options(harness.path("photos.csv")),
        SamplingDefaults::default(),
    )
    .with_log(&log)
    .run(&specs)
    .unwrap();

    let kinds: Vec<EventType> = log
        .load_run_events()
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(
        kinds,
        vec![
            EventType::FetchStarted,
            EventType::SpeciesSampled,
            EventType::SpeciesFailed,
            EventType::SpeciesSkipped,
            EventType::FetchCompleted,
        ]
    );
}

#[test]
fn spec_without_limit_column_is_rejected() {
    let harness = IntegrationHarness::new();
    let path = harness.write("spec.csv", "Species,Tags\nCarolina Wren,x\n");
    let err = load_species_specs(&path).unwrap_err();
    assert!(format!("{err:#}").contains("Missing required column: Limit"));
}
