// system-tests/tests/suites/gating.rs
// ============================================================================
// Module: Capability Gating Tests
// Description: Area selection and setup suppression over real HTTP.
// Purpose: Prove disabled areas never reach the registry.
// Dependencies: helpers, dist-conformance-{cli, config, core}
// ============================================================================

use dist_conformance_cli::summary_markdown;
use dist_conformance_config::ConformanceEnv;
use dist_conformance_core::CapabilityArea;
use dist_conformance_core::FixtureOverrides;
use dist_conformance_core::FixtureSet;
use dist_conformance_core::StepOutcome;
use dist_conformance_core::capability::PLAIN_SKIP_MESSAGE;
use dist_conformance_core::suite::all_checks;

use crate::helpers::harness::NAMESPACE;
use crate::helpers::harness::RunEnv;
use crate::helpers::harness::failures;
use crate::helpers::harness::run;
use crate::helpers::registry_stub::RegistryStub;

/// Tests that a run with no areas enabled skips everything and sends nothing.
#[test]
fn no_areas_enabled_sends_no_requests() {
    let stub = RegistryStub::spawn().unwrap();

    let (suite, report) = run(&RunEnv::for_stub(&stub)).unwrap();

    assert_eq!(suite.skipped(), all_checks().len());
    assert!(report.enabled_areas.is_empty());
    assert!(report.is_success());
    assert!(stub.requests().is_empty());
}

/// Tests that truthy lookalikes leave an area disabled.
#[test]
fn lookalike_values_do_not_enable_areas() {
    let stub = RegistryStub::spawn().unwrap();
    let env = RunEnv::for_stub(&stub)
        .set(ConformanceEnv::Capability(CapabilityArea::Pull), "true")
        .set(ConformanceEnv::Capability(CapabilityArea::Push), "1 ");

    let (suite, _) = run(&env).unwrap();

    assert_eq!(suite.passed(), 0);
    assert!(stub.requests().is_empty());
}

/// Tests that only the enabled area's checks run.
#[test]
fn single_area_runs_only_its_checks() {
    let stub = RegistryStub::spawn().unwrap();

    let (suite, _) = run(&RunEnv::for_stub(&stub).enable(&[CapabilityArea::Pull])).unwrap();

    for check in &suite.checks {
        let ran = !matches!(check.outcome, StepOutcome::Skipped { .. });
        assert_eq!(ran, check.area == CapabilityArea::Pull, "{}", check.name);
    }
    assert_eq!(failures(&suite), Vec::new());
}

/// Tests that pull checks run against pre-existing content without seeding.
#[test]
fn pull_against_existing_content_skips_setup() {
    let stub = RegistryStub::spawn().unwrap();
    let fixtures = FixtureSet::build(&FixtureOverrides::default()).unwrap();
    stub.seed_blob(NAMESPACE, fixtures.config.bytes());
    stub.seed_manifest(NAMESPACE, "existing", fixtures.manifest.bytes());
    let env = RunEnv::for_stub(&stub)
        .enable(&[CapabilityArea::Pull])
        .set(ConformanceEnv::TagName, "existing")
        .set(ConformanceEnv::BlobDigest, &fixtures.config.digest().to_string())
        .set(ConformanceEnv::ManifestDigest, &fixtures.manifest.digest().to_string());

    let (suite, _) = run(&env).unwrap();

    assert_eq!(failures(&suite), Vec::new());
    let setup = &suite.checks[0];
    assert_eq!(setup.outcome, StepOutcome::Skipped {
        reason: PLAIN_SKIP_MESSAGE.to_string(),
    });
    assert!(
        stub.requests().iter().all(|request| request.method == "GET" || request.method == "HEAD")
    );
}

/// Tests that an operator tag list drives discovery without a push.
#[test]
fn discovery_against_existing_tags() {
    let stub = RegistryStub::spawn().unwrap();
    let fixtures = FixtureSet::build(&FixtureOverrides::default()).unwrap();
    stub.seed_blob(NAMESPACE, fixtures.config.bytes());
    for tag in ["v1", "v2", "v3", "v4"] {
        stub.seed_manifest(NAMESPACE, tag, fixtures.manifest.bytes());
    }
    let env = RunEnv::for_stub(&stub)
        .enable(&[CapabilityArea::ContentDiscovery])
        .set(ConformanceEnv::TagList, "v1, v3");

    let (suite, _) = run(&env).unwrap();

    assert_eq!(failures(&suite), Vec::new());
    let discovery: Vec<_> = suite.area(CapabilityArea::ContentDiscovery).collect();
    assert!(matches!(discovery[0].outcome, StepOutcome::Skipped { .. }));
    assert!(discovery[1..].iter().all(|check| check.outcome == StepOutcome::Passed));
    assert_eq!(stub.tags(NAMESPACE), vec!["v1", "v2", "v3", "v4"]);
}

/// Tests that a tag list naming an absent tag fails the listing check.
#[test]
fn missing_operator_tag_fails_listing() {
    let stub = RegistryStub::spawn().unwrap();
    let fixtures = FixtureSet::build(&FixtureOverrides::default()).unwrap();
    stub.seed_blob(NAMESPACE, fixtures.config.bytes());
    for tag in ["v1", "v2"] {
        stub.seed_manifest(NAMESPACE, tag, fixtures.manifest.bytes());
    }
    let env = RunEnv::for_stub(&stub)
        .enable(&[CapabilityArea::ContentDiscovery])
        .set(ConformanceEnv::TagList, "v1,v9");

    let (suite, _) = run(&env).unwrap();

    let failed = failures(&suite);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, "GET request to list tags should yield 200 response");
    assert!(failed[0].1.contains("v9"));
}

/// Tests that hidden skips keep the markdown to the areas that ran.
#[test]
fn hidden_skips_shrink_markdown() {
    let stub = RegistryStub::spawn().unwrap();
    let env = RunEnv::for_stub(&stub)
        .enable(&[CapabilityArea::Push])
        .set(ConformanceEnv::HideSkippedWorkflows, "1");
    let config = env.config().unwrap();
    assert!(config.hide_skipped);

    let (_, report) = run(&env).unwrap();
    let markdown = summary_markdown(&report, config.hide_skipped);

    assert!(markdown.contains("## Push"));
    assert!(!markdown.contains("## Pull"));
    assert!(!markdown.contains("## Content Management"));
}
