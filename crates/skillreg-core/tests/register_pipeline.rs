//! Integration tests for the registration pipeline.

mod support;

use std::collections::HashSet;

use skillreg_core::catalog::TagOutcome;
use skillreg_core::error::RegistrationError;
use skillreg_core::event::RegistrationEvent;
use skillreg_core::image::{DockerImage, RegistryCredential, RegistryType};
use skillreg_core::orchestration::{
    DescriptorOrigin, DescriptorSource, RegistrationOptions, RegistrationPipeline,
    RegistrationReport,
};
use skillreg_core::publish::{API_VERSION_LABEL, PublishOutcome};
use skillreg_core::source::Commit;
use skillreg_core::version::VersionSource;

use support::{FakeSourceControl, FakeTransport, Harness, files};

const SHA: &str = "4f2a9c1e";
const DEMO_DESTINATION: &str = "gcr.io/atomist-container-skills/atomist-demo:1.0.0.skill";

fn demo_image() -> DockerImage {
    DockerImage::new("ghcr.io", "atomist-skills/demo")
        .with_digest("sha256:feed")
        .with_tag("1.0.0")
        .with_label(API_VERSION_LABEL, "container/v1")
}

fn demo_event(image: DockerImage) -> RegistrationEvent {
    RegistrationEvent::new(image, Commit::new("atomist-skills", "demo", SHA))
}

fn run(
    harness: &Harness,
    event: &RegistrationEvent,
    options: RegistrationOptions,
) -> Result<RegistrationReport, RegistrationError> {
    RegistrationPipeline::new(&harness.ctx, options).run(event)
}

#[test]
fn registers_container_skill_end_to_end() {
    let transport = FakeTransport::with_files(files(&[
        ("skill.yaml", "skill:\n  description: Demo skill\n  categories: [DEV_OPS]\n"),
        ("datalog/subscription/on_push.edn", "[:find ?push]"),
        ("datalog/schema/demo.edn", "{:attributes {}}"),
    ]));
    let harness = Harness::new(transport, FakeSourceControl::default());
    let event = demo_event(demo_image());

    let report = run(&harness, &event, RegistrationOptions::default()).unwrap();

    assert_eq!(report.origin, DescriptorOrigin::Image);
    assert_eq!(report.skills.len(), 1);
    let skill = &report.skills[0];
    assert_eq!(skill.namespace, "atomist");
    assert_eq!(skill.name, "demo");
    assert_eq!(skill.version, "1.0.0");
    assert_eq!(skill.version_source, VersionSource::ImageTag);
    assert_eq!(skill.artifact.as_deref(), Some(DEMO_DESTINATION));
    assert_eq!(skill.publish, PublishOutcome::Copied(DEMO_DESTINATION.to_string()));
    assert_eq!(skill.tag, Some(TagOutcome::Created));
    assert_eq!(
        report.status_message(),
        "Successfully registered atomist/demo@1.0.0"
    );

    let registered = harness.catalog.registered();
    assert_eq!(registered.len(), 1);
    let descriptor = &registered[0];
    assert_eq!(descriptor.author, "Atomist");
    assert_eq!(descriptor.description, "Demo skill");
    assert_eq!(descriptor.commit_sha, SHA);
    assert_eq!(descriptor.datalog_subscriptions[0].name, "on_push");
    assert_eq!(descriptor.schemata[0].name, "demo");
    assert_eq!(descriptor.extra["categories"][0], "DEV_OPS");
    assert_eq!(descriptor.artifact_image(), Some(DEMO_DESTINATION));

    assert_eq!(
        harness.transport.copies(),
        vec![(
            "ghcr.io/atomist-skills/demo@sha256:feed".to_string(),
            DEMO_DESTINATION.to_string()
        )]
    );

    let tags = harness.source.created_tags();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].tag, "1.0.0");
    assert_eq!(tags[0].message, "v1.0.0");
    assert_eq!(tags[0].object, SHA);
    assert_eq!(tags[0].tagger.name, "Atomist Bot");
    assert_eq!(harness.source.refs()["refs/tags/1.0.0"], SHA);

    let records = harness.stream.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].app_name, "atomist/demo");
    assert_eq!(records[0].digest.as_deref(), Some("sha256:feed"));
    assert!(harness.source.clones().is_empty());
}

#[test]
fn prefixed_image_tag_is_normalized_everywhere() {
    let image = DockerImage::new("ghcr.io", "atomist-skills/demo")
        .with_digest("sha256:feed")
        .with_tag("v1.0.0")
        .with_label(API_VERSION_LABEL, "container/v1");
    let harness = Harness::new(
        FakeTransport::with_files(files(&[("skill.yaml", "name: demo\n")])),
        FakeSourceControl::default(),
    );

    let report = run(&harness, &demo_event(image), RegistrationOptions::default()).unwrap();

    assert_eq!(report.skills[0].version, "1.0.0");
    assert_eq!(report.skills[0].artifact.as_deref(), Some(DEMO_DESTINATION));
    let tags = harness.source.created_tags();
    assert_eq!(tags[0].tag, "1.0.0");
    assert_eq!(tags[0].message, "v1.0.0");
    assert_eq!(harness.source.refs()["refs/tags/1.0.0"], SHA);
}

#[test]
fn existing_tag_is_left_untouched() {
    let harness = Harness::new(
        FakeTransport::with_files(files(&[("skill.yaml", "name: demo\n")])),
        FakeSourceControl::default().with_ref("refs/tags/1.0.0", SHA),
    );
    let report = run(&harness, &demo_event(demo_image()), RegistrationOptions::default()).unwrap();

    assert_eq!(report.skills[0].tag, Some(TagOutcome::AlreadyExists));
    assert!(harness.source.created_tags().is_empty());
    assert_eq!(harness.catalog.registered().len(), 1);
}

#[test]
fn tagging_failure_still_registers() {
    let source = FakeSourceControl {
        fail_tagging: true,
        ..Default::default()
    };
    let harness = Harness::new(FakeTransport::default(), source);
    let report = run(&harness, &demo_event(demo_image()), RegistrationOptions::default()).unwrap();

    assert!(matches!(report.skills[0].tag, Some(TagOutcome::Failed(_))));
    assert_eq!(harness.catalog.registered().len(), 1);
    assert_eq!(harness.stream.records().len(), 1);
}

#[test]
fn image_without_descriptor_falls_back_to_repository() {
    let source = FakeSourceControl::with_repo_files(files(&[(
        "skill.yaml",
        "skill:\n  displayName: Demo From Repo\n",
    )]));
    let harness = Harness::new(FakeTransport::default(), source);

    let report = run(&harness, &demo_event(demo_image()), RegistrationOptions::default()).unwrap();

    assert_eq!(report.origin, DescriptorOrigin::Repository);
    assert_eq!(
        harness.source.clones(),
        vec![format!("atomist-skills/demo@{}", SHA)]
    );
    assert_eq!(
        harness.catalog.registered()[0].display_name,
        "Demo From Repo"
    );
}

#[test]
fn repository_first_always_clones() {
    let transport =
        FakeTransport::with_files(files(&[("skill.yaml", "displayName: From Image\n")]));
    let source = FakeSourceControl::with_repo_files(files(&[(
        "skill.yaml",
        "displayName: From Repo\n",
    )]));
    let harness = Harness::new(transport, source);
    let options = RegistrationOptions::default().with_source(DescriptorSource::RepositoryFirst);

    let report = run(&harness, &demo_event(demo_image()), options).unwrap();

    assert_eq!(report.origin, DescriptorOrigin::Repository);
    assert_eq!(harness.catalog.registered()[0].display_name, "From Repo");
}

#[test]
fn missing_descriptor_everywhere_registers_defaults() {
    let harness = Harness::new(FakeTransport::default(), FakeSourceControl::default());
    let report = run(&harness, &demo_event(demo_image()), RegistrationOptions::default()).unwrap();

    let descriptor = &harness.catalog.registered()[0];
    assert_eq!(report.skills.len(), 1);
    assert_eq!(descriptor.name, "demo");
    assert_eq!(
        descriptor.description,
        "Atomist Skill registered from atomist-skills/demo"
    );
    assert_eq!(descriptor.icon_url, "https://github.com/atomist-skills.png");
    assert_eq!(
        descriptor.homepage_url.as_deref(),
        Some("https://github.com/atomist-skills/demo")
    );
}

#[test]
fn multi_document_descriptor_shares_fallback_version() {
    let transport = FakeTransport::with_files(files(&[(
        "skill.yaml",
        "skill:\n  name: first\n---\nskill:\n  name: second\n",
    )]));
    let source = FakeSourceControl::default().with_tags(&["0.1.3", "nightly", "0.1.2"]);
    let harness = Harness::new(transport, source);
    let image = DockerImage::new("ghcr.io", "atomist-skills/demo").with_digest("sha256:feed");

    let report = run(&harness, &demo_event(image), RegistrationOptions::default()).unwrap();

    let versions: Vec<_> = report.skills.iter().map(|s| s.version.as_str()).collect();
    assert_eq!(versions, vec!["0.1.4", "0.1.4"]);
    assert!(
        report
            .skills
            .iter()
            .all(|s| s.version_source == VersionSource::NextPatch)
    );
    assert_eq!(harness.source.tag_listings(), 1);

    // Both skills share one tag: the first creates it, the second finds it.
    assert_eq!(report.skills[0].tag, Some(TagOutcome::Created));
    assert_eq!(report.skills[1].tag, Some(TagOutcome::AlreadyExists));
    assert_eq!(harness.source.created_tags().len(), 1);

    // Non-container images carry no artifact.
    assert!(report.skills.iter().all(|s| s.artifact.is_none()));
    assert!(harness.transport.copies().is_empty());
}

#[test]
fn canonical_images_are_not_copied() {
    let harness = Harness::new(FakeTransport::default(), FakeSourceControl::default());
    let image = DockerImage::new("gcr.io", "atomist-container-skills/demo")
        .with_digest("sha256:feed")
        .with_tag("2.0.0")
        .with_label(API_VERSION_LABEL, "container/v1");

    let report = run(&harness, &demo_event(image), RegistrationOptions::default()).unwrap();

    assert_eq!(
        report.skills[0].artifact.as_deref(),
        Some("gcr.io/atomist-container-skills/demo@sha256:feed")
    );
    assert!(harness.transport.copies().is_empty());
}

#[test]
fn repeated_registration_copies_once() {
    let harness = Harness::new(FakeTransport::default(), FakeSourceControl::default());
    let event = demo_event(demo_image());

    run(&harness, &event, RegistrationOptions::default()).unwrap();
    let second = run(&harness, &event, RegistrationOptions::default()).unwrap();

    assert_eq!(
        second.skills[0].publish,
        PublishOutcome::AlreadyCopied(DEMO_DESTINATION.to_string())
    );
    assert_eq!(harness.transport.copies().len(), 1);
    assert_eq!(harness.catalog.registered().len(), 2);
}

#[test]
fn dry_run_resolves_without_side_effects() {
    let harness = Harness::new(FakeTransport::default(), FakeSourceControl::default());
    let options = RegistrationOptions::default().with_dry_run(true);

    let report = run(&harness, &demo_event(demo_image()), options).unwrap();

    assert!(report.dry_run);
    assert_eq!(report.skills[0].artifact.as_deref(), Some(DEMO_DESTINATION));
    assert_eq!(
        report.skills[0].publish,
        PublishOutcome::Planned(DEMO_DESTINATION.to_string())
    );
    assert_eq!(report.skills[0].tag, None);
    assert!(harness.transport.copies().is_empty());
    assert!(harness.catalog.registered().is_empty());
    assert!(harness.source.created_tags().is_empty());
    assert!(harness.stream.records().is_empty());
    assert!(harness.ctx.cache().is_empty());
}

#[test]
fn copy_failure_registers_nothing() {
    let transport = FakeTransport {
        fail_copy: true,
        ..Default::default()
    };
    let harness = Harness::new(transport, FakeSourceControl::default());

    let err = run(&harness, &demo_event(demo_image()), RegistrationOptions::default()).unwrap_err();

    assert!(matches!(err, RegistrationError::Copy { .. }));
    assert!(harness.catalog.registered().is_empty());
    assert!(harness.source.created_tags().is_empty());
    assert!(harness.ctx.cache().is_empty());
}

#[test]
fn rejected_credentials_fall_through_to_the_next() {
    let transport = FakeTransport {
        rejected: HashSet::from(["ghcr-old".to_string()]),
        ..Default::default()
    };
    let harness = Harness::new(transport, FakeSourceControl::default());
    let event = demo_event(demo_image())
        .with_registry(RegistryCredential::new("hub", RegistryType::DockerHub, "hub.docker.com"))
        .with_registry(
            RegistryCredential::new("ghcr-old", RegistryType::Ghcr, "ghcr.io")
                .with_login("bot", "old"),
        )
        .with_registry(
            RegistryCredential::new("ghcr-new", RegistryType::Ghcr, "ghcr.io")
                .with_login("bot", "new"),
        );

    run(&harness, &event, RegistrationOptions::default()).unwrap();

    // Matching registries are tried first; the canonical login comes last.
    assert_eq!(
        harness.transport.logins(),
        vec!["ghcr-old", "ghcr-new", "ghcr-new", "canonical"]
    );
}

#[test]
fn no_working_credential_is_a_download_error() {
    let transport = FakeTransport {
        rejected: HashSet::from(["only".to_string()]),
        ..Default::default()
    };
    let harness = Harness::new(transport, FakeSourceControl::default());
    let event = demo_event(demo_image()).with_registry(
        RegistryCredential::new("only", RegistryType::Ghcr, "ghcr.io").with_login("bot", "pw"),
    );

    let err = run(&harness, &event, RegistrationOptions::default()).unwrap_err();

    assert!(matches!(err, RegistrationError::Download { .. }));
    assert!(err.to_string().contains("ghcr.io/atomist-skills/demo@sha256:feed"));
    assert!(harness.catalog.registered().is_empty());
}

#[test]
fn malformed_descriptor_is_a_descriptor_error() {
    let transport = FakeTransport::with_files(files(&[("skill.yaml", "skill: [unclosed\n")]));
    let harness = Harness::new(transport, FakeSourceControl::default());

    let err = run(&harness, &demo_event(demo_image()), RegistrationOptions::default()).unwrap_err();

    assert!(matches!(err, RegistrationError::Descriptor(_)));
    assert!(harness.catalog.registered().is_empty());
}
