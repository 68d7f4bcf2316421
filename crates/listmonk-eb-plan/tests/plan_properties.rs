use listmonk_eb_plan::{
    guard, synthesize, template, ChangeAction, DependencyGraph, PasswordPolicy, Plan, PlanDiff,
    PlanError,
};
use listmonk_eb_types::{
    Component, ParameterError, Peer, Property, ResourceKind, StackParameters, Value,
};
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

fn bundle() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join("docker-compose.yml"), "services:\n  app: {}\n").expect("write");
    fs::create_dir_all(dir.path().join(".platform/nginx")).expect("mkdir");
    fs::write(dir.path().join(".platform/nginx/proxy.conf"), "client_max_body_size 20M;")
        .expect("write");
    dir
}

fn params(bundle: &TempDir) -> StackParameters {
    StackParameters {
        account: Some("123456789012".into()),
        certificate_arn: Some("arn:aws:acm:us-east-1:123456789012:certificate/abc-123".into()),
        bundle_dir: Some(bundle.path().to_path_buf()),
        ..Default::default()
    }
}

#[test]
fn full_plan_has_every_component() {
    let dir = bundle();
    let synthesis = synthesize(&params(&dir)).expect("plan should build");
    let plan = &synthesis.plan;

    for component in [
        Component::Network,
        Component::AccessPolicy,
        Component::Credential,
        Component::DataCluster,
        Component::Identity,
        Component::Environment,
    ] {
        assert!(plan.by_component(component).next().is_some(), "{component} missing");
    }
    assert_eq!(plan.by_kind(ResourceKind::Vpc).count(), 1);
    assert_eq!(plan.by_kind(ResourceKind::SecurityGroup).count(), 3);
    assert_eq!(plan.by_kind(ResourceKind::NatGateway).count(), 1);
    assert_eq!(plan.by_kind(ResourceKind::Environment).count(), 1);
    assert_eq!(plan.assets().len(), 1);
}

#[test]
fn outputs_are_exactly_the_four_operator_values() {
    let dir = bundle();
    let synthesis = synthesize(&params(&dir)).expect("plan should build");
    let names: Vec<_> = synthesis.plan.outputs().iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["VpcId", "AppSgId", "DbEndpoint", "DbSecretArn"]);
    assert!(synthesis.plan.outputs().iter().all(|o| !o.value.contains_secret()));
    assert_eq!(
        synthesis.plan.output("DbSecretArn").map(|o| &o.value),
        Some(&synthesis.credential.secret_arn())
    );
}

#[test]
fn missing_certificate_fails_before_any_resource() {
    let dir = bundle();
    let err = synthesize(&StackParameters {
        certificate_arn: None,
        ..params(&dir)
    })
    .expect_err("certificate is required");
    assert!(matches!(
        err,
        PlanError::Parameter(ParameterError::Missing("AcmCertArn"))
    ));
}

#[test]
fn missing_bundle_fails_synthesis() {
    let dir = bundle();
    let err = synthesize(&StackParameters {
        bundle_dir: Some(dir.path().join("missing")),
        ..params(&dir)
    })
    .expect_err("bundle is required");
    assert!(matches!(err, PlanError::Bundle { .. }));
}

#[test]
fn data_boundary_never_accepts_any_address() {
    let dir = bundle();
    let synthesis = synthesize(&params(&dir)).expect("plan should build");
    assert!(synthesis.access.data.rules().iter().all(|r| r.peer != Peer::AnyIpv4));
    assert!(synthesis.access.application.rules().iter().all(|r| !r.peer.is_open()));
    assert!(synthesis.access.edge.rules().iter().all(|r| r.peer.is_open()));

    let data_group = synthesis.plan.resource(&synthesis.access.data.security_group).expect("group");
    assert!(data_group.property("SecurityGroupIngress").is_none());
}

#[test]
fn every_edge_is_acyclic_and_network_comes_first() {
    let dir = bundle();
    let synthesis = synthesize(&params(&dir)).expect("plan should build");
    let graph = DependencyGraph::build(&synthesis.plan).expect("acyclic");
    assert_eq!(graph.len(), synthesis.plan.len());

    let waves = graph.waves();
    assert!(waves[0].contains(&&synthesis.network.vpc));
    let env_wave = graph.wave_of(&synthesis.environment.environment).expect("env");
    let cluster_wave = graph.wave_of(&synthesis.cluster.writer).expect("writer");
    assert!(env_wave > cluster_wave);
}

#[test]
fn saved_plan_round_trips_with_no_changes() {
    let dir = bundle();
    let synthesis = synthesize(&params(&dir)).expect("plan should build");
    let saved = synthesis.plan.to_json().expect("serialize");
    let loaded = Plan::from_json(&saved).expect("reload");
    assert!(PlanDiff::between(&loaded, &synthesis.plan).expect("diff").is_empty());
}

#[test]
fn template_never_contains_plaintext_credentials() {
    let dir = bundle();
    let synthesis = synthesize(&params(&dir)).expect("plan should build");
    let rendered = template::to_string_pretty(&synthesis.plan).expect("render");
    assert!(rendered.contains("{{resolve:secretsmanager:"));
    assert!(rendered.contains("AWS::ElasticBeanstalk::Environment"));
    assert!(rendered.contains("\"DeletionPolicy\": \"Snapshot\""));
    assert!(!rendered.contains("MasterUserPassword\": \""));
}

#[test]
fn image_tag_change_replaces_only_the_version() {
    let dir = bundle();
    let before = synthesize(&params(&dir)).expect("plan should build");
    let after = synthesize(&StackParameters {
        image_tag: Some("v5.1.0".into()),
        ..params(&dir)
    })
    .expect("plan should build");

    let diff = PlanDiff::between(&before.plan, &after.plan).expect("diff");
    assert_eq!(diff.count(ChangeAction::Create), 0);
    assert_eq!(diff.count(ChangeAction::Delete), 0);

    let replaced: Vec<_> = diff.with_action(ChangeAction::Replace).collect();
    assert_eq!(replaced.len(), 1);
    assert_eq!(replaced[0].kind, ResourceKind::ApplicationVersion);

    let updated: Vec<_> = diff.with_action(ChangeAction::Update).collect();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].kind, ResourceKind::Environment);
    assert!(diff.blocked().is_empty());
    assert!(guard::check_changes(&diff).is_ok());
}

#[test]
fn bundle_change_replaces_only_the_version() {
    let dir = bundle();
    let before = synthesize(&params(&dir)).expect("plan should build");
    fs::write(dir.path().join("docker-compose.yml"), "services:\n  app: {image: x}\n").expect("write");
    let after = synthesize(&params(&dir)).expect("plan should build");

    assert_ne!(before.artifact.key, after.artifact.key);
    let diff = PlanDiff::between(&before.plan, &after.plan).expect("diff");
    assert_eq!(diff.count(ChangeAction::Replace), 1);
    assert_eq!(diff.count(ChangeAction::Update), 1);
}

#[test]
fn teardown_is_blocked_by_the_cluster() {
    let dir = bundle();
    let synthesis = synthesize(&params(&dir)).expect("plan should build");
    match guard::check_teardown(&synthesis.plan) {
        Err(PlanError::DeletionProtected(ids)) => assert_eq!(ids, vec![synthesis.cluster.cluster.clone()]),
        other => panic!("expected teardown to be blocked, got {other:?}"),
    }
}

#[test]
fn writer_is_private_for_any_network_shape() {
    let dir = bundle();
    for (azs, nats) in [(1, 1), (2, 2), (3, 1), (3, 3)] {
        let synthesis = synthesize(&StackParameters {
            max_azs: Some(azs),
            nat_gateways: Some(nats),
            ..params(&dir)
        })
        .expect("plan should build");
        let writer = synthesis.plan.resource(&synthesis.cluster.writer).expect("writer");
        assert_eq!(writer.property("PubliclyAccessible"), Some(&Property::Bool(false)));
        assert_eq!(synthesis.network.nat_gateways.len(), usize::from(nats));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Re-synthesizing from the same inputs never yields a change.
    #[test]
    fn resynthesis_is_idempotent(tag in "v[0-9]\\.[0-9]{1,2}\\.[0-9]{1,2}", azs in 1u8..=3) {
        let dir = bundle();
        let input = StackParameters {
            image_tag: Some(tag),
            max_azs: Some(azs),
            ..params(&dir)
        };
        let first = synthesize(&input).expect("plan should build");
        let second = synthesize(&input).expect("plan should build");
        prop_assert_eq!(&first.plan, &second.plan);
        let diff = PlanDiff::between(&first.plan, &second.plan).expect("diff");
        prop_assert!(diff.is_empty());
    }

    /// Whatever tag is supplied, it reaches the runtime unchanged.
    #[test]
    fn image_tag_reaches_runtime(tag in "[a-z0-9][a-z0-9._-]{0,20}") {
        let dir = bundle();
        let synthesis = synthesize(&StackParameters {
            image_tag: Some(tag.clone()),
            ..params(&dir)
        })
        .expect("plan should build");
        let expected = Value::literal(tag);
        prop_assert_eq!(
            synthesis.environment.runtime_variable("LISTMONK_IMAGE_TAG"),
            Some(&expected)
        );
    }

    /// Generated passwords are always 24 alphanumerics.
    #[test]
    fn generated_passwords_meet_policy(_seed in 0u32..64) {
        let password = PasswordPolicy::default().generate();
        prop_assert_eq!(password.expose().len(), 24);
        prop_assert!(password.expose().chars().all(|c| c.is_ascii_alphanumeric()));
    }
}

#[test]
fn default_tag_and_health_path() {
    let dir = bundle();
    let synthesis = synthesize(&params(&dir)).expect("plan should build");
    let env = &synthesis.environment;
    assert_eq!(
        env.runtime_variable("LISTMONK_IMAGE_TAG").and_then(Value::as_literal),
        Some("v5.0.3")
    );
    assert_eq!(
        env.options
            .get("aws:elasticbeanstalk:environment:process:default", "HealthCheckPath")
            .and_then(Value::as_literal),
        Some("/admin/login")
    );
}

#[test]
fn health_check_targets_the_admin_area() {
    let dir = bundle();
    for tag in ["v5.0.3", "v5.2.0"] {
        let synthesis = synthesize(&StackParameters {
            image_tag: Some(tag.into()),
            ..params(&dir)
        })
        .expect("plan should build");
        let path = synthesis
            .environment
            .options
            .get("aws:elasticbeanstalk:environment:process:default", "HealthCheckPath")
            .and_then(Value::as_literal)
            .expect("health check path");
        assert!(path.starts_with("/admin/"), "{path}");
    }
}

#[test]
fn unauthenticated_health_checks_cannot_be_configured() {
    for path in ["/about", "/metrics", "/health", "/"] {
        let json = format!(r#"{{"health_check_path": "{path}"}}"#);
        assert!(serde_json::from_str::<StackParameters>(&json).is_err(), "{path} accepted");
    }
}
