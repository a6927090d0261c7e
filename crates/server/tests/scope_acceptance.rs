use std::collections::HashSet;
use std::sync::Arc;

use kapaplane_server::error::ApiError;
use kapaplane_server::kapacitor::{EngineConnector, InMemoryFleet, RemoteError, TaskEngine};
use kapaplane_server::rules::{alert_response, validate_rule, AlertRule, QueryConfig};
use kapaplane_server::scope;
use kapaplane_server::store::{InstanceStore, KapacitorRecord, KapacitorStore};

fn instance(src_id: i64, url: &str) -> KapacitorRecord {
    KapacitorRecord {
        id: 0,
        src_id,
        name: "kapa".into(),
        url: url.into(),
        username: String::new(),
        password: String::new(),
        active: true,
    }
}

fn rule() -> AlertRule {
    AlertRule {
        name: "cpu".into(),
        every: "30s".into(),
        query: Some(QueryConfig {
            database: "telegraf".into(),
            measurement: "cpu".into(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[tokio::test]
async fn concurrent_registrations_get_distinct_ids() {
    let store = Arc::new(KapacitorStore::new());
    let mut handles = Vec::new();
    for i in 0..32 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .add(instance(1 + i % 2, "http://kapa:9092"))
                .await
                .unwrap()
                .id
        }));
    }

    let mut ids = HashSet::new();
    for h in handles {
        ids.insert(h.await.unwrap());
    }
    assert_eq!(ids.len(), 32);
    assert_eq!(store.count(), 32);
}

#[tokio::test]
async fn every_link_of_the_chain_fails_the_same_way() {
    let store = KapacitorStore::new();
    let fleet = InMemoryFleet::new();
    let srv = store.add(instance(1, "http://kapa:9092")).await.unwrap();

    let wrong_source = scope::resolve(&store, 2, srv.id).await.unwrap_err();
    let wrong_instance = scope::resolve(&store, 1, srv.id + 1).await.unwrap_err();

    let engine = fleet.connect(&srv).unwrap();
    let missing_task = engine
        .get("task-404")
        .await
        .map_err(|e| ApiError::from_remote(e, srv.id))
        .unwrap_err();

    assert_eq!(wrong_source.to_string(), missing_task.to_string());
    assert_eq!(wrong_source.status(), wrong_instance.status());
    assert_eq!(wrong_source.status(), missing_task.status());
}

#[tokio::test]
async fn engines_do_not_share_tasks() {
    let fleet = InMemoryFleet::new();
    let one = fleet.connect(&instance(1, "http://one:9092")).unwrap();
    let two = fleet.connect(&instance(1, "http://two:9092")).unwrap();

    let task = two.create(&rule()).await.unwrap();
    assert_eq!(one.get(&task.id).await.unwrap_err(), RemoteError::NotFound);
    assert_eq!(two.get(&task.id).await.unwrap().rule.name, "cpu");
}

#[tokio::test]
async fn created_task_translates_to_scoped_links() {
    let fleet = InMemoryFleet::new();
    let engine = fleet.connect(&instance(3, "http://kapa:9092")).unwrap();
    let candidate = rule();
    validate_rule(&candidate).unwrap();

    let task = engine.create(&candidate).await.unwrap();
    let res = alert_response(
        task.rule,
        task.tickscript,
        &task.href,
        &task.href_output,
        task.status,
        3,
        9,
    );
    assert_eq!(
        res.links.self_link,
        format!("/chronograf/v1/sources/3/kapacitors/9/rules/{}", task.id)
    );
    assert!(res.links.output.ends_with("%2Foutput"));
    assert_eq!(res.rule.query.unwrap().id, task.id);
}
