//! Round trip through the HTTP routes on a real listener.
use proctop_agent::http::router;
use proctop_agent::state::{AppState, Store};
use proctop_agent::types::{IngestRequest, MachineReport, ProcessEntry};
use serde_json::{json, Value};

async fn serve() -> (String, Store) {
    let store = Store::new();
    let app = router(AppState {
        store: store.clone(),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), store)
}

fn proc_entry(pid: u32, parent: Option<u32>, name: &str) -> ProcessEntry {
    ProcessEntry {
        pid,
        parent_pid: parent,
        name: name.into(),
        cpu_usage: 1.0,
        memory_usage: 0.5,
    }
}

#[tokio::test]
async fn empty_store_serves_empty_array() {
    let (base, _) = serve().await;
    let body: Value = reqwest::get(format!("{base}/api/processes/latest/"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn ingest_then_latest_round_trip() {
    let (base, _) = serve().await;
    let client = reqwest::Client::new();
    let ingest = format!("{base}/api/processes/");

    for (host, procs) in [
        ("alpha", vec![proc_entry(1, None, "init"), proc_entry(10, Some(1), "sshd")]),
        ("beta", vec![proc_entry(1, None, "init")]),
        ("alpha", vec![proc_entry(1, None, "systemd")]),
    ] {
        let resp = client
            .post(&ingest)
            .json(&IngestRequest {
                hostname: host.into(),
                processes: procs,
            })
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
        let ack: Value = resp.json().await.unwrap();
        assert_eq!(ack, json!({"status": "success"}));
    }

    let machines: Vec<MachineReport> = reqwest::get(format!("{base}/api/processes/latest/"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let hosts: Vec<&str> = machines.iter().map(|m| m.hostname.as_str()).collect();
    assert_eq!(hosts, vec!["alpha", "beta"]);
    assert_eq!(machines[0].processes, vec![proc_entry(1, None, "systemd")]);
    assert!(machines[0].last_updated.ends_with('Z'));
}

#[tokio::test]
async fn empty_hostname_is_rejected() {
    let (base, store) = serve().await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/processes/"))
        .json(&json!({"hostname": "  ", "processes": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body.get("error").is_some());
    assert!(store.snapshot().await.is_empty());
}

#[tokio::test]
async fn hostname_is_trimmed_before_storing() {
    let (base, store) = serve().await;
    let client = reqwest::Client::new();
    for host in [" alpha ", "alpha"] {
        let resp = client
            .post(format!("{base}/api/processes/"))
            .json(&json!({"hostname": host, "processes": []}))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
    }
    let machines = store.snapshot().await;
    assert_eq!(machines.len(), 1);
    assert_eq!(machines[0].hostname, "alpha");
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let (base, _) = serve().await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/processes/"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}
