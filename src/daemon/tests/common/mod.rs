#![allow(dead_code)]

use axum::body::Body;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use mesos2iam_daemon::app::get_app;
use mesos2iam_daemon::backend::CredentialsBackend;
use mesos2iam_daemon::state::ProxyState;
use mesos2iam_identity::containers::MockContainerRuntime;
use mesos2iam_identity::process::{MockPortOwnerLookup, MockProcessTree};
use mesos2iam_identity::{Container, ContainerInventory, IdentityResolver};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub const HOST_IP: &str = "52.52.52.52";
pub const JOB_ID: &str = "4ea13548-caa8-48dc-af69-58a651d9fa3b";
pub const CREDENTIALS: &str = r#"{"RoleArn":"roleArn","AccessKeyId":"AccessKey","SecretAccessKey":"Secret","Token":"Token","Expiration":"Expiration Date"}"#;

/// Stand-in for the credentials backend. Answers known job ids and counts
/// every call it gets.
pub struct FakeBackend {
    pub url: String,
    calls: Arc<AtomicUsize>,
}

impl FakeBackend {
    pub async fn start(known: &[(&str, &str)]) -> Self {
        let known: HashMap<String, String> = known
            .iter()
            .map(|(job, body)| (job.to_string(), body.to_string()))
            .collect();
        let calls = Arc::new(AtomicUsize::new(0));

        let app = Router::new()
            .route("/credentials/{job_id}", get(answer))
            .with_state((Arc::new(known), calls.clone()));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        Self {
            url: format!("http://{addr}"),
            calls,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

type BackendState = (Arc<HashMap<String, String>>, Arc<AtomicUsize>);

async fn answer(
    State((known, calls)): State<BackendState>,
    Path(job_id): Path<String>,
) -> Response {
    calls.fetch_add(1, Ordering::SeqCst);
    match known.get(&job_id) {
        Some(body) => (
            StatusCode::OK,
            [("content-type", "application/json")],
            body.clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub fn container(pid: u32, ip: Option<&str>, env: &[&str]) -> Container {
    Container {
        id: format!("container-{pid}"),
        name: format!("mesos-task-{pid}"),
        main_pid: Some(pid),
        ip_addresses: ip.into_iter().map(String::from).collect(),
        env: env.iter().map(|e| e.to_string()).collect(),
    }
}

/// A container whose environment carries `job_id` under the default prefix.
pub fn tagged(pid: u32, ip: Option<&str>, job_id: &str) -> Container {
    container(pid, ip, &[format!("TARDIS_SCHID={job_id}").as_str()])
}

pub fn inventory_of(containers: Vec<Container>) -> ContainerInventory {
    let mut runtime = MockContainerRuntime::new();
    let ids: Vec<String> = containers.iter().map(|c| c.id.clone()).collect();
    runtime
        .expect_running_container_ids()
        .returning(move || Ok(ids.clone()));
    runtime
        .expect_inspect()
        .returning(move |id| Ok(containers.iter().find(|c| c.id == id).cloned()));
    ContainerInventory::new(Arc::new(runtime))
}

/// Every port belongs to `pid`, whose parent is `parent`.
pub fn process_tree(pid: u32, parent: u32) -> (MockPortOwnerLookup, MockProcessTree) {
    let mut lookup = MockPortOwnerLookup::new();
    lookup.expect_owner_of().returning(move |_| Ok(pid));

    let mut tree = MockProcessTree::new();
    tree.expect_parent_of()
        .returning(move |child| (child == pid).then_some(parent));
    (lookup, tree)
}

pub fn no_process_lookups() -> (MockPortOwnerLookup, MockProcessTree) {
    let mut lookup = MockPortOwnerLookup::new();
    lookup.expect_owner_of().never();
    let mut tree = MockProcessTree::new();
    tree.expect_parent_of().never();
    (lookup, tree)
}

pub fn proxy(
    host_ip: &str,
    processes: (MockPortOwnerLookup, MockProcessTree),
    containers: Vec<Container>,
    backend_url: &str,
) -> Router {
    let (lookup, tree) = processes;
    let resolver = IdentityResolver::builder()
        .host_ip(host_ip.parse().unwrap())
        .job_id_prefix("TARDIS_SCHID=")
        .port_owners(Arc::new(lookup))
        .processes(Arc::new(tree))
        .inventory(inventory_of(containers))
        .build();
    let backend = CredentialsBackend::new(backend_url, Duration::from_secs(5)).unwrap();

    get_app(ProxyState::new(resolver, backend))
}

pub fn credentials_request(peer: &str) -> Request<Body> {
    let peer: SocketAddr = peer.parse().unwrap();
    Request::builder()
        .uri("/v2/credentials")
        .extension(ConnectInfo(peer))
        .body(Body::empty())
        .unwrap()
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
