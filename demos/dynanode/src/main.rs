use anyhow::{bail, Context, Result};
use axum::{
    extract::State as AxumState,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clap::{Args, Parser, Subcommand};
use dynakv::{
    gossip::{GossipEngine, GossipReport},
    node::NodeStatus,
    Coordinator, Entry, Error, Node, NodeConfig, NodeInfo, PeerInterface, PutArgs, VectorClock,
    VersionContext,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "dynanode")]
#[command(about = "Dynamo-style replica node built on dynakv", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a replica
    Run(RunArgs),
    /// Coordinated write through a node
    Put {
        /// Node to talk to (host:port)
        #[arg(short, long)]
        node: String,
        key: String,
        value: String,
        /// Context clock from a previous read, e.g. "n0=2,n1=1"
        #[arg(short, long, default_value = "")]
        clock: String,
    },
    /// Coordinated read through a node
    Get {
        #[arg(short, long)]
        node: String,
        key: String,
    },
    /// Make a node push its whole store to its peers
    Gossip {
        #[arg(short, long)]
        node: String,
    },
    /// Make a node unavailable for a while
    Crash {
        #[arg(short, long)]
        node: String,
        seconds: u64,
    },
    /// Replace a node's preference list
    SetPeers {
        #[arg(short, long)]
        node: String,
        /// e.g. "n0=127.0.0.1:8080,n1=127.0.0.1:8081"
        peers: String,
    },
    /// Show a node's status
    Status {
        #[arg(short, long)]
        node: String,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Node ID used in vector clocks
    #[arg(short, long)]
    id: String,

    /// Listen address
    #[arg(long, default_value = "127.0.0.1")]
    addr: String,

    /// Listen port
    #[arg(short, long)]
    port: u16,

    /// Write quorum W
    #[arg(short = 'w', long, default_value_t = 1)]
    write_quorum: usize,

    /// Read quorum R
    #[arg(short = 'r', long, default_value_t = 1)]
    read_quorum: usize,

    /// Preference list, self included (e.g. "n0=127.0.0.1:8080,n1=127.0.0.1:8081")
    #[arg(long, default_value = "")]
    peers: String,

    /// Seconds between gossip rounds, 0 disables periodic gossip
    #[arg(long, default_value_t = 0)]
    gossip_interval: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct KeyRequest {
    key: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CrashRequest {
    seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorBody {
    error: String,
    unavailable_for_ms: u64,
}

fn parse_peers(peers: &str) -> Result<Vec<NodeInfo>> {
    peers
        .split(',')
        .map(str::trim)
        .filter(|peer| !peer.is_empty())
        .map(|peer| {
            let (id, endpoint) = peer
                .split_once('=')
                .with_context(|| format!("Peer {peer:?} is not id=host:port"))?;
            let (host, port) = endpoint
                .rsplit_once(':')
                .with_context(|| format!("Peer {peer:?} has no port"))?;
            let port = port
                .parse()
                .with_context(|| format!("Peer {peer:?} has an invalid port"))?;
            Ok(NodeInfo::new(host, port, id))
        })
        .collect()
}

fn parse_clock(clock: &str) -> Result<VectorClock> {
    clock
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (node, count) = pair
                .split_once('=')
                .with_context(|| format!("Clock entry {pair:?} is not node=count"))?;
            let count: u64 = count
                .parse()
                .with_context(|| format!("Clock entry {pair:?} has an invalid count"))?;
            Ok((node.to_string(), count))
        })
        .collect()
}

/// Peer calls over HTTP/JSON
#[derive(Clone)]
struct HttpNetwork {
    client: reqwest::Client,
}

impl HttpNetwork {
    fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn call<Req, Resp>(
        &self,
        peer: &NodeInfo,
        path: &str,
        body: &Req,
    ) -> dynakv::Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned + Send,
    {
        let unreachable = |reason: String| Error::PeerUnreachable {
            peer: peer.endpoint(),
            reason,
        };

        let url = format!("http://{}{path}", peer.endpoint());
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| unreachable(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            let body: ErrorBody = resp.json().await.map_err(|e| unreachable(e.to_string()))?;
            return Err(Error::Unavailable {
                node_id: peer.node_id.clone(),
                remaining: Duration::from_millis(body.unavailable_for_ms),
            });
        }
        if !resp.status().is_success() {
            return Err(unreachable(format!("HTTP {}", resp.status())));
        }
        resp.json::<Resp>()
            .await
            .map_err(|e| unreachable(e.to_string()))
    }
}

impl PeerInterface for HttpNetwork {
    async fn put_local(&self, peer: &NodeInfo, args: PutArgs) -> dynakv::Result<bool> {
        self.call(peer, "/put_local", &args).await
    }

    async fn get_local(&self, peer: &NodeInfo, key: &str) -> dynakv::Result<Vec<Entry>> {
        let request = KeyRequest {
            key: key.to_string(),
        };
        self.call(peer, "/get_local", &request).await
    }
}

struct AppState {
    node: Arc<Node>,
    coordinator: Coordinator<HttpNetwork>,
    gossip: Arc<GossipEngine<HttpNetwork>>,
}

struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, unavailable_for_ms) = match &self.0 {
            Error::Unavailable { remaining, .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
            ),
            Error::PeerUnreachable { .. } => (StatusCode::BAD_GATEWAY, 0),
            Error::ClockOverflow { .. } | Error::InvalidConfig(_) => (StatusCode::BAD_REQUEST, 0),
        };
        let body = ErrorBody {
            error: self.0.to_string(),
            unavailable_for_ms,
        };
        (status, Json(body)).into_response()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await?,
        Commands::Put {
            node,
            key,
            value,
            clock,
        } => {
            let args = PutArgs::new(key, VersionContext::new(parse_clock(&clock)?), value);
            let quorum_met: bool = post_json(&node, "/put", &args).await?;
            println!("{}", if quorum_met { "ok" } else { "write quorum not met" });
        }
        Commands::Get { node, key } => {
            let entries: Vec<Entry> = post_json(&node, "/get", &KeyRequest { key }).await?;
            print_entries(&entries);
        }
        Commands::Gossip { node } => {
            let report: GossipReport = post_json(&node, "/gossip", &()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Crash { node, seconds } => {
            let () = post_json(&node, "/crash", &CrashRequest { seconds }).await?;
            println!("{node} unavailable for {seconds}s");
        }
        Commands::SetPeers { node, peers } => {
            let () = post_json(&node, "/peers", &parse_peers(&peers)?).await?;
            println!("ok");
        }
        Commands::Status { node } => {
            let status: NodeStatus = reqwest::get(format!("http://{node}/debug/status"))
                .await
                .context("Failed to reach node")?
                .json()
                .await
                .context("Failed to parse status")?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}

async fn run_node(args: RunArgs) -> Result<()> {
    let peers = parse_peers(&args.peers)?;
    let config = NodeConfig::new(
        args.id,
        args.addr,
        args.port,
        args.write_quorum,
        args.read_quorum,
    );
    let socket_addr: SocketAddr = config.self_node().endpoint().parse()?;

    info!(
        "Starting node {} on {} (W={}, R={}, {} peers)",
        config.node_id,
        socket_addr,
        config.write_quorum,
        config.read_quorum,
        peers.len()
    );

    let node = Arc::new(Node::new(config, peers)?);
    let network = Arc::new(HttpNetwork::new());
    let gossip = Arc::new(GossipEngine::new(node.clone(), network.clone()));

    if args.gossip_interval > 0 {
        let _gossip_task = gossip
            .clone()
            .start_gossip_tasks(Duration::from_secs(args.gossip_interval));
        info!("Periodic gossip every {}s", args.gossip_interval);
    }

    let state = Arc::new(AppState {
        node: node.clone(),
        coordinator: Coordinator::new(node, network),
        gossip,
    });

    let app = Router::new()
        .route("/put_local", post(handle_put_local))
        .route("/get_local", post(handle_get_local))
        .route("/put", post(handle_put))
        .route("/get", post(handle_get))
        .route("/gossip", post(handle_gossip))
        .route("/crash", post(handle_crash))
        .route("/peers", post(handle_set_peers))
        .route("/debug/status", get(handle_status))
        .with_state(state);

    info!("HTTP server listening on {}", socket_addr);
    axum::serve(TcpListener::bind(socket_addr).await?, app).await?;

    Ok(())
}

async fn handle_put_local(
    AxumState(state): AxumState<Arc<AppState>>,
    Json(args): Json<PutArgs>,
) -> Result<Json<bool>, ApiError> {
    Ok(Json(state.node.put_local(args)?))
}

async fn handle_get_local(
    AxumState(state): AxumState<Arc<AppState>>,
    Json(req): Json<KeyRequest>,
) -> Result<Json<Vec<Entry>>, ApiError> {
    Ok(Json(state.node.get_local(&req.key)?))
}

async fn handle_put(
    AxumState(state): AxumState<Arc<AppState>>,
    Json(args): Json<PutArgs>,
) -> Result<Json<bool>, ApiError> {
    Ok(Json(state.coordinator.put(args).await?))
}

async fn handle_get(
    AxumState(state): AxumState<Arc<AppState>>,
    Json(req): Json<KeyRequest>,
) -> Result<Json<Vec<Entry>>, ApiError> {
    Ok(Json(state.coordinator.get(&req.key).await?))
}

async fn handle_gossip(AxumState(state): AxumState<Arc<AppState>>) -> Json<GossipReport> {
    Json(state.gossip.gossip().await)
}

async fn handle_crash(
    AxumState(state): AxumState<Arc<AppState>>,
    Json(req): Json<CrashRequest>,
) -> Json<()> {
    state.node.crash(Duration::from_secs(req.seconds));
    Json(())
}

async fn handle_set_peers(
    AxumState(state): AxumState<Arc<AppState>>,
    Json(peers): Json<Vec<NodeInfo>>,
) -> Json<()> {
    state.node.set_peer_list(peers);
    Json(())
}

async fn handle_status(AxumState(state): AxumState<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.node.status()))
}

async fn post_json<Req: Serialize, Resp: DeserializeOwned>(
    node: &str,
    path: &str,
    body: &Req,
) -> Result<Resp> {
    let resp = reqwest::Client::new()
        .post(format!("http://{node}{path}"))
        .json(body)
        .send()
        .await
        .with_context(|| format!("Failed to reach {node}"))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("{node}{path} failed with {status}: {body}");
    }
    resp.json().await.context("Failed to parse response")
}

fn format_clock(clock: &VectorClock) -> String {
    clock
        .counters()
        .iter()
        .map(|(node, count)| format!("{node}={count}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn print_entries(entries: &[Entry]) {
    if entries.is_empty() {
        println!("(no versions)");
        return;
    }
    for entry in entries {
        println!(
            "{:?}  clock: {}",
            String::from_utf8_lossy(&entry.value),
            format_clock(entry.clock())
        );
    }
    if entries.len() > 1 {
        let merged = VersionContext::merged(entries);
        println!(
            "{} siblings; to resolve, write with --clock {}",
            entries.len(),
            format_clock(&merged.clock)
        );
    }
}
