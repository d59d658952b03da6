//! Demo entry point (SPEC_FULL.md §2): loads a `Config`, constructs the
//! process-wide `Scheduler`, wires one `SyncerEngine` against in-memory
//! tenant/super apiserver test doubles, and runs the background GC/patrol
//! timers for a short demonstration window. Mirrors the teacher's
//! `main.rs` in spirit — a self-contained run rather than a connection to a
//! real cluster, which is explicitly out of scope (spec.md §1).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::info;

use vcluster_scheduler_core::client::{SuperClient, TenantClient};
use vcluster_scheduler_core::config::Config;
use vcluster_scheduler_core::core::common::namespace_key;
use vcluster_scheduler_core::core::gc::spawn_shadow_gc;
use vcluster_scheduler_core::core::scheduler_cache::{Scheduler, SchedulerCache};
use vcluster_scheduler_core::multicluster::controller::MultiClusterController;
use vcluster_scheduler_core::multicluster::spec::VirtualClusterSpec;
use vcluster_scheduler_core::syncer::object::{ObjectMeta, SyncedObject};
use vcluster_scheduler_core::syncer::pod_sync::PodSyncer;
use vcluster_scheduler_core::syncer::{spawn_patrol, spawn_uws, SyncerEngine};
use vcluster_scheduler_core::test_util::{self, InMemorySuperClient, InMemoryTenantClient};

#[derive(Parser, Debug)]
#[command(name = "vcluster-scheduler-core", about = "Virtual-cluster scheduler cache and syncer demo")]
struct Cli {
    /// Path to a YAML config file (SPEC_FULL.md §2).
    #[arg(long)]
    config: PathBuf,

    /// How long the demo run stays up before the GC/patrol timers are
    /// stopped and the process exits.
    #[arg(long, default_value_t = 2)]
    run_seconds: u64,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let raw = std::fs::read_to_string(&cli.config)
        .unwrap_or_else(|e| panic!("failed to read config {:?}: {}", cli.config, e));
    let config: Config = serde_yaml::from_str(&raw).expect("invalid config yaml");
    info!("starting {}", config.name);

    let cache = Arc::new(SchedulerCache::default());
    let scheduler = Arc::new(Scheduler::with_shared_cache(cache.clone()));
    scheduler.cache.add_tenant("acme");
    scheduler
        .cache
        .add_cluster("c1", Default::default(), test_util::resources(&[("cpu", 2000), ("mem", 4096)]));

    let ns = test_util::namespace(
        "acme",
        "web",
        &[("cpu", 500), ("mem", 1024)],
        &[("cpu", 500), ("mem", 1024)],
        vec![("c1", 1)],
    );
    if let Err(e) = scheduler.cache.add_namespace(&ns) {
        panic!("demo namespace placement failed: {}", e);
    }
    info!("cache after initial placement:\n{}", scheduler.cache.dump());

    let shadow_gc = spawn_shadow_gc(cache.clone(), config.shadow_gc_interval());

    let spec = VirtualClusterSpec {
        transparent_meta_prefixes: vec!["tenancy.x-k8s.io/".to_string()],
        cluster_domain: "cluster.local".to_string(),
        cluster_dns_ip: "10.96.0.10".to_string(),
        ..Default::default()
    };
    let tenant_client: Arc<InMemoryTenantClient> = Arc::new(InMemoryTenantClient::new(spec));
    tenant_client.put(SyncedObject {
        meta: ObjectMeta {
            name: "web-0".to_string(),
            namespace: "web".to_string(),
            uid: "uid-web-0".to_string(),
            ..Default::default()
        },
        ..Default::default()
    });

    let mcc: Arc<MultiClusterController<SyncedObject>> =
        Arc::new(MultiClusterController::new(config.worker_pools.low));
    mcc.watch_cluster_resource("c1", tenant_client.clone() as Arc<dyn TenantClient<SyncedObject>>);

    let super_client: Arc<InMemorySuperClient> = Arc::new(InMemorySuperClient::new());
    let engine = Arc::new(SyncerEngine::new(
        Arc::new(PodSyncer::new(Vec::new(), Vec::new())),
        mcc.clone(),
        super_client.clone() as Arc<dyn SuperClient<SyncedObject>>,
    ));

    let patrol = spawn_patrol(engine.clone(), config.patrol_interval());
    let uws = spawn_uws(engine.clone(), config.uws_interval());

    info!("demo namespace key: {}", namespace_key("acme", "web"));
    std::thread::sleep(Duration::from_secs(cli.run_seconds));

    patrol.stop();
    uws.stop();
    shadow_gc.stop();
    mcc.stop();
    info!("super cluster object count after demo run: {}", super_client.len());
}
