use chrono::Utc;
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tessera_any::{AnySupport, CodecError, Value};
use tessera_data::{
    AnyReplicatedData, Clock, DataError, EntityState, LwwStamp, ReplicatedDelta,
    ReplicatedRegister, ResolvedRegister,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const ENTITY_ID: &str = "shared-register";

/// Hub simulation configuration.
#[derive(Clone, Debug)]
pub struct HubConfig {
    /// Number of replica tasks.
    pub replicas: usize,
    /// Register writes each replica makes after its initial value.
    pub writes_per_replica: usize,
    /// Share of writes that use a custom clock instead of the hub's clock.
    pub custom_clock_ratio: f64,
    /// Capacity of the replica-to-hub channel.
    pub channel_capacity: usize,
    /// Seed for the write workload; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            replicas: 4,
            writes_per_replica: 100,
            custom_clock_ratio: 0.5,
            channel_capacity: 64,
            seed: None,
        }
    }
}

/// Builder for hub configuration.
pub struct HubConfigBuilder {
    config: HubConfig,
}

impl HubConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: HubConfig::default(),
        }
    }

    pub fn replicas(mut self, count: usize) -> Self {
        self.config.replicas = count.max(1);
        self
    }

    pub fn writes_per_replica(mut self, count: usize) -> Self {
        self.config.writes_per_replica = count;
        self
    }

    pub fn custom_clock_ratio(mut self, ratio: f64) -> Self {
        self.config.custom_clock_ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity.max(1);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn build(self) -> HubConfig {
        self.config
    }
}

impl Default for HubConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Error, Debug)]
pub enum HubError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Hub stopped before {0} finished")]
    HubClosed(String),

    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Runtime error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
enum HubMessage {
    Delta { node: String, delta: ReplicatedDelta },
    Done { node: String },
}

struct ReplicaOutcome {
    node: String,
    value: Option<Value>,
    applied: usize,
}

struct HubOutcome {
    held: ResolvedRegister,
    received: usize,
    accepted: usize,
}

/// Statistics collected during a hub run
#[derive(Clone, Debug)]
pub struct HubReport {
    pub replicas: usize,
    pub writes_sent: usize,
    pub writes_accepted: usize,
    pub deltas_applied: usize,
    pub winner: Option<Value>,
    pub winning_stamp: Option<LwwStamp>,
    pub converged: bool,
    pub total_time: Duration,
}

impl HubReport {
    pub fn print(&self) {
        let winner = self.winner.as_ref().map(ToString::to_string).unwrap_or_default();
        let stamp = self
            .winning_stamp
            .as_ref()
            .map(|stamp| format!("{}@{}", stamp.node, stamp.clock))
            .unwrap_or_default();

        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║                Hub Simulation Report                       ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Replicas:                  {:>30} ║", self.replicas);
        println!("║  Writes Sent:               {:>30} ║", self.writes_sent);
        println!("║  Writes Accepted:           {:>30} ║", self.writes_accepted);
        println!("║  Deltas Applied:            {:>30} ║", self.deltas_applied);
        println!("║  Winner:                    {:>30} ║", winner);
        println!("║  Winning Stamp:             {:>30} ║", stamp);
        println!("║  Converged:                 {:>30} ║", self.converged);
        println!("║  Total Time:                {:>29}s ║", format!("{:.3}", self.total_time.as_secs_f64()));
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

/// Pick the clock for one write
fn random_clock(rng: &mut StdRng, custom_clock_ratio: f64) -> (Clock, i64) {
    if !rng.gen_bool(custom_clock_ratio) {
        let clock = if rng.gen_bool(0.1) { Clock::Reverse } else { Clock::Default };
        return (clock, 0);
    }

    let custom = rng.gen_range(0..1_000);
    if rng.gen_bool(0.5) {
        (Clock::Custom, custom)
    } else {
        (Clock::CustomAutoIncrement, custom)
    }
}

fn broadcast(outbound: &[mpsc::UnboundedSender<ReplicatedDelta>], held: &ResolvedRegister) {
    let Some(delta) = held.to_delta() else {
        return;
    };
    for (index, replica) in outbound.iter().enumerate() {
        if replica.send(delta.clone()).is_err() {
            debug!(replica = index, "replica already stopped");
        }
    }
}

async fn run_replica(
    index: usize,
    config: HubConfig,
    codec: AnySupport,
    to_hub: mpsc::Sender<HubMessage>,
    mut inbound: mpsc::UnboundedReceiver<ReplicatedDelta>,
) -> Result<ReplicaOutcome, HubError> {
    let node = format!("node-{index}");
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
        None => StdRng::from_entropy(),
    };
    let mut applied = 0;

    let mut entity = EntityState::new(ENTITY_ID);
    entity.set_data(ReplicatedRegister::with_clock(format!("{node}-init"), Clock::Custom, 0)?)?;

    for write in 0..=config.writes_per_replica {
        while let Ok(delta) = inbound.try_recv() {
            entity.apply_delta(&delta, &codec)?;
            applied += 1;
        }

        if write > 0 {
            let (clock, custom) = random_clock(&mut rng, config.custom_clock_ratio);
            if let Some(register) = entity.data_mut().and_then(AnyReplicatedData::as_register_mut) {
                register.set_with_clock(format!("{node}-{write}"), clock, custom)?;
            }
        }

        if let Some(delta) = entity.flush() {
            to_hub
                .send(HubMessage::Delta {
                    node: node.clone(),
                    delta,
                })
                .await
                .map_err(|_| HubError::HubClosed(node.clone()))?;
        }

        if write % 10 == 0 {
            tokio::task::yield_now().await;
        }
    }

    to_hub
        .send(HubMessage::Done { node: node.clone() })
        .await
        .map_err(|_| HubError::HubClosed(node.clone()))?;
    drop(to_hub);

    while let Some(delta) = inbound.recv().await {
        entity.apply_delta(&delta, &codec)?;
        applied += 1;
    }

    let value = entity
        .data()
        .and_then(AnyReplicatedData::as_register)
        .map(|register| register.value().clone());
    Ok(ReplicaOutcome { node, value, applied })
}

async fn run_hub(
    replicas: usize,
    mut inbound: mpsc::Receiver<HubMessage>,
    outbound: Vec<mpsc::UnboundedSender<ReplicatedDelta>>,
) -> HubOutcome {
    let mut held = ResolvedRegister::new();
    let mut received = 0;
    let mut accepted = 0;
    let mut done = 0;

    while let Some(message) = inbound.recv().await {
        match message {
            HubMessage::Delta {
                node,
                delta: ReplicatedDelta::Register(write),
            } => {
                received += 1;
                let now = Utc::now().timestamp_micros();
                if held.accept(&node, &write, now) {
                    accepted += 1;
                    broadcast(&outbound, &held);
                }
            }
            HubMessage::Delta { node, delta } => {
                warn!(node = %node, kind = %delta.kind(), "hub only resolves register deltas");
            }
            HubMessage::Done { node } => {
                done += 1;
                debug!(node = %node, done, "replica finished writing");
                if done == replicas {
                    break;
                }
            }
        }
    }

    // Replicas drain their inbox until the channels close, so this is the
    // last delta each of them applies.
    broadcast(&outbound, &held);

    HubOutcome {
        held,
        received,
        accepted,
    }
}

/// Run replicas against one hub until every replica has written and
/// applied the hub's final value.
pub async fn run_simulation(config: HubConfig) -> Result<HubReport, HubError> {
    info!(
        replicas = config.replicas,
        writes = config.writes_per_replica,
        "starting hub simulation"
    );
    let start = Instant::now();
    let codec = AnySupport::default();

    let (to_hub, hub_inbox) = mpsc::channel(config.channel_capacity);
    let mut outbound = Vec::with_capacity(config.replicas);
    let mut handles = Vec::with_capacity(config.replicas);

    for index in 0..config.replicas {
        let (tx, rx) = mpsc::unbounded_channel();
        outbound.push(tx);
        handles.push(tokio::spawn(run_replica(
            index,
            config.clone(),
            codec.clone(),
            to_hub.clone(),
            rx,
        )));
    }
    drop(to_hub);

    let hub = tokio::spawn(run_hub(config.replicas, hub_inbox, outbound));

    let outcomes = join_all(handles)
        .await
        .into_iter()
        .map(|joined| -> Result<ReplicaOutcome, HubError> { joined? })
        .collect::<Result<Vec<_>, HubError>>()?;
    let hub = hub.await?;

    let winner = hub.held.value().map(|value| codec.decode(value)).transpose()?;
    let converged = winner.is_some() && outcomes.iter().all(|outcome| outcome.value == winner);
    for outcome in outcomes.iter().filter(|outcome| outcome.value != winner) {
        warn!(node = %outcome.node, "replica diverged from the hub");
    }

    let report = HubReport {
        replicas: config.replicas,
        writes_sent: hub.received,
        writes_accepted: hub.accepted,
        deltas_applied: outcomes.iter().map(|outcome| outcome.applied).sum(),
        winner,
        winning_stamp: hub.held.stamp().cloned(),
        converged,
        total_time: start.elapsed(),
    };
    info!(converged = report.converged, "hub simulation finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = HubConfigBuilder::new()
            .replicas(0)
            .writes_per_replica(7)
            .custom_clock_ratio(3.0)
            .channel_capacity(0)
            .seed(9)
            .build();

        assert_eq!(config.replicas, 1);
        assert_eq!(config.writes_per_replica, 7);
        assert_eq!(config.custom_clock_ratio, 1.0);
        assert_eq!(config.channel_capacity, 1);
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn test_random_clock_without_custom_share() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let (clock, custom) = random_clock(&mut rng, 0.0);
            assert!(matches!(clock, Clock::Default | Clock::Reverse));
            assert_eq!(custom, 0);
        }
    }

    #[tokio::test]
    async fn test_replicas_converge() {
        let config = HubConfigBuilder::new()
            .replicas(3)
            .writes_per_replica(20)
            .channel_capacity(4)
            .seed(42)
            .build();

        let report = run_simulation(config).await.unwrap();

        assert!(report.converged);
        assert_eq!(report.writes_sent, 3 * 21);
        assert!(report.writes_accepted >= 1);
        assert!(report.winner.is_some());
    }

    #[tokio::test]
    async fn test_initial_values_alone_converge() {
        let config = HubConfigBuilder::new()
            .replicas(2)
            .writes_per_replica(0)
            .seed(7)
            .build();

        let report = run_simulation(config).await.unwrap();

        // Both initial writes carry custom clock 0, so the lowest node wins
        assert!(report.converged);
        assert_eq!(report.winner, Some(Value::from("node-0-init")));
    }
}
