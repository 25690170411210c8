use async_stream::stream;
use futures::stream::Stream;
use futures::stream::StreamExt;
use ot_sdk::{
    attrs, EditorAdapter, EditorClient, MemoryDatabase, MemoryEditor, MemoryServer,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub type HarnessResult<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Sync rounds `drain` allows before giving up on the sessions settling.
const MAX_DRAIN_ROUNDS: usize = 1000;

type Session = EditorClient<MemoryEditor, MemoryDatabase>;

/// Parameters of one stress run.
#[derive(Clone, Debug)]
pub struct StressConfig {
    pub num_clients: usize,
    pub edits_per_client: usize,
    /// Scheduled sync/undo/redo steps after the editing phase.
    pub num_steps: usize,
    /// Probability that a client syncs between two of its own edits.
    pub sync_probability: f64,
    pub seed: u64,
    pub initial_document: String,
}

impl StressConfig {
    pub fn validate(&self) -> HarnessResult<()> {
        if self.num_clients == 0 {
            return Err("a stress run needs at least one client".into());
        }
        if !(0.0..=1.0).contains(&self.sync_probability) {
            return Err(format!(
                "sync probability {} is outside 0..=1",
                self.sync_probability
            )
            .into());
        }
        Ok(())
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            num_clients: 4,
            edits_per_client: 100,
            num_steps: 200,
            sync_probability: 0.3,
            seed: 42,
            initial_document: "The quick brown fox jumps over the lazy dog".to_string(),
        }
    }
}

/// Statistics collected during stress testing
#[derive(Clone, Debug)]
pub struct StressTestStats {
    pub num_clients: usize,
    pub edits_per_client: usize,
    pub total_syncs: usize,
    pub revisions: usize,
    pub document_len: usize,
    pub total_time: Duration,
    pub avg_sync_time: Duration,
    pub ops_per_second: f64,
    pub converged: bool,
}

impl StressTestStats {
    /// Fail unless every client ended on the server's document.
    pub fn ensure_converged(&self) -> HarnessResult<()> {
        if !self.converged {
            return Err(format!(
                "{} clients diverged after {} revisions",
                self.num_clients, self.revisions
            )
            .into());
        }
        Ok(())
    }

    pub fn print(&self) {
        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║              Stress Test Statistics                         ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Number of Clients:         {:>30} ║", self.num_clients);
        println!("║  Edits per Client:          {:>30} ║", self.edits_per_client);
        println!("║  Total Sync Operations:     {:>30} ║", self.total_syncs);
        println!("║  Committed Revisions:       {:>30} ║", self.revisions);
        println!("║  Final Document Length:     {:>30} ║", self.document_len);
        println!(
            "║  Total Time:                {:>29}s ║",
            format!("{:.3}", self.total_time.as_secs_f64())
        );
        println!("║  Average Sync Time:         {:>28}µs ║", self.avg_sync_time.as_micros());
        println!("║  Operations/Second:         {:>30.0} ║", self.ops_per_second);
        println!(
            "║  Converged:                 {:>30} ║",
            if self.converged { "yes" } else { "NO" }
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

/// What a scheduled step asks a client to do.
#[derive(Clone, Copy, Debug)]
enum Step {
    Sync,
    Undo,
    Redo,
}

/// Generator that yields `(client, step)` pairs for the scheduling phase
fn schedule_generator(
    num_clients: usize,
    num_steps: usize,
    seed: u64,
) -> impl Stream<Item = (usize, Step)> {
    stream! {
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..num_steps {
            let client = rng.gen_range(0..num_clients);
            let step = match rng.gen_range(0..10) {
                0 => Step::Undo,
                1 => Step::Redo,
                _ => Step::Sync,
            };
            yield (client, step);
        }
    }
}

/// One random local edit: typing, deleting or formatting.
fn random_edit(session: &mut Session, rng: &mut StdRng) -> ot_sdk::Result<()> {
    let len = session.editor().len();
    match rng.gen_range(0..6) {
        0..=2 => {
            let at = rng.gen_range(0..=len);
            let text: String = (0..rng.gen_range(1..5))
                .map(|_| rng.gen_range(b'a'..=b'z') as char)
                .collect();
            session.apply_local(|editor| editor.insert(at, &text))
        }
        3 | 4 if len > 0 => {
            let at = rng.gen_range(0..len);
            let n = rng.gen_range(1..=(len - at).min(3));
            session.apply_local(|editor| editor.delete(at, n))
        }
        _ if len > 0 => {
            let at = rng.gen_range(0..len);
            let n = rng.gen_range(1..=(len - at).min(5));
            let bold = rng.gen_bool(0.5);
            session.apply_local(|editor| editor.format(at, n, attrs([("bold", bold)])))
        }
        _ => session.apply_local(|editor| editor.insert(0, "x")),
    }
}

async fn timed_sync(
    session: &Arc<Mutex<Session>>,
    sync_times: &mut Vec<Duration>,
    total_syncs: &mut usize,
) -> HarnessResult<usize> {
    let sync_start = Instant::now();
    let handled = session.lock().await.sync()?;
    sync_times.push(sync_start.elapsed());
    *total_syncs += 1;
    Ok(handled)
}

/// Deliver everything still in flight.
async fn drain(
    sessions: &[Arc<Mutex<Session>>],
    sync_times: &mut Vec<Duration>,
    total_syncs: &mut usize,
) -> HarnessResult<()> {
    for _ in 0..MAX_DRAIN_ROUNDS {
        let mut handled = 0;
        let mut settled = true;
        for session in sessions {
            handled += timed_sync(session, sync_times, total_syncs).await?;
            settled &= session.lock().await.client().is_synchronized();
        }
        if handled == 0 && settled {
            return Ok(());
        }
    }
    Err(format!("sessions did not settle within {} sync rounds", MAX_DRAIN_ROUNDS).into())
}

/// Stress test for concurrent text editing over a shared in-memory log
pub async fn stress_test_editing(config: StressConfig) -> HarnessResult<StressTestStats> {
    config.validate()?;

    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║        Collaborative Editing Stress Test (Async)           ║");
    println!(
        "║  Clients: {} | Edits/Client: {} | Steps: {} ║",
        config.num_clients, config.edits_per_client, config.num_steps
    );
    println!("╚════════════════════════════════════════════════════════════╝");

    let start = Instant::now();
    let server = MemoryServer::with_document(&config.initial_document);

    // Initialize sessions
    let mut sessions: Vec<Arc<Mutex<Session>>> = Vec::with_capacity(config.num_clients);
    for idx in 0..config.num_clients {
        let database = server.connect(format!("client-{}", idx));
        let mut session = EditorClient::new(MemoryEditor::new(), database);
        session.sync()?;
        session.on_focus()?;
        sessions.push(Arc::new(Mutex::new(session)));
    }

    println!("\n[Phase 1/3] Editing concurrently...");

    // Phase 1: every client edits, syncing now and then
    let mut handles = vec![];
    for (idx, session) in sessions.iter().enumerate() {
        let session = Arc::clone(session);
        let edits = config.edits_per_client;
        let sync_probability = config.sync_probability;
        let seed = config.seed.wrapping_add(idx as u64);
        let handle = tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(seed);
            for i in 0..edits {
                let mut guard = session.lock().await;
                random_edit(&mut guard, &mut rng)?;
                if rng.gen_bool(sync_probability) {
                    guard.sync()?;
                }
                drop(guard);

                if i % 10 == 0 {
                    tokio::task::yield_now().await;
                }
            }
            Ok::<(), ot_sdk::SdkError>(())
        });
        handles.push(handle);
    }

    // Wait for all edits to complete
    for handle in handles {
        handle.await??;
    }

    println!("[Phase 1/3] ✓ Completed");
    println!("[Phase 2/3] Running scheduled syncs, undos and redos...");

    // Phase 2: scheduled steps using stream
    let mut sync_times = vec![];
    let mut total_syncs = 0;
    let mut schedule = Box::pin(schedule_generator(
        config.num_clients,
        config.num_steps,
        config.seed,
    ));

    while let Some((idx, step)) = schedule.next().await {
        let session = &sessions[idx];
        match step {
            Step::Sync => {
                timed_sync(session, &mut sync_times, &mut total_syncs).await?;
            }
            Step::Undo => session.lock().await.undo()?,
            Step::Redo => session.lock().await.redo()?,
        }
        debug!(client = idx, ?step, "scheduled step");
    }

    println!("[Phase 2/3] ✓ Completed");
    println!("[Phase 3/3] Draining in-flight operations...");

    drain(&sessions, &mut sync_times, &mut total_syncs).await?;

    let document = server.document();
    let mut converged = true;
    for (idx, session) in sessions.iter().enumerate() {
        let text = session.lock().await.editor().text();
        if text != document {
            warn!(client = idx, "client diverged from the server document");
            converged = false;
        }
    }

    let total_time = start.elapsed();

    // Calculate statistics
    let avg_sync_time = if !sync_times.is_empty() {
        sync_times.iter().sum::<Duration>() / sync_times.len() as u32
    } else {
        Duration::ZERO
    };

    let total_operations = (config.num_clients * config.edits_per_client) + total_syncs;
    let ops_per_second = total_operations as f64 / total_time.as_secs_f64();

    println!("[Phase 3/3] ✓ Completed");
    info!(revisions = server.revision(), converged, "stress run finished");

    Ok(StressTestStats {
        num_clients: config.num_clients,
        edits_per_client: config.edits_per_client,
        total_syncs,
        revisions: server.revision(),
        document_len: document.chars().count(),
        total_time,
        avg_sync_time,
        ops_per_second,
        converged,
    })
}

/// Stress runs over a growing number of clients
pub async fn stress_test_scaling(max_clients: usize, step_size: usize) -> HarnessResult<()> {
    if step_size == 0 {
        return Err("scaling step size must be at least one client".into());
    }

    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║      Scaling Analysis - Editing Throughput vs Clients      ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let mut current_clients = step_size;
    while current_clients <= max_clients {
        let config = StressConfig {
            num_clients: current_clients,
            edits_per_client: 50,
            num_steps: current_clients * 20,
            ..StressConfig::default()
        };
        let stats = stress_test_editing(config).await?;
        stats.print();
        stats.ensure_converged()?;
        current_clients += step_size;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_small_run_converges() {
        let config = StressConfig {
            num_clients: 3,
            edits_per_client: 30,
            num_steps: 60,
            ..StressConfig::default()
        };
        let stats = stress_test_editing(config).await.unwrap();
        assert!(stats.converged);
        assert!(stats.ensure_converged().is_ok());
        assert!(stats.revisions > 1);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let no_clients = StressConfig {
            num_clients: 0,
            ..StressConfig::default()
        };
        assert!(stress_test_editing(no_clients).await.is_err());

        let bad_probability = StressConfig {
            sync_probability: 1.5,
            ..StressConfig::default()
        };
        assert!(stress_test_editing(bad_probability).await.is_err());

        assert!(stress_test_scaling(12, 0).await.is_err());
    }

    #[test]
    fn test_divergence_is_an_error() {
        let stats = StressTestStats {
            num_clients: 2,
            edits_per_client: 1,
            total_syncs: 0,
            revisions: 2,
            document_len: 0,
            total_time: Duration::ZERO,
            avg_sync_time: Duration::ZERO,
            ops_per_second: 0.0,
            converged: false,
        };
        assert!(stats.ensure_converged().is_err());
    }

    #[tokio::test]
    async fn test_drain_settles_in_flight_edits() {
        let server = MemoryServer::new();
        let mut session = EditorClient::new(MemoryEditor::new(), server.connect("solo"));
        session.sync().unwrap();
        session.apply_local(|editor| editor.insert(0, "abc")).unwrap();
        let sessions = vec![Arc::new(Mutex::new(session))];

        let mut sync_times = vec![];
        let mut total_syncs = 0;
        drain(&sessions, &mut sync_times, &mut total_syncs).await.unwrap();

        assert!(sessions[0].lock().await.client().is_synchronized());
        assert!(total_syncs >= 1);
    }
}
