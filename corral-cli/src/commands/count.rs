//! `corral count` command - CPU-bound counting on worker threads.

use corral_core::{
    Batch, Completed, CountTask, Dispatcher, collect_values, timed, worker_pool,
};

use crate::cli::{CountArgs, DrainMode};
use crate::config::Config;
use crate::error::{CliError, CliResult};
use crate::output::{self, kv};

/// Run the count command
pub async fn run(args: CountArgs, config: &Config) -> CliResult<()> {
    if args.numbers.is_empty() {
        return Err(CliError::Command("nothing to count".to_string()));
    }

    let pool_config = config.worker_pool(args.workers);

    output::header("Count");
    kv("Workers", &pool_config.capacity.to_string());
    kv("Mode", &args.mode.to_string());
    kv("Tasks", &args.numbers.len().to_string());
    output::newline();

    let pool = worker_pool(&pool_config)?;
    let dispatcher = Dispatcher::new(pool.clone());
    let batch: Batch<CountTask> = args.numbers.iter().copied().map(CountTask::new).collect();

    let run = timed("count", async {
        match args.mode {
            DrainMode::AsCompleted => {
                let mut completions = dispatcher.as_completed(batch);
                let mut results = Vec::with_capacity(completions.total());
                while let Some(done) = completions.recv().await {
                    print_result(&done, &args.numbers);
                    results.push(done);
                }
                results
            }
            DrainMode::WaitAll => {
                let results = dispatcher.run_concurrent(batch).await;
                for done in &results {
                    print_result(done, &args.numbers);
                }
                results
            }
        }
    })
    .await;

    // Joins every worker thread.
    drop(pool.shutdown().await);

    output::newline();
    kv("Elapsed", &output::seconds(run.elapsed));

    collect_values(run.value)?;
    Ok(())
}

fn print_result(done: &Completed<u64>, numbers: &[u64]) {
    let target = numbers.get(done.task_id.index()).copied().unwrap_or_default();
    let line = match &done.result {
        Ok(value) => format!(
            "{} count({}) = {}",
            done.task_id,
            target,
            output::style_success(&value.to_string())
        ),
        Err(e) => format!("{} count({}) {}", done.task_id, target, output::style_error(&e.to_string())),
    };
    output::timestamped(&line);
}
