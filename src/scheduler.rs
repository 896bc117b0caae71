use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Call `pass` once right away and then once per `period` until `shutdown`
/// resolves. Returns the number of passes started.
///
/// The first pass runs even when `shutdown` is already resolved. A pass is
/// awaited before the next tick is taken, so passes never overlap and
/// shutdown is only observed between them. Ticks missed while a slow pass
/// runs are dropped, not replayed.
pub async fn run_on_interval<F, Fut>(
    period: Duration,
    mut pass: F,
    shutdown: impl Future<Output = ()>,
) -> u64
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut tick = tokio::time::interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    // the first tick completes at once
    tick.tick().await;
    let mut runs = 1;
    pass(runs).await;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                debug!(runs, "scheduler stopping");
                break;
            }
            _ = tick.tick() => {
                runs += 1;
                pass(runs).await;
            }
        }
    }
    runs
}
