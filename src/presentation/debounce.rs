use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

/// The search quiet period the web client has always used.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Collapses bursts of values into the last one, emitted after `quiet`
/// passes with no newer value. Dropping the debouncer discards anything
/// still pending.
pub struct Debouncer<T> {
    sender: mpsc::UnboundedSender<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawns the background loop; settled values arrive on the receiver.
    pub fn spawn(quiet: Duration) -> (Self, mpsc::Receiver<T>) {
        let (sender, input) = mpsc::unbounded_channel();
        let (output, settled) = mpsc::channel(16);
        tokio::spawn(Self::debounce_loop(input, output, quiet));
        (Self { sender }, settled)
    }

    /// Replaces any pending value and restarts the quiet period.
    pub fn push(&self, value: T) {
        if self.sender.send(value).is_err() {
            debug!("debounce loop stopped, dropping value");
        }
    }

    async fn debounce_loop(
        mut input: mpsc::UnboundedReceiver<T>,
        output: mpsc::Sender<T>,
        quiet: Duration,
    ) {
        let mut pending: Option<T> = None;
        let timer = tokio::time::sleep(quiet);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                received = input.recv() => match received {
                    Some(value) => {
                        pending = Some(value);
                        timer.as_mut().reset(Instant::now() + quiet);
                    }
                    None => break,
                },
                () = &mut timer, if pending.is_some() => {
                    if let Some(value) = pending.take() {
                        if output.send(value).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_last_value() {
        let (debouncer, mut settled) = Debouncer::spawn(Duration::from_millis(500));
        for term in ["a", "al", "ali", "alic"] {
            debouncer.push(term.to_string());
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        debouncer.push("alice".to_string());

        let started = Instant::now();
        assert_eq!(settled.recv().await.as_deref(), Some("alice"));
        assert!(started.elapsed() >= Duration::from_millis(500));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(settled.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn separated_inputs_each_settle() {
        let (debouncer, mut settled) = Debouncer::spawn(Duration::from_millis(500));
        debouncer.push(1);
        assert_eq!(settled.recv().await, Some(1));
        debouncer.push(2);
        assert_eq!(settled.recv().await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn drop_discards_pending() {
        let (debouncer, mut settled) = Debouncer::spawn(Duration::from_millis(500));
        debouncer.push("x");
        drop(debouncer);
        assert_eq!(settled.recv().await, None);
    }
}
