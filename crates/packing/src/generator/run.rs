//! One packing run on a worker thread.
//!
//! A [`SearchRun`] moves through `Idle -> Running -> Completed | Cancelled`.
//! The generator runs on its own thread with a token that expires after
//! the search budget (`time_limit_ms - reserve_ms`). The caller waits for
//! the result up to the full time limit; the reserve is the grace window
//! in which the worker unwinds and hands over its best packing. A worker
//! that misses the window is abandoned; the run then returns the best
//! packing the worker published through its [`BestSlot`], or the greedy
//! packing if it published none.

use super::greedy::GreedyGenerator;
use super::select_generator;
use rectpack_core::{
    BestSlot, CancelToken, Config, Error, Generator, Instance, PackResult, Result, SearchContext,
};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Stack of the worker thread; the exact packer recurses once per entry.
const WORKER_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Lifecycle of a [`SearchRun`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Not started.
    Idle,
    /// The worker is searching.
    Running,
    /// The generator finished on its own.
    Completed,
    /// The generator was stopped by the budget or by [`SearchRun::cancel`].
    Cancelled,
}

/// Runs the generator chosen by a [`Config`] under its time budget.
#[derive(Debug)]
pub struct SearchRun {
    config: Config,
    state: RunState,
    token: CancelToken,
}

impl SearchRun {
    /// Creates an idle run.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: RunState::Idle,
            token: CancelToken::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// The run configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stops the worker early. Clones of the token stay connected, so this
    /// also works from another thread via [`SearchRun::token`].
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Token shared with the worker.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Packs `instance` and blocks until the result is available.
    ///
    /// Fails if the run was started before, the configuration or the
    /// instance is unusable, or (in debug builds) the packing does not
    /// verify.
    pub fn run(&mut self, instance: &Instance) -> Result<PackResult> {
        let generator = select_generator(&self.config, instance);
        self.run_generator(generator, instance)
    }

    /// Like [`SearchRun::run`], with the generator chosen by the caller.
    pub fn run_generator(
        &mut self,
        mut generator: Box<dyn Generator + Send>,
        instance: &Instance,
    ) -> Result<PackResult> {
        if self.state != RunState::Idle {
            return Err(Error::Internal(format!(
                "search run already used (state {:?})",
                self.state
            )));
        }
        self.config.validate()?;
        instance.validate()?;

        let started = Instant::now();
        let limit = Duration::from_millis(self.config.time_limit_ms);
        let worker_token = self.token.child(self.config.search_budget());
        let slot = BestSlot::new();
        let worker_slot = slot.clone();
        let label = generator.name();
        let worker_instance = instance.clone();
        let (sender, receiver) = mpsc::channel();

        self.state = RunState::Running;
        let handle = thread::Builder::new()
            .name(format!("rectpack-{label}"))
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || {
                let ctx = SearchContext::new(worker_token)
                    .with_label(label)
                    .with_best_slot(worker_slot);
                let outcome = generator.generate(&worker_instance, &ctx);
                // the receiver is gone once the caller gave up on us
                let _ = sender.send(outcome);
            })
            .map_err(|e| Error::Internal(format!("cannot start search worker: {e}")))?;

        let outcome = receiver.recv_timeout(limit.saturating_sub(started.elapsed()));
        let result = match outcome {
            Ok(Ok(result)) => {
                if handle.join().is_err() {
                    log::warn!("{label} worker panicked after reporting");
                }
                self.state = if result.cancelled || self.token.is_flagged() {
                    RunState::Cancelled
                } else {
                    RunState::Completed
                };
                result
            }
            Ok(Err(Error::Cancelled)) => {
                log::warn!("{label} was cancelled before finding a packing");
                self.state = RunState::Cancelled;
                self.fallback(instance, label, &slot)?
            }
            Ok(Err(e)) => {
                self.state = RunState::Completed;
                return Err(e);
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                self.token.cancel();
                log::warn!(
                    "{label} did not stop within the {} ms reserve",
                    self.config.reserve_ms
                );
                self.state = RunState::Cancelled;
                self.fallback(instance, label, &slot)?
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                log::error!("{label} worker died without a result");
                self.state = RunState::Cancelled;
                self.fallback(instance, label, &slot)?
            }
        };

        if cfg!(debug_assertions) {
            if let Some(best) = &result.best {
                best.verify_matches(instance)?;
            }
        }
        log::info!(
            "{}: {} in {} ms, {}",
            result.strategy,
            match &result.best {
                Some(best) => format!("{}x{} (area {})", best.width(), best.height(), best.area()),
                None => "no packing".to_string(),
            },
            started.elapsed().as_millis(),
            result.status
        );
        Ok(result)
    }

    fn fallback(
        &self,
        instance: &Instance,
        label: &'static str,
        slot: &BestSlot,
    ) -> Result<PackResult> {
        if let Some(best) = slot.take() {
            log::info!("{label}: returning its last published packing");
            let mut result = PackResult::new(label);
            result.offer(best);
            result.cancelled = true;
            return Ok(result);
        }
        let ctx = SearchContext::unbounded().with_label("fallback");
        let mut result = GreedyGenerator::new().generate(instance, &ctx)?;
        result.cancelled = true;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rectpack_core::{SolutionStatus, Strategy};

    /// Publishes a one-row packing, then ignores cancellation.
    struct RowThenStall;

    impl Generator for RowThenStall {
        fn name(&self) -> &'static str {
            "row-then-stall"
        }

        fn generate(&mut self, instance: &Instance, ctx: &SearchContext) -> Result<PackResult> {
            let mut row = instance.clone();
            let mut x = 0;
            for index in 0..row.size() {
                row.set_position(index, x, 0);
                x += row.entry(index).effective_width();
            }
            let height = row.tallest();
            row.set_box(x, height);
            let mut result = PackResult::new(self.name());
            ctx.offer(&mut result, row);
            thread::sleep(Duration::from_millis(2_000));
            Ok(result)
        }
    }

    fn instance() -> Instance {
        Instance::from_dimensions(false, None, &[(2, 6), (2, 6), (4, 3), (4, 3)])
    }

    #[test]
    fn test_run_completes() {
        let config = Config::default().with_time_limit(20_000).with_reserve(1_000);
        let mut run = SearchRun::new(config);
        assert_eq!(run.state(), RunState::Idle);
        let result = run.run(&instance()).unwrap();
        assert_eq!(run.state(), RunState::Completed);
        assert_eq!(result.strategy, "bounding-box");
        assert_eq!(result.status, SolutionStatus::Optimal);
        assert_eq!(result.area(), Some(48));
    }

    #[test]
    fn test_run_only_once() {
        let config = Config::default()
            .with_strategy(Strategy::Greedy)
            .with_time_limit(5_000)
            .with_reserve(1_000);
        let mut run = SearchRun::new(config);
        assert!(run.run(&instance()).is_ok());
        assert!(matches!(run.run(&instance()), Err(Error::Internal(_))));
    }

    #[test]
    fn test_cancelled_run_keeps_packing() {
        let config = Config::default()
            .with_strategy(Strategy::FixedHeight)
            .with_time_limit(5_000)
            .with_reserve(1_000)
            .with_seed(9);
        let mut run = SearchRun::new(config);
        run.cancel();
        let result = run.run(&instance()).unwrap();
        assert_eq!(run.state(), RunState::Cancelled);
        assert!(result.cancelled);
        assert!(result.best.unwrap().verify_matches(&instance()).is_ok());
    }

    #[test]
    fn test_stalled_worker_keeps_published_packing() {
        let config = Config::default().with_time_limit(300).with_reserve(100);
        let mut run = SearchRun::new(config);
        let result = run.run_generator(Box::new(RowThenStall), &instance()).unwrap();
        assert_eq!(run.state(), RunState::Cancelled);
        assert!(result.cancelled);
        assert_eq!(result.strategy, "row-then-stall");
        // 2 + 2 + 4 + 4 wide, 6 tall
        assert_eq!(result.area(), Some(72));
        assert!(result.best.unwrap().verify_matches(&instance()).is_ok());
    }

    #[test]
    fn test_rejects_bad_config() {
        let mut run = SearchRun::new(Config::default().with_reserve(400_000));
        assert!(matches!(run.run(&instance()), Err(Error::ConfigError(_))));
        assert_eq!(run.state(), RunState::Idle);
    }
}
