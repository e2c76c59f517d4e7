//! Runs an [`Engine`] on a background thread driven by host commands.
//!
//! The worker blocks while idle. Once a command arrives it drains every
//! queued command before acting on them, then steps the engine until a stop
//! condition is met and reports the stop to all subscribers.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use crossbeam_utils::sync::ShardedLock;
use log::{debug, error};
use picoblaze_core::{Engine, PortBus, SimulationError};
use thiserror::Error;

use crate::breakpoints::Breakpoints;

/// Host request to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Run until a breakpoint or an error.
    Continue,
    /// Stop a running simulation.
    Break,
    /// Execute exactly one step.
    StepInto,
    /// Run until the call stack is no deeper than when the command started.
    StepOver,
    /// Run until the current subroutine returns.
    StepReturn,
    /// Stop the worker thread.
    Dispose,
}

/// Why the simulation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakReason {
    /// A [`Command::Break`] interrupted a run.
    ManualBreak,
    /// An enabled breakpoint was reached.
    BreakpointHit,
    /// A step command finished.
    StepComplete,
    /// The engine reported an error.
    ExecutionError(SimulationError),
}

/// Stop report sent to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    /// Why the simulation stopped.
    pub reason: BreakReason,
    /// Program counter after the stop.
    pub pc: u16,
}

/// Worker thread settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Name given to the worker thread.
    pub thread_name: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            thread_name: "picoblaze-sim".to_owned(),
        }
    }
}

/// Controller failures.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The worker has exited and no longer accepts commands.
    #[error("simulation worker has stopped")]
    Disconnected,
    /// The worker thread could not be started.
    #[error("failed to spawn simulation worker: {0}")]
    Spawn(#[from] io::Error),
    /// The worker thread panicked.
    #[error("simulation worker panicked")]
    WorkerPanicked,
}

type Subscribers = Arc<ShardedLock<Vec<Sender<Notification>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Stepping,
    Running { stop_depth: Option<usize> },
}

impl Mode {
    const fn start(command: Command, depth: usize) -> Self {
        match command {
            Command::StepInto => Self::Stepping,
            Command::StepOver => Self::Running {
                stop_depth: Some(depth),
            },
            // At depth 0 there is nothing to return from.
            Command::StepReturn => Self::Running {
                stop_depth: depth.checked_sub(1),
            },
            Command::Continue => Self::Running { stop_depth: None },
            Command::Break | Command::Dispose => Self::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Drained {
    mode: Mode,
    manual_break: bool,
    dispose: bool,
}

/// Folds one batch of queued commands into the next worker mode.
///
/// Dispose ends the worker. Break forces idle and cancels every run command
/// in the same batch. Otherwise the first run command starts when idle and
/// later ones are ignored.
fn drain(mode: Mode, depth: usize, commands: &[Command]) -> Drained {
    if commands.contains(&Command::Dispose) {
        return Drained {
            mode: Mode::Idle,
            manual_break: false,
            dispose: true,
        };
    }
    if commands.contains(&Command::Break) {
        return Drained {
            mode: Mode::Idle,
            manual_break: mode != Mode::Idle,
            dispose: false,
        };
    }
    let mut next = mode;
    for &command in commands {
        if next == Mode::Idle {
            next = Mode::start(command, depth);
        } else {
            debug!("ignoring {command:?} while busy");
        }
    }
    Drained {
        mode: next,
        manual_break: false,
        dispose: false,
    }
}

/// Drives an [`Engine`] on a background worker thread.
///
/// Dropping the controller stops the worker.
pub struct Controller<P: PortBus + Send + 'static> {
    commands: Sender<Command>,
    subscribers: Subscribers,
    breakpoints: Breakpoints,
    engine: Arc<Mutex<Engine<P>>>,
    worker: Option<JoinHandle<()>>,
}

impl<P: PortBus + Send + 'static> Controller<P> {
    /// Starts a worker for `engine` with the default configuration.
    ///
    /// # Errors
    ///
    /// [`ControllerError::Spawn`] when the thread cannot be created.
    pub fn spawn(engine: Engine<P>) -> Result<Self, ControllerError> {
        Self::with_config(engine, &ControllerConfig::default())
    }

    /// Starts a worker for `engine`.
    ///
    /// # Errors
    ///
    /// [`ControllerError::Spawn`] when the thread cannot be created.
    pub fn with_config(
        engine: Engine<P>,
        config: &ControllerConfig,
    ) -> Result<Self, ControllerError> {
        let (commands, inbox) = unbounded();
        let worker = Worker {
            engine: Arc::new(Mutex::new(engine)),
            inbox,
            subscribers: Subscribers::default(),
            breakpoints: Breakpoints::new(),
            mode: Mode::Idle,
        };
        let engine = Arc::clone(&worker.engine);
        let subscribers = Arc::clone(&worker.subscribers);
        let breakpoints = worker.breakpoints.clone();
        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || worker.run())?;
        Ok(Self {
            commands,
            subscribers,
            breakpoints,
            engine,
            worker: Some(handle),
        })
    }

    /// Queues a command for the worker.
    ///
    /// # Errors
    ///
    /// [`ControllerError::Disconnected`] once the worker has exited.
    pub fn issue(&self, command: Command) -> Result<(), ControllerError> {
        self.commands
            .send(command)
            .map_err(|_| ControllerError::Disconnected)
    }

    /// Issues [`Command::Continue`].
    ///
    /// # Errors
    ///
    /// See [`Controller::issue`].
    pub fn resume(&self) -> Result<(), ControllerError> {
        self.issue(Command::Continue)
    }

    /// Issues [`Command::Break`].
    ///
    /// # Errors
    ///
    /// See [`Controller::issue`].
    pub fn pause(&self) -> Result<(), ControllerError> {
        self.issue(Command::Break)
    }

    /// Issues [`Command::StepInto`].
    ///
    /// # Errors
    ///
    /// See [`Controller::issue`].
    pub fn step_into(&self) -> Result<(), ControllerError> {
        self.issue(Command::StepInto)
    }

    /// Issues [`Command::StepOver`].
    ///
    /// # Errors
    ///
    /// See [`Controller::issue`].
    pub fn step_over(&self) -> Result<(), ControllerError> {
        self.issue(Command::StepOver)
    }

    /// Issues [`Command::StepReturn`].
    ///
    /// # Errors
    ///
    /// See [`Controller::issue`].
    pub fn step_return(&self) -> Result<(), ControllerError> {
        self.issue(Command::StepReturn)
    }

    /// Registers a new listener for stop notifications.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<Notification> {
        let (tx, rx) = unbounded();
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Breakpoints consulted by the worker.
    #[must_use]
    pub const fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    /// Runs `f` with exclusive access to the engine, between steps.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut Engine<P>) -> R) -> R {
        let mut engine = self.engine.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut engine)
    }

    /// Stops the worker and returns the engine.
    ///
    /// # Errors
    ///
    /// [`ControllerError::WorkerPanicked`] when the worker did not exit
    /// cleanly.
    pub fn dispose(mut self) -> Result<Engine<P>, ControllerError> {
        self.shutdown()?;
        let engine = Arc::clone(&self.engine);
        drop(self);
        Arc::try_unwrap(engine)
            .map(|engine| engine.into_inner().unwrap_or_else(PoisonError::into_inner))
            .map_err(|_| ControllerError::WorkerPanicked)
    }

    fn shutdown(&mut self) -> Result<(), ControllerError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        // The worker may already be gone after an explicit Dispose.
        let _ = self.commands.send(Command::Dispose);
        worker.join().map_err(|_| ControllerError::WorkerPanicked)
    }
}

impl<P: PortBus + Send + 'static> Drop for Controller<P> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            error!("{err}");
        }
    }
}

struct Worker<P> {
    engine: Arc<Mutex<Engine<P>>>,
    inbox: Receiver<Command>,
    subscribers: Subscribers,
    breakpoints: Breakpoints,
    mode: Mode,
}

impl<P: PortBus> Worker<P> {
    fn run(mut self) {
        debug!("simulation worker started");
        loop {
            let mut commands = Vec::new();
            if self.mode == Mode::Idle {
                match self.inbox.recv() {
                    Ok(command) => commands.push(command),
                    Err(_) => break,
                }
            }
            commands.extend(self.inbox.try_iter());

            if !commands.is_empty() {
                debug!("commands {commands:?}");
                let depth = self.lock_engine().stack_depth();
                let drained = drain(self.mode, depth, &commands);
                if drained.dispose {
                    break;
                }
                if drained.manual_break {
                    let pc = self.lock_engine().pc();
                    self.notify(BreakReason::ManualBreak, pc);
                }
                self.mode = drained.mode;
            }

            if self.mode != Mode::Idle {
                self.advance();
            }
        }
        debug!("simulation worker stopped");
    }

    fn lock_engine(&self) -> MutexGuard<'_, Engine<P>> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Executes one step and stops when the current mode is satisfied.
    fn advance(&mut self) {
        let (result, pc, depth) = {
            let mut engine = self.lock_engine();
            let result = engine.step();
            (result, engine.pc(), engine.stack_depth())
        };
        let reason = match (result, self.mode) {
            (Err(err), _) => {
                error!("execution stopped at {pc:#05x}: {err}");
                Some(BreakReason::ExecutionError(err))
            }
            (Ok(_), Mode::Stepping) => Some(BreakReason::StepComplete),
            (Ok(_), Mode::Running { stop_depth: Some(target) }) if depth <= target => {
                Some(BreakReason::StepComplete)
            }
            (Ok(_), _) if self.breakpoints.is_enabled(pc) => Some(BreakReason::BreakpointHit),
            (Ok(_), _) => None,
        };
        if let Some(reason) = reason {
            self.mode = Mode::Idle;
            self.notify(reason, pc);
        }
    }

    fn notify(&self, reason: BreakReason, pc: u16) {
        debug!("stopped at {pc:#05x}: {reason:?}");
        let notification = Notification { reason, pc };
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|subscriber| subscriber.send(notification).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn break_cancels_runs_in_the_same_batch() {
        let drained = drain(Mode::Idle, 0, &[Command::Continue, Command::Break]);
        assert_eq!(drained.mode, Mode::Idle);
        assert!(!drained.manual_break);

        let running = Mode::Running { stop_depth: None };
        let drained = drain(running, 0, &[Command::Break, Command::StepInto]);
        assert_eq!(drained.mode, Mode::Idle);
        assert!(drained.manual_break);
    }

    #[test]
    fn first_run_command_wins_while_idle() {
        let drained = drain(Mode::Idle, 2, &[Command::StepOver, Command::Continue]);
        assert_eq!(
            drained.mode,
            Mode::Running {
                stop_depth: Some(2)
            }
        );
        let running = Mode::Running { stop_depth: None };
        assert_eq!(drain(running, 0, &[Command::StepInto]).mode, running);
    }

    #[test]
    fn dispose_overrides_everything() {
        let drained = drain(Mode::Idle, 0, &[Command::Break, Command::Dispose]);
        assert!(drained.dispose);
    }

    #[test]
    fn step_return_targets_the_caller_depth() {
        assert_eq!(
            Mode::start(Command::StepReturn, 3),
            Mode::Running {
                stop_depth: Some(2)
            }
        );
        assert_eq!(
            Mode::start(Command::StepReturn, 0),
            Mode::Running { stop_depth: None }
        );
    }
}
