//! Platform abstraction layer
//!
//! The simulation knows nothing about windows, input devices or wall-clock
//! time. A [`Host`] supplies those, and [`run`] drives the fixed-rate loop:
//! - Pointer sampling before each frame
//! - Render event delivery after each frame
//! - External events (focus, menus, keys) between frames
//! - Sleeping out the frame budget

pub mod clock;

pub use clock::FramePacer;

use crate::sim::{EndGameStatus, GameSession, Presenter, RunState, TickInput, tick};

/// Everything outside the simulation that the frame loop talks to
pub trait Host {
    /// Pointer x in field coordinates, if the host has a pointer
    fn read_pointer_x(&mut self) -> Option<i32> {
        None
    }

    /// Let the computer play
    fn autopilot(&self) -> bool {
        false
    }

    /// Deliver pending external events (keys, focus, menus) to the session
    fn process_events(&mut self, _session: &mut GameSession) {}

    fn presenter(&mut self) -> &mut dyn Presenter;
}

/// Loop limits
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Stop after this many frames even if the game is still going
    pub max_frames: Option<u64>,
}

/// Hand every queued render event to the presenter
pub fn present(session: &mut GameSession, presenter: &mut dyn Presenter) {
    for event in session.drain_render_events() {
        event.dispatch(presenter);
    }
}

/// One frame: sample the pointer, simulate, present, then take external events
pub fn run_frame(session: &mut GameSession, host: &mut dyn Host) {
    let input = TickInput {
        pointer_x: host.read_pointer_x(),
        autopilot: host.autopilot(),
    };
    tick(session, &input);
    present(session, host.presenter());
    host.process_events(session);
}

/// Run frames until the game stops or the frame limit is hit. Paused frames
/// still count and still pace; only the host can resume the game. Returns
/// the number of frames run.
pub fn run(
    session: &mut GameSession,
    host: &mut dyn Host,
    pacer: &mut FramePacer,
    options: RunOptions,
) -> u64 {
    // Entities created by start_game
    present(session, host.presenter());

    let mut frames = 0;
    while session.state != RunState::Stopped {
        if options.max_frames.is_some_and(|max| frames >= max) {
            log::info!("Frame limit reached after {} frames", frames);
            break;
        }
        pacer.begin_frame();
        run_frame(session, host);
        frames += 1;
        pacer.end_frame();
    }

    // Removals queued by end_game
    present(session, host.presenter());
    if pacer.overruns() > 0 {
        log::debug!("{} of {} frames overran the budget", pacer.overruns(), frames);
    }
    frames
}

/// End a game the loop left running and deliver its removals
pub fn stop(session: &mut GameSession, host: &mut dyn Host) {
    if session.state != RunState::Stopped {
        session.end_game(EndGameStatus::Menu);
        present(session, host.presenter());
    }
}
