use serde::Serialize;
use tracing::{event, Level};
use wasm_bindgen::JsValue;

use hostloop::{Host, MachineState};

/// What the page is given to draw from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct DisplayState {
    pub(crate) instruction_pointer: u32,
    pub(crate) halted: bool,
    pub(crate) monotonic_uptime: u32,
    pub(crate) wall_clock_seconds: u64,
}

impl DisplayState {
    pub(crate) fn of(machine: &MachineState) -> DisplayState {
        DisplayState {
            instruction_pointer: machine.instruction_pointer,
            halted: machine.halted,
            monotonic_uptime: machine.rtc.monotonic_uptime,
            wall_clock_seconds: machine.rtc.wall_clock_seconds,
        }
    }
}

/// The browser page, as seen by the frame loop.  Redraws are handed
/// to a JavaScript callback; quitting is requested by the page.
#[derive(Debug, Default)]
pub(crate) struct PageHost {
    redraw: Option<js_sys::Function>,
    quit: bool,
    redraws: u64,
}

impl PageHost {
    pub(crate) fn new(redraw: Option<js_sys::Function>) -> PageHost {
        PageHost {
            redraw,
            quit: false,
            redraws: 0,
        }
    }

    pub(crate) fn request_quit(&mut self) {
        self.quit = true;
    }

    pub(crate) fn redraws(&self) -> u64 {
        self.redraws
    }
}

impl Host for PageHost {
    fn redraw(&mut self, machine: &MachineState) {
        self.redraws += 1;
        if let Some(callback) = self.redraw.as_ref() {
            let state = match serde_wasm_bindgen::to_value(&DisplayState::of(machine)) {
                Ok(state) => state,
                Err(e) => {
                    event!(Level::ERROR, "failed to convert display state: {e}");
                    return;
                }
            };
            if let Err(e) = callback.call1(&JsValue::NULL, &state) {
                event!(Level::ERROR, "redraw callback failed: {e:?}");
            }
        }
    }

    fn poll_events(&mut self, _machine: &mut MachineState) -> bool {
        self.quit
    }
}
