#![deny(unreachable_pub)]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

//! Runs the frame loop inside a browser page.  The page owns the
//! scheduling: it calls [`Emulator::step`] from its animation-frame
//! callback, passing the current time, until `step` returns false.

mod host;
mod utils;

use tracing::{event, Level};
use wasm_bindgen::prelude::*;

use base::TimingConfig;
use hostloop::{
    init_machine, DiskImage, FrameLoopDriver, FrameReport, IdleEngine, ManualClock,
};

use host::PageHost;
use utils::whole_units_from_js;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    utils::set_panic_hook();
    Ok(())
}

#[wasm_bindgen]
pub fn init(log_level: &str) -> Result<(), JsValue> {
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(utils::try_log_level_from_str(log_level)?)
            .build(),
    );
    event!(
        Level::INFO,
        "init: tracing initialised (max level is {log_level})"
    );
    Ok(())
}

#[wasm_bindgen]
pub struct Emulator {
    driver: FrameLoopDriver<IdleEngine, ManualClock>,
    host: PageHost,
    last_frame: Option<FrameReport>,
}

#[wasm_bindgen]
impl Emulator {
    /// `now_ms` is the page's monotonic clock (for example
    /// `performance.now()`), `unix_seconds` the wall-clock time.
    #[wasm_bindgen(constructor)]
    pub fn new(
        headless: bool,
        redraw: Option<js_sys::Function>,
        now_ms: f64,
        unix_seconds: f64,
    ) -> Result<Emulator, String> {
        let engine = IdleEngine::new();
        let mut machine = init_machine(&engine);
        machine.headless = headless;
        let clock = ManualClock::new(whole_units_from_js(now_ms), whole_units_from_js(unix_seconds));
        let driver =
            FrameLoopDriver::for_external_scheduler(TimingConfig::default(), machine, engine, clock)
                .map_err(|e| format!("invalid timing configuration: {e}"))?;
        Ok(Emulator {
            driver,
            host: PageHost::new(redraw),
            last_frame: None,
        })
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.driver.machine_mut().debug = debug;
    }

    /// Registers a disk image fetched by the page as disk number `id`.
    pub fn attach_disk(&mut self, id: usize, name: String, data: Vec<u8>) {
        if let Some(previous) = self
            .driver
            .machine_mut()
            .attach_disk(id, DiskImage { name, data })
        {
            event!(Level::DEBUG, "disk {id} replaces {}", previous.name);
        }
    }

    /// Replaces the boot ROM.  Returns the number of bytes installed.
    pub fn load_rom(&mut self, image: &[u8]) -> usize {
        let n = self.driver.machine_mut().install_rom(image);
        event!(Level::INFO, "using {n}-byte image supplied by the page as boot ROM");
        n
    }

    /// Runs one frame.  Returns false once the emulator has stopped,
    /// at which point the page should stop calling us.
    pub fn step(&mut self, now_ms: f64, unix_seconds: f64) -> bool {
        self.driver
            .clock_mut()
            .set(whole_units_from_js(now_ms), whole_units_from_js(unix_seconds));
        match self.driver.step(&mut self.host) {
            Some(report) => {
                let keep_going = !report.exit_requested;
                self.last_frame = Some(report);
                keep_going
            }
            None => false,
        }
    }

    /// Asks the loop to stop after the frame in progress (or before the
    /// next one).
    pub fn request_exit(&mut self) {
        self.host.request_quit();
    }

    pub fn redraws(&self) -> u64 {
        self.host.redraws()
    }

    /// The report of the most recent frame, or `undefined` before the
    /// first one.
    pub fn last_frame(&self) -> Result<JsValue, String> {
        match self.last_frame.as_ref() {
            Some(report) => serde_wasm_bindgen::to_value(report).map_err(|e| e.to_string()),
            None => Ok(JsValue::UNDEFINED),
        }
    }
}

#[cfg(test)]
impl Emulator {
    fn frames_run(&self) -> u64 {
        self.driver.frames().tick_counter()
    }

    fn last_report(&self) -> Option<&FrameReport> {
        self.last_frame.as_ref()
    }
}
