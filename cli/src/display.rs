use std::io::Write;

use termcolor::{self, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing::{event, Level};

use hostloop::{Host, MachineState};

/// Shows the state of the machine on a single, continually
/// overwritten, line of the terminal.
pub struct TerminalDisplay {
    stream: StandardStream,
    last_status: Option<String>,
    redraws: u64,
}

fn get_colour_choice() -> termcolor::ColorChoice {
    if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

pub(crate) fn status_line(machine: &MachineState) -> String {
    let uptime = machine.rtc.monotonic_uptime;
    format!(
        "ip={:08X} {} uptime={}.{:03}s disks={}",
        machine.instruction_pointer,
        if machine.halted { "halted " } else { "running" },
        uptime / 1000,
        uptime % 1000,
        machine.disk_count(),
    )
}

impl TerminalDisplay {
    /// Fails when standard output is not a terminal, since there is
    /// then nowhere to show the machine's display.
    pub fn new() -> Result<TerminalDisplay, String> {
        if !atty::is(atty::Stream::Stdout) {
            return Err("unable to initialize display: standard output is not a terminal".to_string());
        }
        Ok(TerminalDisplay {
            stream: StandardStream::stdout(get_colour_choice()),
            last_status: None,
            redraws: 0,
        })
    }

    fn set_colour(&mut self, halted: bool) {
        let mut new_colour = ColorSpec::new();
        if halted {
            new_colour.set_fg(Some(termcolor::Color::Yellow));
        } else {
            new_colour.set_fg(Some(termcolor::Color::Green));
        }
        if let Err(e) = self.stream.set_color(&new_colour) {
            event!(
                Level::ERROR,
                "Failed to select colour {:?}: {}",
                new_colour,
                e
            );
        }
    }

    fn show(&mut self, machine: &MachineState, status: &str) -> Result<(), std::io::Error> {
        self.set_colour(machine.halted);
        write!(self.stream, "\r{status}")?;
        self.stream.reset()?;
        self.stream.flush()
    }
}

impl Host for TerminalDisplay {
    fn redraw(&mut self, machine: &MachineState) {
        self.redraws += 1;
        let status = status_line(machine);
        if self.last_status.as_deref() == Some(status.as_str()) {
            return;
        }
        if let Err(e) = self.show(machine, &status) {
            event!(Level::ERROR, "Failed to update display: {}", e);
        }
        self.last_status = Some(status);
    }

    fn poll_events(&mut self, _machine: &mut MachineState) -> bool {
        // The terminal delivers no input to us; ^C ends the process.
        false
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        if let Err(e) = self.stream.reset() {
            event!(Level::ERROR, "Failed to reset terminal: {}", e);
        }
        let _ = writeln!(self.stream);
        event!(Level::DEBUG, "display redrawn {} times", self.redraws);
    }
}
