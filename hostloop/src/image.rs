//! Loading ROM and disk images from files.
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{event, Level};

use super::engine::ExecutionEngine;
use super::machine::{DiskImage, MachineState};

#[derive(Debug)]
pub struct ImageError {
    pub path: PathBuf,
    pub error: io::Error,
}

impl Display for ImageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "couldn't open {}: {}", self.path.display(), self.error)
    }
}

impl Error for ImageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

pub fn load_image(path: &Path) -> Result<Vec<u8>, ImageError> {
    fs::read(path).map_err(|error| ImageError {
        path: path.to_path_buf(),
        error,
    })
}

/// Creates a freshly initialised machine with the engine's boot image
/// (if it has one) in ROM.
pub fn init_machine<E: ExecutionEngine + ?Sized>(engine: &E) -> MachineState {
    let mut machine = MachineState::new();
    if let Some(rom) = engine.boot_rom() {
        let n = machine.install_rom(rom);
        event!(Level::DEBUG, "installed {n}-byte built-in boot image");
    }
    machine
}

/// Replaces the machine's boot ROM with the contents of `path`.
///
/// A file which can't be read is reported as a warning and leaves
/// the resident ROM as it was.  Returns whether the ROM was replaced.
pub fn install_rom_file(machine: &mut MachineState, path: &Path) -> bool {
    match load_image(path) {
        Ok(image) => {
            event!(Level::INFO, "using {} as boot ROM", path.display());
            machine.install_rom(&image);
            true
        }
        Err(e) => {
            event!(Level::WARN, "couldn't open ROM file: {e}");
            false
        }
    }
}

/// Registers the disk image in `path` as disk number `id`.
///
/// As for ROM images, a file which can't be read is only a warning.
pub fn attach_disk_file(machine: &mut MachineState, id: usize, path: &Path) -> bool {
    match load_image(path) {
        Ok(data) => {
            machine.attach_disk(
                id,
                DiskImage {
                    name: path.display().to_string(),
                    data,
                },
            );
            true
        }
        Err(e) => {
            event!(Level::WARN, "couldn't open disk image for disk {id}: {e}");
            false
        }
    }
}
