//! State of the emulated machine, as seen by the host loop.
//!
//! The execution engine owns the meaning of the registers and of the
//! ROM contents; the host loop only needs to be able to boot the
//! machine, post interrupts, wake it from a halt, keep its real-time
//! clock registers current and notice when one of its devices asks
//! for the emulator to shut down.
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{event, Level};

use super::rtc::RtcState;

pub const REGISTER_COUNT: usize = 32;

/// Size of the ROM backing store in bytes.
pub const ROM_SIZE: usize = 0x80000;

/// A request, raised by an emulated device, that the whole emulator
/// should stop.
///
/// Clones share the same flag, so a device can keep a handle and
/// raise it from whatever context it runs in.  The host loop only
/// looks at the flag once per frame.
#[derive(Debug, Clone, Default)]
pub struct ExitRequest(Arc<AtomicBool>);

impl ExitRequest {
    pub fn new() -> ExitRequest {
        ExitRequest::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A disk image registered with the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskImage {
    /// Where the image came from (a file name, or a label supplied by
    /// the host).
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub struct MachineState {
    pub registers: [u32; REGISTER_COUNT],
    pub instruction_pointer: u32,
    /// When set, the CPU is waiting for an interrupt.
    pub halted: bool,
    /// When set, execution faults are described in the log.
    pub debug: bool,
    /// When set, nothing is ever drawn.
    pub headless: bool,
    pub rtc: RtcState,
    pending_interrupts: VecDeque<u8>,
    rom: Vec<u8>,
    disks: BTreeMap<usize, DiskImage>,
    exit: ExitRequest,
}

impl Default for MachineState {
    fn default() -> Self {
        MachineState::new()
    }
}

impl MachineState {
    /// Creates a machine in its power-on state: registers zeroed,
    /// not halted, an all-zero ROM and no disks.
    pub fn new() -> MachineState {
        MachineState {
            registers: [0; REGISTER_COUNT],
            instruction_pointer: 0,
            halted: false,
            debug: false,
            headless: false,
            rtc: RtcState::default(),
            pending_interrupts: VecDeque::new(),
            rom: vec![0; ROM_SIZE],
            disks: BTreeMap::new(),
            exit: ExitRequest::new(),
        }
    }

    /// Posts an interrupt.  A vector which is already pending is not
    /// queued a second time.
    pub fn raise_interrupt(&mut self, vector: u8) {
        if self.pending_interrupts.contains(&vector) {
            event!(
                Level::TRACE,
                "interrupt {vector:#04x} is already pending, not queueing it again"
            );
        } else {
            self.pending_interrupts.push_back(vector);
        }
    }

    /// Removes the oldest pending interrupt, if any.  This is for the
    /// execution engine's use.
    pub fn take_interrupt(&mut self) -> Option<u8> {
        self.pending_interrupts.pop_front()
    }

    pub fn pending_interrupts(&self) -> impl Iterator<Item = &u8> {
        self.pending_interrupts.iter()
    }

    pub fn rom(&self) -> &[u8] {
        &self.rom
    }

    /// Replaces the start of ROM with `image`.  Bytes beyond
    /// [`ROM_SIZE`] are ignored, and bytes of the previous image
    /// beyond the end of `image` are kept.  Returns the number of
    /// bytes copied.
    pub fn install_rom(&mut self, image: &[u8]) -> usize {
        let n = image.len().min(ROM_SIZE);
        if n < image.len() {
            event!(
                Level::WARN,
                "ROM image is {} bytes but ROM is only {ROM_SIZE} bytes; ignoring the excess",
                image.len()
            );
        }
        self.rom[..n].copy_from_slice(&image[..n]);
        n
    }

    /// Registers a disk image under ordinal `id`, replacing any image
    /// previously registered there.
    pub fn attach_disk(&mut self, id: usize, image: DiskImage) -> Option<DiskImage> {
        event!(
            Level::INFO,
            "attaching disk {id}: {} ({} bytes)",
            image.name,
            image.data.len()
        );
        self.disks.insert(id, image)
    }

    pub fn disk(&self, id: usize) -> Option<&DiskImage> {
        self.disks.get(&id)
    }

    pub fn disk_count(&self) -> usize {
        self.disks.len()
    }

    /// Returns a handle devices can use to ask the emulator to exit.
    pub fn exit_request(&self) -> ExitRequest {
        self.exit.clone()
    }

    pub fn exit_requested(&self) -> bool {
        self.exit.is_requested()
    }
}
