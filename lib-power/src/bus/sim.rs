use heapless::Vec;

use super::{BusError, RegisterBus};

pub const SIM_NUM_ADDRESSES: usize = 128;
pub const SIM_NUM_REGISTERS: usize = 16;
pub const SIM_WRITE_LOG_DEPTH: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusWrite {
    Register { address: u8, register: u8, value: u8 },
    Raw { address: u8, bytes: Vec<u8, 4> },
}

/// In-memory register file standing in for the real devices.
///
/// Bits in a register's read-only mask keep their value across writes, the way
/// status fields on the chargers do. Sticky bits always read back as one (the
/// dual-input charger's reset bit). Addresses marked offline NACK everything.
/// Every accepted write is appended to a bounded log; once the log is full new
/// writes still land in the register file but are no longer recorded.
pub struct SimulatedBus {
    registers: [[u8; SIM_NUM_REGISTERS]; SIM_NUM_ADDRESSES],
    read_only: [[u8; SIM_NUM_REGISTERS]; SIM_NUM_ADDRESSES],
    sticky: [[u8; SIM_NUM_REGISTERS]; SIM_NUM_ADDRESSES],
    offline: [bool; SIM_NUM_ADDRESSES],
    writes: Vec<BusWrite, SIM_WRITE_LOG_DEPTH>,
    reads: usize,
}

impl SimulatedBus {
    pub const fn new() -> Self {
        SimulatedBus {
            registers: [[0; SIM_NUM_REGISTERS]; SIM_NUM_ADDRESSES],
            read_only: [[0; SIM_NUM_REGISTERS]; SIM_NUM_ADDRESSES],
            sticky: [[0; SIM_NUM_REGISTERS]; SIM_NUM_ADDRESSES],
            offline: [false; SIM_NUM_ADDRESSES],
            writes: Vec::new(),
            reads: 0,
        }
    }

    /// Sets a register directly, bypassing the read-only mask and the log.
    pub fn set_register(&mut self, address: u8, register: u8, value: u8) {
        if let Some(slot) = self.slot_mut(address, register) {
            *slot = value;
        }
    }

    pub fn register(&self, address: u8, register: u8) -> u8 {
        let (a, r) = (address as usize, register as usize);
        if a < SIM_NUM_ADDRESSES && r < SIM_NUM_REGISTERS {
            self.registers[a][r] | self.sticky[a][r]
        } else {
            0
        }
    }

    pub fn set_read_only_mask(&mut self, address: u8, register: u8, mask: u8) {
        let (a, r) = (address as usize, register as usize);
        if a < SIM_NUM_ADDRESSES && r < SIM_NUM_REGISTERS {
            self.read_only[a][r] = mask;
        }
    }

    pub fn set_sticky_bits(&mut self, address: u8, register: u8, mask: u8) {
        let (a, r) = (address as usize, register as usize);
        if a < SIM_NUM_ADDRESSES && r < SIM_NUM_REGISTERS {
            self.sticky[a][r] = mask;
        }
    }

    pub fn set_offline(&mut self, address: u8, offline: bool) {
        if let Some(flag) = self.offline.get_mut(address as usize) {
            *flag = offline;
        }
    }

    pub fn writes(&self) -> &[BusWrite] {
        &self.writes
    }

    pub fn register_writes_to(&self, address: u8) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.writes.iter().filter_map(move |w| match w {
            BusWrite::Register { address: a, register, value } if *a == address => Some((*register, *value)),
            _ => None,
        })
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    pub fn read_count(&self) -> usize {
        self.reads
    }

    fn slot_mut(&mut self, address: u8, register: u8) -> Option<&mut u8> {
        self.registers
            .get_mut(address as usize)
            .and_then(|regs| regs.get_mut(register as usize))
    }

    fn check_online(&self, address: u8) -> Result<(), BusError> {
        match self.offline.get(address as usize) {
            Some(false) => Ok(()),
            _ => Err(BusError::Nack),
        }
    }

    fn log(&mut self, write: BusWrite) {
        // a full log is a test sizing problem, the register file stays correct
        let _ = self.writes.push(write);
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBus for SimulatedBus {
    fn read_registers(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<(), BusError> {
        self.check_online(address)?;
        self.reads += 1;

        for (offset, byte) in buf.iter_mut().enumerate() {
            *byte = self.register(address, register.wrapping_add(offset as u8));
        }

        Ok(())
    }

    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
        self.check_online(address)?;

        let (a, r) = (address as usize, register as usize);
        if r >= SIM_NUM_REGISTERS {
            return Err(BusError::Nack);
        }

        let read_only = self.read_only[a][r];
        self.registers[a][r] = (self.registers[a][r] & read_only) | (value & !read_only);
        self.log(BusWrite::Register { address, register, value });

        Ok(())
    }

    fn write_raw(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        self.check_online(address)?;

        let mut logged = Vec::new();
        for byte in bytes.iter().take(4) {
            let _ = logged.push(*byte);
        }
        self.log(BusWrite::Raw { address, bytes: logged });

        Ok(())
    }
}
