//! In-memory register file for host tests. Registers read as 0 until written, and
//! every write through `RegisterBus` is logged.

use crate::{
    error::Result,
    gpio::{self, AltFn, AltFnRouter, Pin},
    regs::{Reg, RegisterBus},
};

#[derive(Default)]
pub struct RegisterFile {
    values: Vec<(Reg, u32)>,
    writes: Vec<(Reg, u32)>,
    pub binds: Vec<(Pin, AltFn)>,
}

impl RegisterFile {
    pub fn get(&self, reg: Reg) -> u32 {
        self.values
            .iter()
            .find(|(r, _)| *r == reg)
            .map(|(_, v)| *v)
            .unwrap_or(0)
    }

    /// Preload a register without logging a write; sets up reset values and such.
    pub fn set(&mut self, reg: Reg, value: u32) {
        match self.values.iter_mut().find(|(r, _)| *r == reg) {
            Some(entry) => entry.1 = value,
            None => self.values.push((reg, value)),
        }
    }

    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    pub fn writes(&self) -> &[(Reg, u32)] {
        &self.writes
    }

    pub fn clear_log(&mut self) {
        self.writes.clear();
        self.binds.clear();
    }

    /// All registers holding a value, in a stable order, for comparing whole states.
    pub fn snapshot(&self) -> Vec<(String, u32)> {
        let mut result: Vec<_> = self
            .values
            .iter()
            .filter(|(_, v)| *v != 0)
            .map(|(r, v)| (format!("{r:?}"), *v))
            .collect();
        result.sort();
        result
    }
}

impl RegisterBus for RegisterFile {
    fn read(&self, reg: Reg) -> u32 {
        self.get(reg)
    }

    fn write(&mut self, reg: Reg, value: u32) {
        self.writes.push((reg, value));
        self.set(reg, value);
    }
}

impl AltFnRouter for RegisterFile {
    fn bind_alternate_function(&mut self, pin: Pin, function: AltFn) -> Result<()> {
        self.binds.push((pin, function));
        gpio::set_alt_fn(self, pin, function);
        Ok(())
    }
}
