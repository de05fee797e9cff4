use super::{act, query};
use crate::core::protocol::{Command, CommandTable, Reply};
use crate::core::session::Session;
use crate::domain::error::{FluidComError, FluidComResult};

/// Plunger operations of a syringe pump. Distances are in motor steps.
///
/// Every motion takes `wait`: with it the call returns once the move has
/// finished; without it the call returns after sending and completion is
/// observed through `Session::is_busy` or `Session::wait_for_reply`.
pub struct Plunger<'a> {
    session: &'a mut Session,
    table: &'a CommandTable,
    max_steps: u16,
}

impl<'a> Plunger<'a> {
    pub(super) fn new(session: &'a mut Session, table: &'a CommandTable, max_steps: u16) -> Self {
        Self {
            session,
            table,
            max_steps,
        }
    }

    pub fn max_steps(&self) -> u16 {
        self.max_steps
    }

    /// Drive the plunger to its origin.
    pub fn home(&mut self, wait: bool) -> FluidComResult<Option<Reply>> {
        act(self.session, self.table, Command::ResetPlunger, 0, wait)
    }

    /// Drive to the end of travel and back off slightly. Recovers a plunger
    /// that lost its position.
    pub fn forced_home(&mut self, wait: bool) -> FluidComResult<Option<Reply>> {
        act(self.session, self.table, Command::ForcedReset, 0, wait)
    }

    pub fn move_to(&mut self, steps: u16, wait: bool) -> FluidComResult<Option<Reply>> {
        self.check_range(steps)?;
        act(self.session, self.table, Command::MovePlungerAbsolute, steps, wait)
    }

    /// Draw in by `steps` relative to the current position.
    pub fn aspirate(&mut self, steps: u16, wait: bool) -> FluidComResult<Option<Reply>> {
        self.check_range(steps)?;
        act(self.session, self.table, Command::AspirateSteps, steps, wait)
    }

    /// Push out by `steps` relative to the current position.
    pub fn dispense(&mut self, steps: u16, wait: bool) -> FluidComResult<Option<Reply>> {
        self.check_range(steps)?;
        act(self.session, self.table, Command::DispenseSteps, steps, wait)
    }

    pub fn set_speed(&mut self, rpm: u16) -> FluidComResult<()> {
        act(self.session, self.table, Command::SetSpeed, rpm, true)?;
        Ok(())
    }

    pub fn position(&mut self) -> FluidComResult<u16> {
        query(self.session, self.table, Command::GetPlungerPosition)
    }

    /// Realign the stored position with the encoder.
    pub fn sync_position(&mut self) -> FluidComResult<u16> {
        query(self.session, self.table, Command::SyncPlungerPosition)
    }

    pub fn halt(&mut self) -> FluidComResult<Reply> {
        let code = self.table.code(Command::Halt)?;
        self.session.cancel(code)
    }

    fn check_range(&self, steps: u16) -> FluidComResult<()> {
        if steps > self.max_steps {
            return Err(FluidComError::InvalidParameter(format!(
                "Plunger steps {} out of range [0 - {}]",
                steps, self.max_steps
            )));
        }
        Ok(())
    }
}
