use super::{act, query};
use crate::core::protocol::{Command, CommandTable, Reply, ReplyStatus};
use crate::core::session::Session;
use crate::domain::error::{FluidComError, FluidComResult};

/// Selector valve operations. Ports are numbered from 1.
pub struct Valve<'a> {
    session: &'a mut Session,
    table: &'a CommandTable,
    port_count: Option<u16>,
}

impl<'a> Valve<'a> {
    pub(super) fn new(
        session: &'a mut Session,
        table: &'a CommandTable,
        port_count: Option<u16>,
    ) -> Self {
        Self {
            session,
            table,
            port_count,
        }
    }

    pub fn port_count(&self) -> Option<u16> {
        self.port_count
    }

    /// Turn to `port` by the shortest path.
    pub fn move_to_port(&mut self, port: u16, wait: bool) -> FluidComResult<Option<Reply>> {
        let in_range = match self.port_count {
            Some(count) => (1..=count).contains(&port),
            None => port >= 1,
        };
        if !in_range {
            return Err(FluidComError::InvalidParameter(match self.port_count {
                Some(count) => format!("Port {} out of range [1 - {}]", port, count),
                None => format!("Port {} out of range", port),
            }));
        }
        act(self.session, self.table, Command::ValveToPort, port, wait)
    }

    pub fn clockwise(&mut self, steps: u16, wait: bool) -> FluidComResult<Option<Reply>> {
        act(self.session, self.table, Command::ValveClockwiseSteps, steps, wait)
    }

    pub fn counter_clockwise(&mut self, steps: u16, wait: bool) -> FluidComResult<Option<Reply>> {
        act(
            self.session,
            self.table,
            Command::ValveCounterClockwiseSteps,
            steps,
            wait,
        )
    }

    /// Return the valve to its reference position.
    pub fn reset(&mut self, wait: bool) -> FluidComResult<Option<Reply>> {
        act(self.session, self.table, Command::ResetValve, 0, wait)
    }

    pub fn current_channel(&mut self) -> FluidComResult<u16> {
        query(self.session, self.table, Command::GetCurrentChannel)
    }

    pub fn status(&mut self) -> FluidComResult<ReplyStatus> {
        let code = self.table.code(Command::GetValveStatus)?;
        Ok(self.session.query_raw(code, 0)?.status)
    }
}
