//! Session Worker Tasks

use crossbeam_channel::Sender;

use tonal_platform::{OutputDevice, SessionId};

use crate::flags::ChangeFlags;

/// Work items for the session worker, executed strictly in order
#[derive(Debug)]
pub enum Task {
    /// Attach effects to a newly opened session (or cancel its pending removal)
    AddSession(SessionId),

    /// Schedule teardown of a closed session
    RemoveSession(SessionId),

    /// Re-push the given categories to every active session
    Update(ChangeFlags),

    /// Live equalizer preview, not persisted
    SetOverride { band: usize, level_db: f32 },

    /// Music output moved to another device
    DeviceChanged(OutputDevice),

    /// Reply once everything queued before this has run
    Flush(Sender<()>),

    /// Release everything and stop the worker
    Shutdown,
}
