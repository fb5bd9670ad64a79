use crate::controls::ControlOp;

/// Commands the hosting page sends into the session loop.
#[derive(Debug)]
pub enum SessionCommand {
    /// Leave the room, keeping it joinable for the other party.
    Leave,

    /// Terminate the room for everyone. Doctor only.
    Revoke,

    /// In-call control operation (mute, camera, share, pin, fullscreen).
    Control(ControlOp),
}
