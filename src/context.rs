//! Platform seam consumed by the interpreter.
//!
//! Rendering, input devices and audio live behind this trait; the core only
//! ever sees logical key indices, a sound on/off edge, and a source of
//! random bytes.

/// Host services the machine depends on.
pub trait Context {
    /// Current state of the 16 logical keys (0x0-0xF).
    ///
    /// Sampled at step boundaries; a host polling input in parallel must
    /// make its updates visible between steps.
    fn get_keys(&mut self) -> &[bool; 16];

    /// The sound timer is running, keep the tone on.
    ///
    /// Called on every timer tick while the timer is nonzero, including the
    /// tick that takes it from 1 to 0. A host that wants the 1-to-0
    /// transition as a discrete event treats the first `sound_off` after a
    /// run of `sound_on` calls as the falling edge.
    fn sound_on(&mut self);

    /// The sound timer is idle, tone off.
    fn sound_off(&mut self);

    /// One uniformly distributed random byte.
    fn gen_random(&mut self) -> u8;
}
