use core::fmt;

/// Faults surfaced to the host.
///
/// Every variant except `RomTooLarge` and the builder errors latches: once
/// `tick_chip` reports it, the machine refuses to step until `reset`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// 2NNN issued with all 16 stack slots in use.
    StackOverflow,
    /// 00EE issued with an empty stack.
    StackUnderflow,
    /// A memory access or index computation fell past 0xFFF. Carries the
    /// first out-of-range byte for accesses, or the out-of-range value the
    /// index register would have taken.
    AddressOutOfRange { addr: u16 },
    /// The program counter was moved or incremented out of the address space.
    PcOutOfRange { addr: u16 },
    /// Program image longer than the 3584 bytes available from 0x200.
    RomTooLarge { len: usize },
    /// Builder finished without a context.
    MissingContext,
    /// Builder finished without a program.
    MissingProgram,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::StackOverflow => write!(f, "call stack is full"),
            Error::StackUnderflow => write!(f, "return outside of a subroutine"),
            Error::AddressOutOfRange { addr } => {
                write!(f, "memory access out of address space at {:#05x}", addr)
            }
            Error::PcOutOfRange { addr } => {
                write!(f, "program counter out of address space at {:#05x}", addr)
            }
            Error::RomTooLarge { len } => {
                write!(f, "program image of {} bytes exceeds 3584 byte capacity", len)
            }
            Error::MissingContext => write!(f, "context not provided"),
            Error::MissingProgram => write!(f, "program not provided"),
        }
    }
}
