use crate::context::Context;
use crate::error::Error;
use crate::plum::{Plum8, ShiftSource};

/// Step-by-step construction of a [`Plum8`] machine.
///
/// ```ignore
/// let chip = Builder::new()
///     .with_context(ctx)
///     .with_program(include_bytes!("rom.ch8"))
///     .build()?;
/// ```
pub struct Builder<'a, C: Context> {
    context: Option<C>,
    program: Option<&'a [u8]>,
    shift_source: ShiftSource,
}

impl<'a, C: Context> Builder<'a, C> {
    pub fn new() -> Self {
        Self {
            context: None,
            program: None,
            shift_source: ShiftSource::default(),
        }
    }

    pub fn with_context(mut self, context: C) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_program(mut self, program: &'a [u8]) -> Self {
        self.program = Some(program);
        self
    }

    /// Override the shift-instruction convention, for ROMs written against
    /// the original COSMAC behaviour.
    pub fn with_shift_source(mut self, source: ShiftSource) -> Self {
        self.shift_source = source;
        self
    }

    /// Both a context and a program are required.
    pub fn build(self) -> Result<Plum8<C>, Error> {
        let context = self.context.ok_or(Error::MissingContext)?;
        let program = self.program.ok_or(Error::MissingProgram)?;
        let mut chip = Plum8::load(context, program)?;
        chip.set_shift_source(self.shift_source);
        Ok(chip)
    }
}

impl<'a, C: Context> Default for Builder<'a, C> {
    fn default() -> Self {
        Self::new()
    }
}
