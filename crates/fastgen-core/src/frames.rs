use crate::error::{GenError, Result};
use crate::instructions::FieldInstruction;

/// Direct children of one open container, in declaration order: the symbol of
/// each child's static instruction and the record it was emitted from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub symbols: Vec<String>,
    pub fields: Vec<FieldInstruction>,
}

impl Frame {
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrameStack {
    frames: Vec<Frame>,
}

impl FrameStack {
    pub fn open(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Append to the innermost open frame.
    pub fn append(&mut self, symbol: String, field: FieldInstruction) -> Result<()> {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.symbols.push(symbol);
                frame.fields.push(field);
                Ok(())
            }
            None => Err(GenError::Internal(format!(
                "no open subinstruction frame for {symbol}"
            ))),
        }
    }

    pub fn close(&mut self) -> Result<Frame> {
        self.frames.pop().ok_or_else(|| {
            GenError::Internal("close of a subinstruction frame that was never opened".to_string())
        })
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
