use crate::error::NativeErr;

/// The codes readable through `nn.geterror`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(i16)]
pub enum ErrorCode {
    #[default]
    Ok = 0,
    OutOfMemory = 1,
    NoNetwork = 2,
    IndexOutOfRange = 3,
    UnsuitableForHebbian = 4,
}

/// Holds the last error raised by a native call.
///
/// The register is sticky: successful calls leave it alone, only `reset` clears it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorRegister {
    code: ErrorCode,
}

impl ErrorRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> ErrorCode {
        self.code
    }

    pub fn reset(&mut self) {
        self.code = ErrorCode::Ok;
    }

    /// Stores the code of `err`, errors without a code leave the register unchanged.
    pub fn record(&mut self, err: &NativeErr) {
        if let Some(code) = err.code() {
            self.code = code;
        }
    }
}
