//! Best-effort stack capture for errors.

use std::fmt::{Display, Formatter};

// inline(never) is added to make sure there is a separate frame for this
// function so that it can be used to find the start of the backtrace.
#[inline(never)]
#[must_use]
#[doc(hidden)]
pub fn __handwrap_create_backtrace() -> Backtrace {
    let mut frames = Vec::new();
    let mut start = false;
    backtrace::trace(|frame| {
        let frame = StackFrame::from(frame);
        if start {
            frames.push(frame);
        } else if frame.symbol_name().contains("__handwrap_create_backtrace") {
            start = true;
        }

        true
    });

    Backtrace { frames }
}

/// The stack captured when an error was created.
///
/// Symbol resolution depends on the debug information available in the
/// binary; stripped builds produce an empty backtrace.
#[derive(Debug, Clone, Default)]
pub struct Backtrace {
    frames: Vec<StackFrame>,
}

impl Backtrace {
    /// Returns the captured frames, innermost first.
    #[must_use]
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }
}

impl Display for Backtrace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, frame) in self.frames.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "    at {} ({})", frame.symbol_name(), frame.location())?;
        }
        Ok(())
    }
}

/// A single resolved stack frame.
#[derive(Debug, Clone)]
pub struct StackFrame {
    symbol_name: Option<String>,
    filename: Option<String>,
    lineno: Option<u32>,
    colno: Option<u32>,
}

impl StackFrame {
    /// Returns the demangled symbol name, or `<unknown>`.
    #[must_use]
    pub fn symbol_name(&self) -> String {
        self.symbol_name
            .as_deref()
            .unwrap_or("<unknown>")
            .to_string()
    }

    /// Returns `file:line:column`, or `<unknown>`.
    #[must_use]
    pub fn location(&self) -> String {
        if let Some(filename) = self.filename.as_deref() {
            let mut s = filename.to_owned();

            if let Some(line_no) = self.lineno {
                s = format!("{s}:{line_no}");

                if let Some(col_no) = self.colno {
                    s = format!("{s}:{col_no}");
                }
            }

            s
        } else {
            "<unknown>".to_string()
        }
    }
}

impl From<&backtrace::Frame> for StackFrame {
    fn from(frame: &backtrace::Frame) -> Self {
        let mut symbol_name = None;
        let mut filename = None;
        let mut lineno = None;
        let mut colno = None;

        backtrace::resolve_frame(frame, |symbol| {
            if let Some(name) = symbol.name() {
                symbol_name = Some(name.to_string());
            }
            if let Some(file) = symbol.filename() {
                filename = Some(file.display().to_string());
            }
            if let Some(line) = symbol.lineno() {
                lineno = Some(line);
            }
            if let Some(col) = symbol.colno() {
                colno = Some(col);
            }
        });

        Self {
            symbol_name,
            filename,
            lineno,
            colno,
        }
    }
}
