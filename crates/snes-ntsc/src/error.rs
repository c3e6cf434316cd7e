#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Pixel pairs would be written in the wrong order for this host.
    ByteOrder,
    ParameterOutOfRange {
        name: &'static str,
        value: f64,
    },
    /// Remap tables must cover every 15-bit color.
    PaletteSize(usize),
    /// Kernel error correction for a table entry did not settle.
    Convergence {
        entry: usize,
        burst: usize,
        tap: usize,
    },
    Frame(FrameError),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ByteOrder => write!(f, "host byte order does not match pixel packing"),
            Error::ParameterOutOfRange { name, value } => {
                write!(f, "{name} must be within -1.0 to 1.0, got {value}")
            }
            Error::PaletteSize(len) => write!(
                f,
                "palette must have {} entries, got {len}",
                crate::COLOR_COUNT
            ),
            Error::Convergence { entry, burst, tap } => write!(
                f,
                "kernel correction did not converge for entry {entry:#06x} burst {burst} tap {tap}"
            ),
            Error::Frame(e) => write!(f, "{e}"),
        }
    }
}

impl From<FrameError> for Error {
    fn from(value: FrameError) -> Self {
        Error::Frame(value)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Output width is not one the blitter produces exactly.
    Width(usize),
    /// Input rows too narrow to fill the shortest output row.
    InputWidth(usize),
    OddPitch(usize),
    InputPitch { pitch: usize, needed: usize },
    OutputPitch { pitch: usize, needed: usize },
    InputLength { len: usize, needed: usize },
    OutputLength { len: usize, needed: usize },
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::Width(width) => write!(f, "unsupported output width {width}"),
            FrameError::InputWidth(width) => {
                write!(f, "input width {width} is too narrow to filter")
            }
            FrameError::OddPitch(pitch) => write!(f, "output pitch {pitch} is not a whole pixel"),
            FrameError::InputPitch { pitch, needed } => {
                write!(f, "input pitch {pitch} is shorter than a row of {needed} pixels")
            }
            FrameError::OutputPitch { pitch, needed } => {
                write!(f, "output pitch {pitch} is shorter than a row of {needed} bytes")
            }
            FrameError::InputLength { len, needed } => {
                write!(f, "input holds {len} pixels, frame needs {needed}")
            }
            FrameError::OutputLength { len, needed } => {
                write!(f, "output holds {len} pixels, frame needs {needed}")
            }
        }
    }
}
