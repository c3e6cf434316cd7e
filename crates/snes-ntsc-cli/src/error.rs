#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Setup(ron::error::SpannedError),
    Filter(snes_ntsc::Error),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "{e}"),
            Error::Setup(e) => write!(f, "invalid setup file: {e}"),
            Error::Filter(e) => write!(f, "{e}"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}

impl From<ron::error::SpannedError> for Error {
    fn from(value: ron::error::SpannedError) -> Self {
        Error::Setup(value)
    }
}

impl From<snes_ntsc::Error> for Error {
    fn from(value: snes_ntsc::Error) -> Self {
        Error::Filter(value)
    }
}
