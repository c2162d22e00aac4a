use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = ParityError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ParityError {
    /// A required marker or field is missing from a trace or payload.
    #[error("{fixture}: parse error: {detail}")]
    Parse { fixture: String, detail: String },

    /// A field is present but has the wrong shape (bad number, wrong element type).
    #[error("{fixture}: invalid {field}: '{value}'")]
    Shape {
        fixture: String,
        field: String,
        value: String,
    },

    #[error("{fixture}: insufficient data: {shared} shared labeled nodes (need {required})")]
    InsufficientData {
        fixture: String,
        shared: usize,
        required: usize,
    },

    #[error(transparent)]
    Gate(#[from] GateViolation),

    #[error("{fixture}: {engine} engine failed: {detail}")]
    Engine {
        fixture: String,
        engine: &'static str,
        detail: String,
    },

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ParityError {
    pub fn parse(fixture: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Parse {
            fixture: fixture.into(),
            detail: detail.into(),
        }
    }

    pub fn shape(
        fixture: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Shape {
            fixture: fixture.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn engine(
        fixture: impl Into<String>,
        engine: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        Self::Engine {
            fixture: fixture.into(),
            engine,
            detail: detail.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable reason code for reports and exit-code mapping.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "E_PARSE",
            Self::Shape { .. } => "E_SHAPE",
            Self::InsufficientData { .. } => "E_INSUFFICIENT_DATA",
            Self::Gate(_) => "E_GATE_VIOLATION",
            Self::Engine { .. } => "E_ENGINE",
            Self::Io { .. } => "E_IO",
        }
    }
}

/// An aggregated metric that failed its threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct GateViolation {
    pub gate: String,
    /// Case name, or `run` for run-wide counters.
    pub case: String,
    pub metric: String,
    pub expected: String,
    pub observed: String,
}

impl fmt::Display for GateViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gate '{}' violated for {}: {} expected {}, observed {}",
            self.gate, self.case, self.metric, self.expected, self.observed
        )
    }
}

impl std::error::Error for GateViolation {}

#[derive(Debug)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigError: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}
