use serde::{Deserialize, Serialize};

/// What kind of observed fact a signal carries.
///
/// Adapters keep inventing new kinds, so unknown inbound strings are kept as
/// raw data instead of failing the whole batch decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SignalKind {
    CalendarEvent,
    Email,
    DocumentExcerpt,
    Other(String),
}

impl From<String> for SignalKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "calendar_event" => Self::CalendarEvent,
            "email" => Self::Email,
            "document_excerpt" => Self::DocumentExcerpt,
            _ => Self::Other(raw),
        }
    }
}

impl From<SignalKind> for String {
    fn from(kind: SignalKind) -> Self {
        kind.as_str().to_string()
    }
}

impl SignalKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::CalendarEvent => "calendar_event",
            Self::Email => "email",
            Self::DocumentExcerpt => "document_excerpt",
            Self::Other(raw) => raw,
        }
    }
}

/// Origin of a signal (which connected account produced it).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SignalSource {
    Gmail,
    Outlook,
    Slack,
    Drive,
    Other(String),
}

impl From<String> for SignalSource {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "gmail" => Self::Gmail,
            "outlook" => Self::Outlook,
            "slack" => Self::Slack,
            "drive" => Self::Drive,
            _ => Self::Other(raw),
        }
    }
}

impl From<SignalSource> for String {
    fn from(source: SignalSource) -> Self {
        source.as_str().to_string()
    }
}

impl SignalSource {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Gmail => "gmail",
            Self::Outlook => "outlook",
            Self::Slack => "slack",
            Self::Drive => "drive",
            Self::Other(raw) => raw,
        }
    }
}

/// One observed fact pulled from a connected source.
///
/// `id` is `source:identifier` (e.g. `gmail:123`) and must be unique within a
/// detection batch. Signals are immutable once constructed; detection never
/// mutates its input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkSignal {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SignalKind,
    pub source: SignalSource,
    /// ISO-8601 timestamp for time-bound signals. Kept as the raw string so
    /// unparsable upstream values are representable; they are filtered at
    /// detection time, not at decode time.
    #[serde(default)]
    pub datetime: Option<String>,
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
}

impl WorkSignal {
    pub fn new(
        id: impl Into<String>,
        kind: SignalKind,
        source: SignalSource,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            source,
            datetime: None,
            content: content.into(),
            author: None,
        }
    }

    pub fn with_datetime(mut self, datetime: impl Into<String>) -> Self {
        self.datetime = Some(datetime.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

/// Severity of a conflict, with a defined total order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Lenient parse for model-emitted severity strings. Unrecognized values
    /// coerce to `Medium`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Kind of detected inconsistency.
///
/// `SchedulingConflict` comes from the deterministic pass or the model; the
/// semantic kinds come only from the model. Novel model-emitted kinds survive
/// as `Other` rather than being discarded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConflictKind {
    SchedulingConflict,
    ContentConflict,
    FinancialMismatch,
    CommitmentContradiction,
    Other(String),
}

impl From<String> for ConflictKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "scheduling_conflict" => Self::SchedulingConflict,
            "content_conflict" => Self::ContentConflict,
            "financial_mismatch" => Self::FinancialMismatch,
            "commitment_contradiction" => Self::CommitmentContradiction,
            _ => Self::Other(raw),
        }
    }
}

impl From<ConflictKind> for String {
    fn from(kind: ConflictKind) -> Self {
        kind.as_str().to_string()
    }
}

impl ConflictKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::SchedulingConflict => "scheduling_conflict",
            Self::ContentConflict => "content_conflict",
            Self::FinancialMismatch => "financial_mismatch",
            Self::CommitmentContradiction => "commitment_contradiction",
            Self::Other(raw) => raw,
        }
    }
}

/// A detected inconsistency between two or more signals.
///
/// Plain serializable data for downstream briefing/UI consumers; created
/// fresh per detection call and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub severity: Severity,
    /// Ids of the signals in conflict, in source order. Length >= 2; every
    /// id references a signal present in the input batch.
    pub signals_involved: Vec<String>,
    pub summary: String,
    #[serde(default)]
    pub recommended_action: String,
    /// The conflicting instant, present for scheduling conflicts.
    #[serde(default)]
    pub datetime: Option<String>,
}
