use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod dashboard;
pub mod history;
pub mod pipeline_ipc;

pub use dashboard::DashboardState;
pub use history::{BoundedHistory, Keyed};

/// Region count shown before either the snapshot or `system_ready` arrives.
pub const DEFAULT_TOTAL_REGIONS: u64 = 8;
/// Name recorded for a verification whose farmer has not been detected yet.
pub const UNKNOWN_FARMER_NAME: &str = "Unknown";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Furthest confirmed step of a claim. Ordered, so `max` never regresses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStage {
    Created,
    Verifying,
    Calculated,
    Disbursed,
    Completed,
}

impl ClaimStage {
    pub fn ordinal(self) -> u8 {
        match self {
            ClaimStage::Created => 1,
            ClaimStage::Verifying => 2,
            ClaimStage::Calculated => 3,
            ClaimStage::Disbursed => 4,
            ClaimStage::Completed => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClaimStage::Created => "created",
            ClaimStage::Verifying => "verifying",
            ClaimStage::Calculated => "calculated",
            ClaimStage::Disbursed => "disbursed",
            ClaimStage::Completed => "completed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ClaimStage::Completed)
    }
}

impl fmt::Display for ClaimStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimView {
    pub farmer_id: String,
    pub name: String,
    pub region: String,
    pub location: Option<GeoPoint>,
    pub stage: ClaimStage,
    pub payout_amount: Option<f64>,
}

impl ClaimView {
    /// Moves the claim forward to `stage`. Returns false when the claim is
    /// already at or past it; stages never regress.
    pub fn advance_to(&mut self, stage: ClaimStage) -> bool {
        if stage <= self.stage {
            return false;
        }
        self.stage = stage;
        true
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
}

impl VerificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerificationRecord {
    pub farmer_id: String,
    pub name: String,
    pub wallet_address: Option<String>,
    pub contract_address: Option<String>,
    pub status: VerificationStatus,
    pub transaction_signature: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DisbursementKind {
    Preemptive,
    Final,
}

impl DisbursementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DisbursementKind::Preemptive => "preemptive",
            DisbursementKind::Final => "final",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            DisbursementKind::Preemptive => "Pre-emptive Disbursement",
            DisbursementKind::Final => "Final Settlement",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisbursementRecord {
    pub kind: DisbursementKind,
    pub payload: pipeline_ipc::DisbursementPayload,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Received,
    Analyzing,
    Completed,
}

impl AnalysisStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisStatus::Received => "received",
            AnalysisStatus::Analyzing => "analyzing",
            AnalysisStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiAnalysisRecord {
    pub farmer_id: String,
    pub name: String,
    pub num_photos: u32,
    pub location: Option<GeoPoint>,
    pub status: AnalysisStatus,
    pub model: Option<String>,
    pub health_classification: Option<String>,
    pub confidence: Option<f64>,
    pub yield_loss_percent: Option<f64>,
    pub damage_verified: Option<bool>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Danger,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Danger => "danger",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(Severity::Success),
            "warning" | "warn" => Ok(Severity::Warning),
            "danger" | "error" => Ok(Severity::Danger),
            "info" => Ok(Severity::Info),
            other => Err(format!("Unknown severity: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityEntry {
    pub seq: u64,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate counters. The stream only ever increases them; the snapshot
/// fetch replaces the whole struct.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateStats {
    pub total_farmers: u64,
    pub total_regions: u64,
    pub active_claims: u64,
    pub total_disbursed: f64,
    #[serde(default)]
    pub claims_completed: u64,
    #[serde(default)]
    pub weather_events: u64,
}

impl Default for AggregateStats {
    fn default() -> Self {
        Self {
            total_farmers: 0,
            total_regions: DEFAULT_TOTAL_REGIONS,
            active_claims: 0,
            total_disbursed: 0.0,
            claims_completed: 0,
            weather_events: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusClass {
    Connecting,
    Online,
    Error,
    Disconnected,
}

impl StatusClass {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusClass::Connecting => "connecting",
            StatusClass::Online => "online",
            StatusClass::Error => "error",
            StatusClass::Disconnected => "disconnected",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusClass::Connecting => "Connecting...",
            StatusClass::Online => "Live",
            StatusClass::Error => "Error",
            StatusClass::Disconnected => "Disconnected",
        }
    }
}

/// Connection indicator shared with observers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemStatus {
    pub text: String,
    pub class: StatusClass,
}

impl SystemStatus {
    pub fn new(class: StatusClass) -> Self {
        Self {
            text: class.label().to_string(),
            class,
        }
    }
}

impl Default for SystemStatus {
    fn default() -> Self {
        Self::new(StatusClass::Connecting)
    }
}

/// Deserialize an identifier that can be either a string or a number into a String
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let val: serde_json::Value = serde_json::Value::deserialize(deserializer)?;
    match val {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        _ => Err(serde::de::Error::custom("expected string or number for id")),
    }
}
