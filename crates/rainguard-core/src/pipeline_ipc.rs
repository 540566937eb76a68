use crate::{deserialize_id, GeoPoint};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub const DEFAULT_MAX_FRAME_BYTES: usize = 256 * 1024;
/// Literal liveness probe sent while the connection is open.
pub const KEEPALIVE_FRAME: &str = "ping";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SystemReady,
    WeatherUpdate,
    NoFarmers,
    FarmerDetected,
    BlockchainVerification,
    BlockchainVerified,
    PayoutCalculation,
    PreemptiveDisbursement,
    EmailSent,
    PhotoSubmission,
    AiAnalysisStarted,
    AiAnalysisCompleted,
    FinalSettlement,
    ClaimCompleted,
}

impl EventKind {
    pub const ALL: [EventKind; 14] = [
        EventKind::SystemReady,
        EventKind::WeatherUpdate,
        EventKind::NoFarmers,
        EventKind::FarmerDetected,
        EventKind::BlockchainVerification,
        EventKind::BlockchainVerified,
        EventKind::PayoutCalculation,
        EventKind::PreemptiveDisbursement,
        EventKind::EmailSent,
        EventKind::PhotoSubmission,
        EventKind::AiAnalysisStarted,
        EventKind::AiAnalysisCompleted,
        EventKind::FinalSettlement,
        EventKind::ClaimCompleted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::SystemReady => "system_ready",
            EventKind::WeatherUpdate => "weather_update",
            EventKind::NoFarmers => "no_farmers",
            EventKind::FarmerDetected => "farmer_detected",
            EventKind::BlockchainVerification => "blockchain_verification",
            EventKind::BlockchainVerified => "blockchain_verified",
            EventKind::PayoutCalculation => "payout_calculation",
            EventKind::PreemptiveDisbursement => "preemptive_disbursement",
            EventKind::EmailSent => "email_sent",
            EventKind::PhotoSubmission => "photo_submission",
            EventKind::AiAnalysisStarted => "ai_analysis_started",
            EventKind::AiAnalysisCompleted => "ai_analysis_completed",
            EventKind::FinalSettlement => "final_settlement",
            EventKind::ClaimCompleted => "claim_completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SystemReadyPayload {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub regions: u64,
    #[serde(default)]
    pub registered_farmers: u64,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WeatherUpdatePayload {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub rainfall: Option<f64>,
    #[serde(default)]
    pub drought_probability: f64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl WeatherUpdatePayload {
    pub fn is_drought_detected(&self) -> bool {
        self.status == "drought_detected"
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NoFarmersPayload {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FarmerDetectedPayload {
    #[serde(deserialize_with = "deserialize_id")]
    pub farmer_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockchainVerificationPayload {
    #[serde(deserialize_with = "deserialize_id")]
    pub farmer_id: String,
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockchainVerifiedPayload {
    #[serde(deserialize_with = "deserialize_id")]
    pub farmer_id: String,
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub transaction_signature: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayoutCalculationPayload {
    #[serde(deserialize_with = "deserialize_id")]
    pub farmer_id: String,
    #[serde(default)]
    pub sum_insured: Option<f64>,
    #[serde(default)]
    pub drought_probability: Option<f64>,
    #[serde(default)]
    pub preemptive_payout: f64,
    #[serde(default)]
    pub remaining_coverage: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Shared by `preemptive_disbursement` and `final_settlement`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisbursementPayload {
    #[serde(deserialize_with = "deserialize_id")]
    pub farmer_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub transaction_signature: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total_payout: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailSentPayload {
    #[serde(deserialize_with = "deserialize_id")]
    pub farmer_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub action_required: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhotoSubmissionPayload {
    #[serde(deserialize_with = "deserialize_id")]
    pub farmer_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub num_photos: u32,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiAnalysisStartedPayload {
    #[serde(deserialize_with = "deserialize_id")]
    pub farmer_id: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiAnalysisCompletedPayload {
    #[serde(deserialize_with = "deserialize_id")]
    pub farmer_id: String,
    #[serde(default)]
    pub health_classification: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub yield_loss_percent: f64,
    #[serde(default)]
    pub damage_verified: bool,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimCompletedPayload {
    #[serde(deserialize_with = "deserialize_id")]
    pub farmer_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub total_payout: f64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// One decoded pipeline notification.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    SystemReady(SystemReadyPayload),
    WeatherUpdate(WeatherUpdatePayload),
    NoFarmers(NoFarmersPayload),
    FarmerDetected(FarmerDetectedPayload),
    BlockchainVerification(BlockchainVerificationPayload),
    BlockchainVerified(BlockchainVerifiedPayload),
    PayoutCalculation(PayoutCalculationPayload),
    PreemptiveDisbursement(DisbursementPayload),
    EmailSent(EmailSentPayload),
    PhotoSubmission(PhotoSubmissionPayload),
    AiAnalysisStarted(AiAnalysisStartedPayload),
    AiAnalysisCompleted(AiAnalysisCompletedPayload),
    FinalSettlement(DisbursementPayload),
    ClaimCompleted(ClaimCompletedPayload),
}

impl PipelineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PipelineEvent::SystemReady(_) => EventKind::SystemReady,
            PipelineEvent::WeatherUpdate(_) => EventKind::WeatherUpdate,
            PipelineEvent::NoFarmers(_) => EventKind::NoFarmers,
            PipelineEvent::FarmerDetected(_) => EventKind::FarmerDetected,
            PipelineEvent::BlockchainVerification(_) => EventKind::BlockchainVerification,
            PipelineEvent::BlockchainVerified(_) => EventKind::BlockchainVerified,
            PipelineEvent::PayoutCalculation(_) => EventKind::PayoutCalculation,
            PipelineEvent::PreemptiveDisbursement(_) => EventKind::PreemptiveDisbursement,
            PipelineEvent::EmailSent(_) => EventKind::EmailSent,
            PipelineEvent::PhotoSubmission(_) => EventKind::PhotoSubmission,
            PipelineEvent::AiAnalysisStarted(_) => EventKind::AiAnalysisStarted,
            PipelineEvent::AiAnalysisCompleted(_) => EventKind::AiAnalysisCompleted,
            PipelineEvent::FinalSettlement(_) => EventKind::FinalSettlement,
            PipelineEvent::ClaimCompleted(_) => EventKind::ClaimCompleted,
        }
    }

    pub fn farmer_id(&self) -> Option<&str> {
        match self {
            PipelineEvent::SystemReady(_)
            | PipelineEvent::WeatherUpdate(_)
            | PipelineEvent::NoFarmers(_) => None,
            PipelineEvent::FarmerDetected(payload) => Some(&payload.farmer_id),
            PipelineEvent::BlockchainVerification(payload) => Some(&payload.farmer_id),
            PipelineEvent::BlockchainVerified(payload) => Some(&payload.farmer_id),
            PipelineEvent::PayoutCalculation(payload) => Some(&payload.farmer_id),
            PipelineEvent::PreemptiveDisbursement(payload)
            | PipelineEvent::FinalSettlement(payload) => Some(&payload.farmer_id),
            PipelineEvent::EmailSent(payload) => Some(&payload.farmer_id),
            PipelineEvent::PhotoSubmission(payload) => Some(&payload.farmer_id),
            PipelineEvent::AiAnalysisStarted(payload) => Some(&payload.farmer_id),
            PipelineEvent::AiAnalysisCompleted(payload) => Some(&payload.farmer_id),
            PipelineEvent::ClaimCompleted(payload) => Some(&payload.farmer_id),
        }
    }

    /// Builds the typed event for `kind` out of the raw `data` object.
    pub fn from_parts(kind: EventKind, data: Value) -> Result<Self, FrameError> {
        let data = match data {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let event = match kind {
            EventKind::SystemReady => PipelineEvent::SystemReady(payload(kind, data)?),
            EventKind::WeatherUpdate => PipelineEvent::WeatherUpdate(payload(kind, data)?),
            EventKind::NoFarmers => PipelineEvent::NoFarmers(payload(kind, data)?),
            EventKind::FarmerDetected => PipelineEvent::FarmerDetected(payload(kind, data)?),
            EventKind::BlockchainVerification => {
                PipelineEvent::BlockchainVerification(payload(kind, data)?)
            }
            EventKind::BlockchainVerified => {
                PipelineEvent::BlockchainVerified(payload(kind, data)?)
            }
            EventKind::PayoutCalculation => PipelineEvent::PayoutCalculation(payload(kind, data)?),
            EventKind::PreemptiveDisbursement => {
                PipelineEvent::PreemptiveDisbursement(payload(kind, data)?)
            }
            EventKind::EmailSent => PipelineEvent::EmailSent(payload(kind, data)?),
            EventKind::PhotoSubmission => PipelineEvent::PhotoSubmission(payload(kind, data)?),
            EventKind::AiAnalysisStarted => PipelineEvent::AiAnalysisStarted(payload(kind, data)?),
            EventKind::AiAnalysisCompleted => {
                PipelineEvent::AiAnalysisCompleted(payload(kind, data)?)
            }
            EventKind::FinalSettlement => PipelineEvent::FinalSettlement(payload(kind, data)?),
            EventKind::ClaimCompleted => PipelineEvent::ClaimCompleted(payload(kind, data)?),
        };
        Ok(event)
    }
}

fn payload<T: DeserializeOwned>(kind: EventKind, data: Value) -> Result<T, FrameError> {
    serde_json::from_value(data).map_err(|err| FrameError::Payload {
        kind: kind.as_str(),
        reason: err.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Outcome of decoding one text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Event(PipelineEvent),
    /// Well-formed frame with a type this client does not handle.
    Ignored { kind: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame exceeds max size: {size} > {max}")]
    OversizedFrame { size: usize, max: usize },
    #[error("frame decode failed: {0}")]
    Decode(String),
    #[error("payload for {kind} invalid: {reason}")]
    Payload { kind: &'static str, reason: String },
}

pub fn decode_frame(text: &str, max_frame_bytes: usize) -> Result<InboundFrame, FrameError> {
    let raw = text.trim_end_matches(&['\n', '\r'][..]);
    if raw.len() > max_frame_bytes {
        return Err(FrameError::OversizedFrame {
            size: raw.len(),
            max: max_frame_bytes,
        });
    }
    let frame: RawFrame =
        serde_json::from_str(raw).map_err(|err| FrameError::Decode(err.to_string()))?;
    let Some(kind) = EventKind::parse(&frame.kind) else {
        return Ok(InboundFrame::Ignored { kind: frame.kind });
    };
    PipelineEvent::from_parts(kind, frame.data).map(InboundFrame::Event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(value: Value) -> String {
        value.to_string()
    }

    #[test]
    fn decodes_farmer_detected_with_numeric_id() {
        let text = frame(json!({
            "type": "farmer_detected",
            "data": {
                "farmer_id": 42,
                "name": "Amara Okonkwo",
                "region": "Kenya Western",
                "location": {"lat": 0.5, "lon": 34.5},
                "timestamp": "2026-02-07T21:00:00"
            }
        }));
        let decoded = decode_frame(&text, DEFAULT_MAX_FRAME_BYTES).expect("decode");
        let InboundFrame::Event(PipelineEvent::FarmerDetected(payload)) = decoded else {
            panic!("unexpected frame: {decoded:?}");
        };
        assert_eq!(payload.farmer_id, "42");
        assert_eq!(payload.location, Some(GeoPoint { lat: 0.5, lon: 34.5 }));
    }

    #[test]
    fn unknown_type_is_ignored_not_rejected() {
        let decoded =
            decode_frame(r#"{"type":"pong"}"#, DEFAULT_MAX_FRAME_BYTES).expect("decode");
        assert_eq!(
            decoded,
            InboundFrame::Ignored {
                kind: "pong".to_string()
            }
        );
    }

    #[test]
    fn missing_data_uses_payload_defaults() {
        let decoded =
            decode_frame(r#"{"type":"no_farmers"}"#, DEFAULT_MAX_FRAME_BYTES).expect("decode");
        assert_eq!(
            decoded,
            InboundFrame::Event(PipelineEvent::NoFarmers(NoFarmersPayload::default()))
        );
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(matches!(
            decode_frame("not json", DEFAULT_MAX_FRAME_BYTES),
            Err(FrameError::Decode(_))
        ));
        assert!(matches!(
            decode_frame(r#"{"data":{}}"#, DEFAULT_MAX_FRAME_BYTES),
            Err(FrameError::Decode(_))
        ));
        let err = decode_frame(
            r#"{"type":"payout_calculation","data":{"preemptive_payout":10}}"#,
            DEFAULT_MAX_FRAME_BYTES,
        )
        .expect_err("farmer_id is required");
        assert!(matches!(
            err,
            FrameError::Payload {
                kind: "payout_calculation",
                ..
            }
        ));
    }

    #[test]
    fn oversized_frame_rejected_before_parsing() {
        let text = frame(json!({"type": "no_farmers", "data": {"region": "x".repeat(64)}}));
        assert!(matches!(
            decode_frame(&text, 16),
            Err(FrameError::OversizedFrame { max: 16, .. })
        ));
    }

    #[test]
    fn every_kind_name_parses_back() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::parse("Farmer_Detected"), None);
    }
}
