//! View-state engine: every decoded pipeline event and every transport
//! transition lands here and is folded into the claim registry, the bounded
//! histories, the aggregate counters and the activity feed.

use crate::history::{BoundedHistory, Keyed};
use crate::pipeline_ipc::{
    AiAnalysisCompletedPayload, AiAnalysisStartedPayload, BlockchainVerificationPayload,
    BlockchainVerifiedPayload, ClaimCompletedPayload, DisbursementPayload, EmailSentPayload,
    FarmerDetectedPayload, NoFarmersPayload, PayoutCalculationPayload, PhotoSubmissionPayload,
    PipelineEvent, SystemReadyPayload, WeatherUpdatePayload,
};
use crate::{
    ActivityEntry, AggregateStats, AiAnalysisRecord, AnalysisStatus, ClaimStage, ClaimView,
    DisbursementKind, DisbursementRecord, Severity, StatusClass, SystemStatus, VerificationRecord,
    VerificationStatus, UNKNOWN_FARMER_NAME,
};
use chrono::Utc;
use std::collections::HashMap;

pub const WEATHER_CAPACITY: usize = 20;
pub const RECORD_CAPACITY: usize = 10;
pub const ACTIVITY_CAPACITY: usize = 50;

impl Keyed for VerificationRecord {
    fn key(&self) -> &str {
        &self.farmer_id
    }
}

impl Keyed for AiAnalysisRecord {
    fn key(&self) -> &str {
        &self.farmer_id
    }
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    status: SystemStatus,
    stats: AggregateStats,
    claims: HashMap<String, ClaimView>,
    weather: BoundedHistory<WeatherUpdatePayload>,
    verifications: BoundedHistory<VerificationRecord>,
    active_claims: BoundedHistory<String>,
    disbursements: BoundedHistory<DisbursementRecord>,
    emails: BoundedHistory<EmailSentPayload>,
    analyses: BoundedHistory<AiAnalysisRecord>,
    activity: BoundedHistory<ActivityEntry>,
    next_activity_seq: u64,
    weather_received: u64,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardState {
    pub fn new() -> Self {
        Self {
            status: SystemStatus::default(),
            stats: AggregateStats::default(),
            claims: HashMap::new(),
            weather: BoundedHistory::new(WEATHER_CAPACITY),
            verifications: BoundedHistory::new(RECORD_CAPACITY),
            active_claims: BoundedHistory::new(RECORD_CAPACITY),
            disbursements: BoundedHistory::new(RECORD_CAPACITY),
            emails: BoundedHistory::new(RECORD_CAPACITY),
            analyses: BoundedHistory::new(RECORD_CAPACITY),
            activity: BoundedHistory::new(ACTIVITY_CAPACITY),
            next_activity_seq: 1,
            weather_received: 0,
        }
    }

    pub fn status(&self) -> &SystemStatus {
        &self.status
    }

    pub fn stats(&self) -> &AggregateStats {
        &self.stats
    }

    /// Registry lookup; `None` when the farmer has not been detected.
    pub fn claim(&self, farmer_id: &str) -> Option<&ClaimView> {
        self.claims.get(farmer_id)
    }

    pub fn claims(&self) -> impl Iterator<Item = &ClaimView> {
        self.claims.values()
    }

    pub fn weather(&self) -> &BoundedHistory<WeatherUpdatePayload> {
        &self.weather
    }

    pub fn verifications(&self) -> &BoundedHistory<VerificationRecord> {
        &self.verifications
    }

    pub fn active_claims(&self) -> &BoundedHistory<String> {
        &self.active_claims
    }

    pub fn disbursements(&self) -> &BoundedHistory<DisbursementRecord> {
        &self.disbursements
    }

    pub fn emails(&self) -> &BoundedHistory<EmailSentPayload> {
        &self.emails
    }

    pub fn analyses(&self) -> &BoundedHistory<AiAnalysisRecord> {
        &self.analyses
    }

    pub fn activity(&self) -> &BoundedHistory<ActivityEntry> {
        &self.activity
    }

    /// Sequence number the next activity entry will receive.
    pub fn next_activity_seq(&self) -> u64 {
        self.next_activity_seq
    }

    /// Weather readings applied since start. Unlike `stats().weather_events`
    /// this is never overwritten by a snapshot.
    pub fn weather_received(&self) -> u64 {
        self.weather_received
    }

    pub fn mark_online(&mut self) {
        self.status = SystemStatus::new(StatusClass::Online);
        self.log_activity(
            "System Connected",
            "System is now live and monitoring data".to_string(),
            Severity::Success,
        );
    }

    pub fn mark_error(&mut self) {
        self.status = SystemStatus::new(StatusClass::Error);
    }

    pub fn mark_disconnected(&mut self) {
        self.status = SystemStatus::new(StatusClass::Disconnected);
    }

    /// Wholesale overwrite from the startup snapshot. A snapshot that lands
    /// after streamed events replaces the counters they advanced.
    pub fn apply_snapshot(&mut self, stats: AggregateStats) {
        self.stats = stats;
    }

    pub fn apply_event(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::SystemReady(payload) => self.on_system_ready(payload),
            PipelineEvent::WeatherUpdate(payload) => self.on_weather_update(payload),
            PipelineEvent::NoFarmers(payload) => self.on_no_farmers(payload),
            PipelineEvent::FarmerDetected(payload) => self.on_farmer_detected(payload),
            PipelineEvent::BlockchainVerification(payload) => {
                self.on_blockchain_verification(payload)
            }
            PipelineEvent::BlockchainVerified(payload) => self.on_blockchain_verified(payload),
            PipelineEvent::PayoutCalculation(payload) => self.on_payout_calculation(payload),
            PipelineEvent::PreemptiveDisbursement(payload) => {
                self.on_disbursement(payload, DisbursementKind::Preemptive)
            }
            PipelineEvent::EmailSent(payload) => self.on_email_sent(payload),
            PipelineEvent::PhotoSubmission(payload) => self.on_photo_submission(payload),
            PipelineEvent::AiAnalysisStarted(payload) => self.on_ai_analysis_started(payload),
            PipelineEvent::AiAnalysisCompleted(payload) => self.on_ai_analysis_completed(payload),
            PipelineEvent::FinalSettlement(payload) => {
                self.on_disbursement(payload, DisbursementKind::Final)
            }
            PipelineEvent::ClaimCompleted(payload) => self.on_claim_completed(payload),
        }
    }

    fn on_system_ready(&mut self, payload: SystemReadyPayload) {
        self.stats.total_farmers = payload.registered_farmers;
        self.stats.total_regions = payload.regions;
        self.log_activity("System Ready", payload.message, Severity::Success);
    }

    fn on_weather_update(&mut self, payload: WeatherUpdatePayload) {
        self.stats.weather_events += 1;
        self.weather_received += 1;
        if payload.is_drought_detected() {
            let message = format!(
                "High drought probability ({}) in {}",
                percent(payload.drought_probability),
                payload.region
            );
            self.log_activity("Drought Detected", message, Severity::Danger);
        }
        self.weather.push(payload);
    }

    fn on_no_farmers(&mut self, payload: NoFarmersPayload) {
        let message = format!("No registered farmers in {}", payload.region);
        self.log_activity("No Farmers", message, Severity::Warning);
    }

    fn on_farmer_detected(&mut self, payload: FarmerDetectedPayload) {
        let message = format!(
            "{} detected in affected area ({})",
            payload.name, payload.region
        );
        // Each detection opens a fresh claim, even for a farmer seen before.
        let location = match self.claims.get(&payload.farmer_id) {
            Some(previous) => {
                self.active_claims.remove_by_key(&payload.farmer_id);
                payload.location.or(previous.location)
            }
            None => payload.location,
        };
        self.claims.insert(
            payload.farmer_id.clone(),
            ClaimView {
                farmer_id: payload.farmer_id.clone(),
                name: payload.name,
                region: payload.region,
                location,
                stage: ClaimStage::Created,
                payout_amount: None,
            },
        );
        self.stats.active_claims += 1;
        self.active_claims.push(payload.farmer_id);
        self.log_activity("Farmer Detected", message, Severity::Info);
    }

    fn on_blockchain_verification(&mut self, payload: BlockchainVerificationPayload) {
        let name = self.resolve_name(&payload.farmer_id);
        self.advance_claim(&payload.farmer_id, ClaimStage::Verifying);
        let message = format!("Verifying {name} on Solana blockchain");
        self.verifications.push(VerificationRecord {
            farmer_id: payload.farmer_id,
            name,
            wallet_address: payload.wallet_address,
            contract_address: payload.contract_address,
            status: VerificationStatus::Pending,
            transaction_signature: None,
            timestamp: payload.timestamp,
        });
        self.log_activity("Blockchain Verification", message, Severity::Info);
    }

    fn on_blockchain_verified(&mut self, payload: BlockchainVerifiedPayload) {
        match self.verifications.find_by_key_mut(&payload.farmer_id) {
            Some(record) => {
                record.status = VerificationStatus::Verified;
                record.transaction_signature = payload.transaction_signature;
                if payload.wallet_address.is_some() {
                    record.wallet_address = payload.wallet_address;
                }
            }
            None => {
                // Confirmation arrived without its pending record (evicted or never seen).
                let name = self.resolve_name(&payload.farmer_id);
                self.verifications.push(VerificationRecord {
                    farmer_id: payload.farmer_id.clone(),
                    name,
                    wallet_address: payload.wallet_address,
                    contract_address: None,
                    status: VerificationStatus::Verified,
                    transaction_signature: payload.transaction_signature,
                    timestamp: payload.timestamp,
                });
            }
        }
        self.advance_claim(&payload.farmer_id, ClaimStage::Verifying);
        self.log_activity(
            "Verification Success",
            "Blockchain verification completed successfully".to_string(),
            Severity::Success,
        );
    }

    fn on_payout_calculation(&mut self, payload: PayoutCalculationPayload) {
        if let Some(view) = self.claims.get_mut(&payload.farmer_id) {
            view.advance_to(ClaimStage::Calculated);
            view.payout_amount = Some(payload.preemptive_payout);
        }
        let message = match payload.drought_probability {
            Some(probability) => format!(
                "Pre-emptive payout: ${} ({} drought probability)",
                payload.preemptive_payout,
                percent(probability)
            ),
            None => format!("Pre-emptive payout: ${}", payload.preemptive_payout),
        };
        self.log_activity("Payout Calculated", message, Severity::Info);
    }

    fn on_disbursement(&mut self, payload: DisbursementPayload, kind: DisbursementKind) {
        self.advance_claim(&payload.farmer_id, ClaimStage::Disbursed);
        if payload.amount.is_finite() && payload.amount > 0.0 {
            self.stats.total_disbursed += payload.amount;
        }
        let message = format!("${} sent to {}", payload.amount, payload.name);
        self.disbursements.push(DisbursementRecord { kind, payload });
        self.log_activity(kind.title(), message, Severity::Success);
    }

    fn on_email_sent(&mut self, payload: EmailSentPayload) {
        let message = format!("Email sent to {}", payload.email);
        self.emails.push(payload);
        self.log_activity("Email Notification", message, Severity::Info);
    }

    fn on_photo_submission(&mut self, payload: PhotoSubmissionPayload) {
        let message = format!(
            "{} submitted {} crop photos",
            payload.name, payload.num_photos
        );
        self.analyses.push(AiAnalysisRecord {
            farmer_id: payload.farmer_id,
            name: payload.name,
            num_photos: payload.num_photos,
            location: payload.location,
            status: AnalysisStatus::Received,
            model: None,
            health_classification: None,
            confidence: None,
            yield_loss_percent: None,
            damage_verified: None,
            timestamp: payload.timestamp,
        });
        self.log_activity("Photos Received", message, Severity::Info);
    }

    fn on_ai_analysis_started(&mut self, payload: AiAnalysisStartedPayload) {
        let model = payload
            .model
            .clone()
            .unwrap_or_else(|| "PlantVillage".to_string());
        if let Some(record) = self.analyses.find_by_key_mut(&payload.farmer_id) {
            record.status = AnalysisStatus::Analyzing;
            record.model = payload.model;
        }
        self.log_activity(
            "AI Analysis Started",
            format!("Running {model} model analysis"),
            Severity::Info,
        );
    }

    fn on_ai_analysis_completed(&mut self, payload: AiAnalysisCompletedPayload) {
        let severity = if payload.damage_verified {
            Severity::Success
        } else {
            Severity::Warning
        };
        let message = format!(
            "Detected: {} ({} confidence, {}% yield loss)",
            payload.health_classification,
            percent(payload.confidence),
            payload.yield_loss_percent
        );
        if let Some(record) = self.analyses.find_by_key_mut(&payload.farmer_id) {
            record.status = AnalysisStatus::Completed;
            record.health_classification = Some(payload.health_classification);
            record.confidence = Some(payload.confidence);
            record.yield_loss_percent = Some(payload.yield_loss_percent);
            record.damage_verified = Some(payload.damage_verified);
            if payload.timestamp.is_some() {
                record.timestamp = payload.timestamp;
            }
        }
        self.log_activity("AI Analysis Complete", message, severity);
    }

    fn on_claim_completed(&mut self, payload: ClaimCompletedPayload) {
        self.advance_claim(&payload.farmer_id, ClaimStage::Completed);
        self.stats.claims_completed += 1;
        let name = if payload.name.is_empty() {
            self.resolve_name(&payload.farmer_id)
        } else {
            payload.name
        };
        let message = format!(
            "Full claim processed for {name} - Total: ${}",
            payload.total_payout
        );
        self.log_activity("Claim Completed", message, Severity::Success);
    }

    fn advance_claim(&mut self, farmer_id: &str, stage: ClaimStage) {
        if let Some(view) = self.claims.get_mut(farmer_id) {
            view.advance_to(stage);
        }
    }

    fn resolve_name(&self, farmer_id: &str) -> String {
        self.claims
            .get(farmer_id)
            .map(|view| view.name.clone())
            .unwrap_or_else(|| UNKNOWN_FARMER_NAME.to_string())
    }

    fn log_activity(&mut self, title: &str, message: String, severity: Severity) {
        let seq = self.next_activity_seq;
        self.next_activity_seq += 1;
        self.activity.push(ActivityEntry {
            seq,
            title: title.to_string(),
            message,
            severity,
            timestamp: Utc::now(),
        });
    }
}

fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline_ipc::{decode_frame, InboundFrame, DEFAULT_MAX_FRAME_BYTES};
    use serde_json::{json, Value};

    fn event(value: Value) -> PipelineEvent {
        match decode_frame(&value.to_string(), DEFAULT_MAX_FRAME_BYTES) {
            Ok(InboundFrame::Event(event)) => event,
            other => panic!("expected event, got {other:?}"),
        }
    }

    fn farmer_detected(id: &str, name: &str) -> PipelineEvent {
        event(json!({
            "type": "farmer_detected",
            "data": {"farmer_id": id, "name": name, "region": "R1"}
        }))
    }

    fn verified(id: &str, signature: &str) -> PipelineEvent {
        event(json!({
            "type": "blockchain_verified",
            "data": {"farmer_id": id, "status": "verified", "transaction_signature": signature}
        }))
    }

    fn disbursement(kind: &str, id: &str, amount: f64) -> PipelineEvent {
        event(json!({
            "type": kind,
            "data": {"farmer_id": id, "name": "Amara", "amount": amount}
        }))
    }

    #[test]
    fn farmer_detected_creates_claim_at_stage_one() {
        let mut state = DashboardState::new();
        state.apply_event(farmer_detected("F1", "Amara"));

        let view = state.claim("F1").expect("claim view");
        assert_eq!(view.stage, ClaimStage::Created);
        assert_eq!(view.stage.ordinal(), 1);
        assert_eq!(state.active_claims().len(), 1);
        assert_eq!(state.stats().active_claims, 1);
        let entry = state.activity().front().expect("activity");
        assert_eq!(entry.title, "Farmer Detected");
        assert_eq!(entry.message, "Amara detected in affected area (R1)");
    }

    #[test]
    fn redetection_after_completion_opens_a_new_claim() {
        let mut state = DashboardState::new();
        state.apply_event(farmer_detected("F1", "Amara"));
        state.apply_event(farmer_detected("F2", "Kofi"));
        state.apply_event(event(json!({
            "type": "payout_calculation",
            "data": {"farmer_id": "F1", "preemptive_payout": 150}
        })));
        state.apply_event(event(json!({
            "type": "claim_completed",
            "data": {"farmer_id": "F1", "name": "Amara", "total_payout": 150}
        })));
        assert_eq!(state.claim("F1").map(|view| view.stage), Some(ClaimStage::Completed));

        state.apply_event(farmer_detected("F1", "Amara Okonkwo"));

        let view = state.claim("F1").expect("claim view");
        assert_eq!(view.stage, ClaimStage::Created);
        assert_eq!(view.payout_amount, None);
        assert_eq!(view.name, "Amara Okonkwo");
        let ids: Vec<&str> = state.active_claims().iter().map(String::as_str).collect();
        assert_eq!(ids, vec!["F1", "F2"]);
        assert_eq!(state.stats().active_claims, 3);
        assert_eq!(state.stats().claims_completed, 1);
    }

    #[test]
    fn drought_weather_update_logs_danger_percentage() {
        let mut state = DashboardState::new();
        state.apply_event(event(json!({
            "type": "weather_update",
            "data": {"region": "R1", "status": "drought_detected", "drought_probability": 0.82}
        })));

        assert_eq!(state.weather().len(), 1);
        assert_eq!(state.stats().weather_events, 1);
        assert_eq!(state.activity().len(), 1);
        let entry = state.activity().front().expect("activity");
        assert_eq!(entry.severity, Severity::Danger);
        assert!(entry.message.contains("82.0%"), "{}", entry.message);
    }

    #[test]
    fn normal_weather_update_is_buffered_without_activity() {
        let mut state = DashboardState::new();
        for index in 0..25 {
            state.apply_event(event(json!({
                "type": "weather_update",
                "data": {"region": format!("R{index}"), "status": "normal", "drought_probability": 0.1}
            })));
        }

        assert_eq!(state.weather().len(), WEATHER_CAPACITY);
        assert_eq!(
            state.weather().front().map(|w| w.region.as_str()),
            Some("R24")
        );
        assert_eq!(state.stats().weather_events, 25);
        assert!(state.activity().is_empty());
    }

    #[test]
    fn payout_without_verification_jumps_to_stage_three() {
        let mut state = DashboardState::new();
        state.apply_event(farmer_detected("F1", "Amara"));
        state.apply_event(event(json!({
            "type": "payout_calculation",
            "data": {"farmer_id": "F1", "preemptive_payout": 150, "drought_probability": 0.9}
        })));

        let view = state.claim("F1").expect("claim view");
        assert_eq!(view.stage, ClaimStage::Calculated);
        assert_eq!(view.payout_amount, Some(150.0));
        let entry = state.activity().front().expect("activity");
        assert_eq!(
            entry.message,
            "Pre-emptive payout: $150 (90.0% drought probability)"
        );
    }

    #[test]
    fn final_settlement_records_kind_and_adds_to_total() {
        let mut state = DashboardState::new();
        let before = state.stats().total_disbursed;
        state.apply_event(disbursement("final_settlement", "F1", 150.0));

        let front = state.disbursements().front().expect("disbursement");
        assert_eq!(front.kind, DisbursementKind::Final);
        assert_eq!(front.payload.amount, 150.0);
        assert_eq!(state.stats().total_disbursed, before + 150.0);
        let entry = state.activity().front().expect("activity");
        assert_eq!(entry.title, "Final Settlement");
        assert_eq!(entry.message, "$150 sent to Amara");
    }

    #[test]
    fn verified_before_detection_is_tolerated() {
        let mut state = DashboardState::new();
        state.apply_event(verified("F9", "sig-1"));

        assert!(state.claim("F9").is_none());
        let record = state.verifications().front().expect("verification");
        assert_eq!(record.name, UNKNOWN_FARMER_NAME);
        assert_eq!(record.status, VerificationStatus::Verified);
        assert_eq!(record.transaction_signature.as_deref(), Some("sig-1"));
        assert_eq!(state.activity().len(), 1);
    }

    #[test]
    fn verification_before_detection_uses_fallback_name() {
        let mut state = DashboardState::new();
        state.apply_event(event(json!({
            "type": "blockchain_verification",
            "data": {"farmer_id": "F9", "wallet_address": "W", "contract_address": "C"}
        })));

        let record = state.verifications().front().expect("verification");
        assert_eq!(record.name, UNKNOWN_FARMER_NAME);
        assert_eq!(record.status, VerificationStatus::Pending);
        assert_eq!(record.contract_address.as_deref(), Some("C"));
        assert!(state.claim("F9").is_none());
        assert_eq!(
            state.activity().front().map(|entry| entry.message.as_str()),
            Some("Verifying Unknown on Solana blockchain")
        );
    }

    #[test]
    fn replayed_verified_event_is_idempotent() {
        let mut once = DashboardState::new();
        let mut twice = DashboardState::new();
        for state in [&mut once, &mut twice] {
            state.apply_event(farmer_detected("F1", "Amara"));
            state.apply_event(event(json!({
                "type": "blockchain_verification",
                "data": {"farmer_id": "F1", "wallet_address": "W"}
            })));
            state.apply_event(verified("F1", "sig-1"));
        }
        twice.apply_event(verified("F1", "sig-1"));

        assert_eq!(once.verifications(), twice.verifications());
        let record = twice.verifications().front().expect("verification");
        assert_eq!(record.name, "Amara");
        assert_eq!(record.status, VerificationStatus::Verified);
        assert_eq!(record.transaction_signature.as_deref(), Some("sig-1"));
        assert_eq!(
            once.claim("F1").map(|view| view.stage),
            twice.claim("F1").map(|view| view.stage)
        );
    }

    #[test]
    fn verified_does_not_regress_a_later_stage() {
        let mut state = DashboardState::new();
        state.apply_event(farmer_detected("F1", "Amara"));
        state.apply_event(disbursement("preemptive_disbursement", "F1", 40.0));
        state.apply_event(verified("F1", "late"));
        assert_eq!(
            state.claim("F1").map(|view| view.stage),
            Some(ClaimStage::Disbursed)
        );
    }

    #[test]
    fn completion_and_disbursement_counters_are_monotonic() {
        let mut state = DashboardState::new();
        let mut last_completed = 0;
        let mut last_total = 0.0;
        let sequence = vec![
            disbursement("preemptive_disbursement", "F1", 75.5),
            event(json!({"type": "claim_completed", "data": {"farmer_id": "F1", "total_payout": 300}})),
            disbursement("final_settlement", "F1", -20.0),
            disbursement("final_settlement", "F2", 224.5),
            event(json!({"type": "claim_completed", "data": {"farmer_id": "F2"}})),
        ];
        for item in sequence {
            state.apply_event(item);
            assert!(state.stats().claims_completed >= last_completed);
            assert!(state.stats().total_disbursed >= last_total);
            last_completed = state.stats().claims_completed;
            last_total = state.stats().total_disbursed;
        }
        assert_eq!(last_completed, 2);
        assert_eq!(last_total, 300.0);
    }

    #[test]
    fn claim_completed_reaches_terminal_stage() {
        let mut state = DashboardState::new();
        state.apply_event(farmer_detected("F1", "Amara"));
        state.apply_event(event(json!({
            "type": "claim_completed",
            "data": {"farmer_id": "F1", "total_payout": 300}
        })));
        state.apply_event(verified("F1", "late"));

        assert_eq!(
            state.claim("F1").map(|view| view.stage),
            Some(ClaimStage::Completed)
        );
        let completed = state
            .activity()
            .iter()
            .find(|entry| entry.title == "Claim Completed")
            .expect("completion entry");
        assert_eq!(completed.message, "Full claim processed for Amara - Total: $300");
    }

    #[test]
    fn ai_analysis_progresses_in_place() {
        let mut state = DashboardState::new();
        state.apply_event(event(json!({
            "type": "photo_submission",
            "data": {"farmer_id": "F1", "name": "Amara", "num_photos": 4, "status": "received"}
        })));
        state.apply_event(event(json!({
            "type": "ai_analysis_started",
            "data": {"farmer_id": "F1", "model": "EfficientNetV2B0-PlantVillage"}
        })));
        {
            let record = state.analyses().find_by_key("F1").expect("analysis");
            assert_eq!(record.status, AnalysisStatus::Analyzing);
            assert_eq!(
                record.model.as_deref(),
                Some("EfficientNetV2B0-PlantVillage")
            );
        }

        state.apply_event(event(json!({
            "type": "ai_analysis_completed",
            "data": {
                "farmer_id": "F1",
                "health_classification": "severe",
                "confidence": 0.912,
                "yield_loss_percent": 48.3,
                "damage_verified": false
            }
        })));

        assert_eq!(state.analyses().len(), 1);
        let record = state.analyses().front().expect("analysis");
        assert_eq!(record.status, AnalysisStatus::Completed);
        assert_eq!(record.num_photos, 4);
        assert_eq!(record.health_classification.as_deref(), Some("severe"));
        assert_eq!(record.damage_verified, Some(false));
        let entry = state.activity().front().expect("activity");
        assert_eq!(entry.severity, Severity::Warning);
        assert_eq!(
            entry.message,
            "Detected: severe (91.2% confidence, 48.3% yield loss)"
        );
    }

    #[test]
    fn analysis_events_without_submission_only_log() {
        let mut state = DashboardState::new();
        state.apply_event(event(json!({
            "type": "ai_analysis_completed",
            "data": {"farmer_id": "F7", "health_classification": "major", "damage_verified": true}
        })));
        assert!(state.analyses().is_empty());
        assert_eq!(
            state.activity().front().map(|entry| entry.severity),
            Some(Severity::Success)
        );
    }

    #[test]
    fn system_ready_and_snapshot_overwrite_totals() {
        let mut state = DashboardState::new();
        state.apply_event(event(json!({
            "type": "system_ready",
            "data": {"message": "RainGuard Protocol Simulation Active", "regions": 8, "registered_farmers": 20}
        })));
        state.apply_event(disbursement("final_settlement", "F1", 150.0));
        assert_eq!(state.stats().total_farmers, 20);
        assert_eq!(state.stats().total_disbursed, 150.0);

        state.apply_snapshot(AggregateStats {
            total_farmers: 18,
            total_regions: 8,
            active_claims: 0,
            total_disbursed: 0.0,
            claims_completed: 0,
            weather_events: 0,
        });
        assert_eq!(state.stats().total_farmers, 18);
        assert_eq!(state.stats().total_disbursed, 0.0);
    }

    #[test]
    fn email_and_no_farmers_entries() {
        let mut state = DashboardState::new();
        state.apply_event(event(json!({
            "type": "email_sent",
            "data": {"farmer_id": "F1", "email": "amara@farmer.africa", "subject": "Funds"}
        })));
        state.apply_event(event(json!({"type": "no_farmers", "data": {"region": "Zambia East"}})));

        assert_eq!(state.emails().len(), 1);
        let titles: Vec<&str> = state
            .activity()
            .iter()
            .map(|entry| entry.title.as_str())
            .collect();
        assert_eq!(titles, vec!["No Farmers", "Email Notification"]);
        assert_eq!(
            state.activity().front().map(|entry| entry.severity),
            Some(Severity::Warning)
        );
    }

    #[test]
    fn activity_feed_is_bounded_and_sequenced() {
        let mut state = DashboardState::new();
        for _ in 0..60 {
            state.apply_event(event(json!({"type": "no_farmers", "data": {"region": "R1"}})));
        }
        assert_eq!(state.activity().len(), ACTIVITY_CAPACITY);
        assert_eq!(state.activity().front().map(|entry| entry.seq), Some(60));
        assert_eq!(state.next_activity_seq(), 61);
        let seqs: Vec<u64> = state.activity().iter().map(|entry| entry.seq).collect();
        assert!(seqs.windows(2).all(|pair| pair[0] > pair[1]));
    }

    #[test]
    fn connection_transitions_update_status() {
        let mut state = DashboardState::new();
        state.mark_error();
        assert_eq!(state.status().class, StatusClass::Error);
        state.mark_disconnected();
        assert_eq!(state.status().text, "Disconnected");
        state.mark_online();
        assert_eq!(state.status().class, StatusClass::Online);
        assert_eq!(state.status().text, "Live");
        assert_eq!(
            state.activity().front().map(|entry| entry.title.as_str()),
            Some("System Connected")
        );
    }
}
