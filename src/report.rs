//! Typed result bundle produced when a job completes.
//!
//! The sections are written by LLM agents, so every field is optional and
//! decoding is forgiving: `null` becomes empty, numbers arrive as strings and
//! vice versa, and labels outside the known vocabulary are kept verbatim. A
//! section that still fails to decode is dropped rather than failing the job.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::backend::StatusResponse;

/// The four-section output of a successful analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    pub tender_extraction: Option<TenderExtraction>,
    pub eligibility_report: Option<EligibilityReport>,
    pub market_intelligence: Option<MarketIntelligence>,
    pub bid_strategy: Option<BidStrategy>,
}

impl ResultBundle {
    pub fn from_response(resp: &StatusResponse) -> Self {
        Self {
            tender_extraction: section("tender_extraction", &resp.tender_extraction),
            eligibility_report: section("eligibility_report", &resp.eligibility_report),
            market_intelligence: section("market_intelligence", &resp.market_intelligence),
            bid_strategy: section("bid_strategy", &resp.bid_strategy),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tender_extraction.is_none()
            && self.eligibility_report.is_none()
            && self.market_intelligence.is_none()
            && self.bid_strategy.is_none()
    }
}

fn section<T: for<'de> Deserialize<'de>>(name: &str, raw: &Option<Value>) -> Option<T> {
    match raw {
        None | Some(Value::Null) => None,
        Some(value) => match serde_json::from_value(value.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(section = name, error = %e, "dropping undecodable result section");
                None
            }
        },
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenderExtraction {
    #[serde(deserialize_with = "lenient::text")]
    pub tender_title: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub issuing_authority: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub tender_number: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub estimated_value_inr: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub submission_deadline: Option<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub scope_of_work: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub special_conditions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EligibilityReport {
    #[serde(deserialize_with = "lenient::score")]
    pub eligibility_score: Option<u8>,
    #[serde(deserialize_with = "lenient::optional")]
    pub overall_eligible: Option<bool>,
    #[serde(deserialize_with = "lenient::optional")]
    pub recommendation: Option<Recommendation>,
    #[serde(deserialize_with = "lenient::text")]
    pub reasoning: Option<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub criteria_analysis: Vec<Criterion>,
    #[serde(deserialize_with = "lenient::list")]
    pub strengths: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub disqualifiers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Criterion {
    #[serde(deserialize_with = "lenient::text")]
    pub criterion: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub required: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub company_has: Option<String>,
    pub meets_requirement: CriterionStatus,
    #[serde(deserialize_with = "lenient::text")]
    pub gap: Option<String>,
}

/// Whether the company satisfies one eligibility criterion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value", rename_all = "snake_case")]
pub enum CriterionStatus {
    Met,
    NotMet,
    #[default]
    Unclear,
}

impl From<Value> for CriterionStatus {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(true) => CriterionStatus::Met,
            Value::Bool(false) => CriterionStatus::NotMet,
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "met" => CriterionStatus::Met,
                "false" | "no" | "not met" | "not_met" => CriterionStatus::NotMet,
                _ => CriterionStatus::Unclear,
            },
            _ => CriterionStatus::Unclear,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketIntelligence {
    #[serde(deserialize_with = "lenient::score")]
    pub win_probability: Option<u8>,
    #[serde(deserialize_with = "lenient::optional")]
    pub risk_assessment: Option<RiskAssessment>,
    #[serde(deserialize_with = "lenient::optional")]
    pub market_analysis: Option<MarketAnalysis>,
    #[serde(deserialize_with = "lenient::optional")]
    pub pricing_intelligence: Option<PricingIntelligence>,
    #[serde(deserialize_with = "lenient::score")]
    pub opportunity_score: Option<u8>,
    #[serde(deserialize_with = "lenient::list")]
    pub key_insights: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskAssessment {
    #[serde(deserialize_with = "lenient::score")]
    pub overall_risk_score: Option<u8>,
    #[serde(deserialize_with = "lenient::list")]
    pub risks: Vec<Risk>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Risk {
    #[serde(deserialize_with = "lenient::text")]
    pub risk_type: Option<String>,
    #[serde(deserialize_with = "lenient::optional")]
    pub severity: Option<Level>,
    #[serde(deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub mitigation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketAnalysis {
    #[serde(deserialize_with = "lenient::optional")]
    pub competitive_intensity: Option<Level>,
    #[serde(deserialize_with = "lenient::list")]
    pub typical_competitors: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub market_size_estimate: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub historical_bid_patterns: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingIntelligence {
    #[serde(deserialize_with = "lenient::text")]
    pub estimated_market_rate_inr: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub recommended_bid_price_inr: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub pricing_strategy: Option<String>,
    #[serde(deserialize_with = "lenient::number")]
    pub margin_estimate_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BidStrategy {
    #[serde(deserialize_with = "lenient::text")]
    pub executive_summary: Option<String>,
    #[serde(deserialize_with = "lenient::optional")]
    pub bid_decision: Option<BidDecision>,
    #[serde(deserialize_with = "lenient::text")]
    pub bid_decision_rationale: Option<String>,
    #[serde(deserialize_with = "lenient::optional")]
    pub win_strategy: Option<WinStrategy>,
    #[serde(deserialize_with = "lenient::list")]
    pub action_plan: Vec<ActionItem>,
    #[serde(deserialize_with = "lenient::list")]
    pub red_flags: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub compliance_checklist: Vec<ChecklistItem>,
    #[serde(deserialize_with = "lenient::score")]
    pub overall_score: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WinStrategy {
    #[serde(deserialize_with = "lenient::text")]
    pub primary_strategy: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub value_proposition: Option<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub key_themes_for_proposal: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub differentiators: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionItem {
    #[serde(deserialize_with = "lenient::text")]
    pub action: Option<String>,
    #[serde(deserialize_with = "lenient::optional")]
    pub priority: Option<Level>,
    #[serde(deserialize_with = "lenient::text")]
    pub deadline: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecklistItem {
    #[serde(deserialize_with = "lenient::text")]
    pub item: Option<String>,
    #[serde(deserialize_with = "lenient::optional")]
    pub status: Option<ChecklistStatus>,
    #[serde(deserialize_with = "lenient::text")]
    pub action_required: Option<String>,
}

/// Declares a label enum decoded case-insensitively from a string, with an
/// `Other` variant that keeps anything outside the vocabulary.
macro_rules! label_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $label,)+
                    $name::Other(raw) => raw,
                }
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                let normalized = raw.trim().to_uppercase().replace('_', " ");
                match normalized.as_str() {
                    $($label => $name::$variant,)+
                    _ => $name::Other(raw),
                }
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

label_enum!(
    /// Eligibility agent's go/no-go recommendation.
    Recommendation {
        Proceed => "PROCEED",
        ProceedWithCaution => "PROCEED WITH CAUTION",
        DoNotBid => "DO NOT BID",
    }
);

label_enum!(
    /// Final decision of the strategy agent.
    BidDecision {
        Bid => "BID",
        NoBid => "NO BID",
        ConditionalBid => "CONDITIONAL BID",
    }
);

label_enum!(
    /// Severity, priority and competitive-intensity scale.
    Level {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
    }
);

label_enum!(
    ChecklistStatus {
        Ready => "READY",
        NeedsPrep => "NEEDS PREP",
        Missing => "MISSING",
    }
);

mod lenient {
    use super::*;

    /// `null`, numbers and booleans all become text; blank strings become `None`.
    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    /// `null` and blank strings become an empty list, any other lone value a
    /// one-item list. Elements that fail to decode are skipped.
    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let items = match Value::deserialize(d)? {
            Value::Null => Vec::new(),
            Value::String(s) if s.trim().is_empty() => Vec::new(),
            Value::Array(items) => items,
            other => vec![other],
        };
        Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect())
    }

    /// A nested object or label that decodes to `None` instead of failing
    /// the enclosing section.
    pub fn optional<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(d)? {
            Value::Null => None,
            value => serde_json::from_value(value).ok(),
        })
    }

    /// Accepts numbers or numeric strings ("72", "72%").
    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
            _ => None,
        })
    }

    /// A 0-100 score, clamped and rounded.
    pub fn score<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u8>, D::Error> {
        Ok(number(d)?
            .filter(|n| n.is_finite())
            .map(|n| n.round().clamp(0.0, 100.0) as u8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(body: Value) -> StatusResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn decodes_full_bundle() {
        let resp = response(json!({
            "job_id": "a1b2c3d4",
            "tender_extraction": {
                "tender_title": "Supply of ICT Equipment",
                "issuing_authority": "NIC",
                "tender_number": "GEM/2024/B/123",
                "estimated_value_inr": 25000000,
                "submission_deadline": "2024-08-01"
            },
            "eligibility_report": {
                "eligibility_score": 78,
                "recommendation": "PROCEED WITH CAUTION",
                "reasoning": "Turnover meets threshold",
                "criteria_analysis": [
                    {"criterion": "Turnover", "meets_requirement": true},
                    {"criterion": "CMMI", "meets_requirement": false, "gap": "No CMMI L3"},
                    {"criterion": "OEM auth", "meets_requirement": null}
                ]
            },
            "market_intelligence": {
                "win_probability": "45",
                "risk_assessment": {
                    "overall_risk_score": 60,
                    "risks": [{"risk_type": "Financial", "severity": "HIGH",
                               "description": "EMD", "mitigation": "Bank guarantee"}]
                },
                "pricing_intelligence": {"margin_estimate_percent": "12%"},
                "market_analysis": {"competitive_intensity": "MEDIUM"}
            },
            "bid_strategy": {
                "bid_decision": "CONDITIONAL BID",
                "bid_decision_rationale": "Needs partner",
                "win_strategy": {"primary_strategy": "Partner with OEM",
                                 "key_themes_for_proposal": ["local presence"]},
                "action_plan": [{"action": "Sign MoU", "priority": "high",
                                 "deadline": "2024-07-15", "owner": "BD"}],
                "red_flags": ["Tight deadline"],
                "compliance_checklist": [{"item": "EMD", "status": "NEEDS PREP",
                                          "action_required": "Arrange BG"}]
            }
        }));

        let bundle = ResultBundle::from_response(&resp);
        let extraction = bundle.tender_extraction.unwrap();
        assert_eq!(extraction.estimated_value_inr.as_deref(), Some("25000000"));

        let eligibility = bundle.eligibility_report.unwrap();
        assert_eq!(eligibility.eligibility_score, Some(78));
        assert_eq!(
            eligibility.recommendation,
            Some(Recommendation::ProceedWithCaution)
        );
        let statuses: Vec<_> = eligibility
            .criteria_analysis
            .iter()
            .map(|c| c.meets_requirement)
            .collect();
        assert_eq!(
            statuses,
            vec![
                CriterionStatus::Met,
                CriterionStatus::NotMet,
                CriterionStatus::Unclear
            ]
        );

        let market = bundle.market_intelligence.unwrap();
        assert_eq!(market.win_probability, Some(45));
        let risks = market.risk_assessment.unwrap();
        assert_eq!(risks.risks[0].severity, Some(Level::High));
        assert_eq!(
            market.pricing_intelligence.unwrap().margin_estimate_percent,
            Some(12.0)
        );

        let strategy = bundle.bid_strategy.unwrap();
        assert_eq!(strategy.bid_decision, Some(BidDecision::ConditionalBid));
        assert_eq!(strategy.action_plan[0].priority, Some(Level::High));
        assert_eq!(
            strategy.compliance_checklist[0].status,
            Some(ChecklistStatus::NeedsPrep)
        );
        assert_eq!(strategy.red_flags, vec!["Tight deadline".to_string()]);
    }

    #[test]
    fn missing_sections_stay_absent() {
        let resp = response(json!({"bid_strategy": {"bid_decision": "BID"}}));
        let bundle = ResultBundle::from_response(&resp);
        assert!(bundle.tender_extraction.is_none());
        assert!(bundle.eligibility_report.is_none());
        assert!(bundle.market_intelligence.is_none());
        assert_eq!(
            bundle.bid_strategy.unwrap().bid_decision,
            Some(BidDecision::Bid)
        );
    }

    #[test]
    fn undecodable_section_is_dropped() {
        let resp = response(json!({
            "eligibility_report": "JSON parse failed",
            "bid_strategy": {"bid_decision": "NO BID"}
        }));
        let bundle = ResultBundle::from_response(&resp);
        assert!(bundle.eligibility_report.is_none());
        assert!(bundle.bid_strategy.is_some());
        assert!(!bundle.is_empty());
    }

    #[test]
    fn one_bad_field_keeps_the_strategy() {
        let resp = response(json!({
            "bid_strategy": {
                "bid_decision": "BID",
                "bid_decision_rationale": "Strong fit",
                "red_flags": "None identified",
                "win_strategy": "Undercut L1 bidder",
                "action_plan": [{"action": "Submit EMD", "priority": 1}, "Call OEM"],
                "compliance_checklist": ""
            }
        }));
        let strategy = ResultBundle::from_response(&resp).bid_strategy.unwrap();
        assert_eq!(strategy.bid_decision, Some(BidDecision::Bid));
        assert_eq!(strategy.bid_decision_rationale.as_deref(), Some("Strong fit"));
        assert_eq!(strategy.red_flags, vec!["None identified".to_string()]);
        assert!(strategy.win_strategy.is_none());
        assert_eq!(strategy.action_plan.len(), 1);
        assert_eq!(strategy.action_plan[0].action.as_deref(), Some("Submit EMD"));
        assert!(strategy.action_plan[0].priority.is_none());
        assert!(strategy.compliance_checklist.is_empty());
    }

    #[test]
    fn malformed_nested_objects_do_not_drop_market_section() {
        let market: MarketIntelligence = serde_json::from_value(json!({
            "win_probability": 55,
            "risk_assessment": "High",
            "market_analysis": 3,
            "pricing_intelligence": "unknown"
        }))
        .unwrap();
        assert_eq!(market.win_probability, Some(55));
        assert!(market.risk_assessment.is_none());
        assert!(market.market_analysis.is_none());
        assert!(market.pricing_intelligence.is_none());
    }

    #[test]
    fn unknown_labels_are_preserved() {
        let decision = BidDecision::from("MAYBE LATER".to_string());
        assert_eq!(decision, BidDecision::Other("MAYBE LATER".into()));
        assert_eq!(decision.to_string(), "MAYBE LATER");
        assert_eq!(
            Recommendation::from("do_not_bid".to_string()),
            Recommendation::DoNotBid
        );
    }

    #[test]
    fn nulls_and_out_of_range_scores_are_tolerated() {
        let report: MarketIntelligence = serde_json::from_value(json!({
            "win_probability": 140,
            "key_insights": null,
            "risk_assessment": {"overall_risk_score": -3, "risks": null}
        }))
        .unwrap();
        assert_eq!(report.win_probability, Some(100));
        assert!(report.key_insights.is_empty());
        let risk = report.risk_assessment.unwrap();
        assert_eq!(risk.overall_risk_score, Some(0));
        assert!(risk.risks.is_empty());
    }

    #[test]
    fn bundle_serializes_labels_as_strings() {
        let bundle = ResultBundle {
            bid_strategy: Some(BidStrategy {
                bid_decision: Some(BidDecision::NoBid),
                ..Default::default()
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json["bid_strategy"]["bid_decision"], "NO BID");
    }
}
