//! Terminal rendering of the job lifecycle: spinner and colored summary.
//!
//! Uses `indicatif` for the progress spinner and `console` for colors.
//! [`JobProgress`] follows a job's [`JobView`] updates until it ends.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{FailureKind, JobError};
use crate::report::{BidDecision, ChecklistStatus, CriterionStatus, Level, ResultBundle};
use crate::state_machine::{JobId, JobView, LifecycleState};

/// Spinner that follows a running job in the terminal.
///
/// Success is printed in green, pipeline failures in red, and a lost
/// connection in yellow, since that one usually just needs a retry.
pub struct JobProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl JobProgress {
    /// Starts the spinner for a freshly submitted job.
    pub fn start(job_id: &JobId) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Queued (job {job_id})"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow().bold(),
            dim: Style::new().dim(),
        }
    }

    /// Reflects the latest view in the spinner message.
    pub fn update(&self, view: &JobView) {
        let message = match view.progress() {
            Some((done, total)) => format!("[{done}/{total}] {}", view.label()),
            None => view.label().to_string(),
        };
        self.pb.set_message(message);
    }

    /// Stops the spinner and prints how the job ended.
    pub fn finish(&self, view: &JobView) {
        self.pb.finish_and_clear();
        match &view.lifecycle {
            Some(LifecycleState::Complete(_)) => {
                println!("  {} Analysis complete", self.green.apply_to("✓"));
            }
            Some(LifecycleState::Failed(detail)) => {
                println!(
                    "  {} Analysis failed: {}",
                    self.red.apply_to("✗"),
                    detail.message
                );
            }
            Some(LifecycleState::ConnectionLost(detail)) => {
                println!("  {} {}", self.yellow.apply_to("⚠"), detail.message);
            }
            Some(LifecycleState::Active(_)) | None => {
                println!("  {} Tracking cancelled", self.dim.apply_to("•"));
            }
        }
    }

    /// Prints what to do next after a failed job.
    pub fn print_hint(&self, kind: FailureKind) {
        if let Some(hint) = failure_hint(kind) {
            println!("    {}", self.dim.apply_to(hint));
        }
    }

    /// Prints the headline figures of a finished analysis.
    pub fn print_report(&self, bundle: &ResultBundle) {
        println!();
        if bundle.is_empty() {
            println!("{}", self.dim.apply_to("The backend returned no result sections."));
            return;
        }

        if let Some(decision) = bundle
            .bid_strategy
            .as_ref()
            .and_then(|s| s.bid_decision.as_ref())
        {
            let style = match decision {
                BidDecision::Bid => &self.green,
                BidDecision::NoBid => &self.red,
                _ => &self.yellow,
            };
            println!("{}", style.apply_to(format!("─── {decision} ───")));
        }
        for line in summary_lines(bundle) {
            println!("{line}");
        }
    }
}

/// Reports a submission that never produced a job. No spinner is running yet.
pub fn print_submission_failure(err: &JobError) {
    let red = Style::new().red().bold();
    println!("  {} {err}", red.apply_to("✗"));
    if let Some(hint) = failure_hint(err.kind()) {
        println!("    {}", Style::new().dim().apply_to(hint));
    }
}

/// Remediation text for a failure, when there is something the user can do.
pub fn failure_hint(kind: FailureKind) -> Option<&'static str> {
    match kind {
        FailureKind::Submission => {
            Some("Check the file and the backend address (procurex health), then resubmit.")
        }
        FailureKind::NotATender => {
            Some("Upload the tender document itself, as a text-based PDF.")
        }
        FailureKind::Connection => {
            Some("Check that the backend is running (procurex health) and resubmit.")
        }
        FailureKind::Stale => Some("The backend may still finish; raise max_tracking_secs to wait longer."),
        FailureKind::Pipeline => None,
    }
}

/// Plain-text summary lines for a result bundle, skipping absent sections.
pub fn summary_lines(bundle: &ResultBundle) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(tender) = &bundle.tender_extraction {
        if let Some(title) = &tender.tender_title {
            lines.push(format!("Tender:        {title}"));
        }
        if let Some(authority) = &tender.issuing_authority {
            lines.push(format!("Authority:     {authority}"));
        }
        if let Some(number) = &tender.tender_number {
            lines.push(format!("Tender no.:    {number}"));
        }
        if let Some(value) = &tender.estimated_value_inr {
            lines.push(format!("Est. value:    ₹{value}"));
        }
        if let Some(deadline) = &tender.submission_deadline {
            lines.push(format!("Deadline:      {deadline}"));
        }
    }

    if let Some(eligibility) = &bundle.eligibility_report {
        let score = eligibility
            .eligibility_score
            .map_or("n/a".to_string(), |s| format!("{s}/100"));
        let recommendation = eligibility
            .recommendation
            .as_ref()
            .map_or("n/a".to_string(), ToString::to_string);
        lines.push(format!("Eligibility:   {score} ({recommendation})"));
        for criterion in &eligibility.criteria_analysis {
            let name = criterion.criterion.as_deref().unwrap_or("(unnamed)");
            let mark = match criterion.meets_requirement {
                CriterionStatus::Met => "✓",
                CriterionStatus::NotMet => "✗",
                CriterionStatus::Unclear => "?",
            };
            match &criterion.gap {
                Some(gap) => lines.push(format!("  {mark} {name}: {gap}")),
                None => lines.push(format!("  {mark} {name}")),
            }
        }
    }

    if let Some(market) = &bundle.market_intelligence {
        if let Some(win) = market.win_probability {
            lines.push(format!("Win chance:    {win}%"));
        }
        if let Some(risk) = &market.risk_assessment {
            if let Some(score) = risk.overall_risk_score {
                lines.push(format!("Risk score:    {score}/100"));
            }
            for r in &risk.risks {
                let severity = r.severity.as_ref().map_or("?", Level::as_str);
                let kind = r.risk_type.as_deref().unwrap_or("Risk");
                lines.push(format!("  [{severity}] {kind}"));
            }
        }
    }

    if let Some(strategy) = &bundle.bid_strategy {
        if let Some(rationale) = &strategy.bid_decision_rationale {
            lines.push(format!("Rationale:     {rationale}"));
        }
        if let Some(primary) = strategy
            .win_strategy
            .as_ref()
            .and_then(|w| w.primary_strategy.as_ref())
        {
            lines.push(format!("Strategy:      {primary}"));
        }
        for flag in &strategy.red_flags {
            lines.push(format!("  ⚑ {flag}"));
        }
        for item in &strategy.action_plan {
            let priority = item.priority.as_ref().map_or("-", Level::as_str);
            let action = item.action.as_deref().unwrap_or("");
            let deadline = item.deadline.as_deref().unwrap_or("no deadline");
            lines.push(format!("  → [{priority}] {action} ({deadline})"));
        }
        let missing = strategy
            .compliance_checklist
            .iter()
            .filter(|c| c.status != Some(ChecklistStatus::Ready))
            .count();
        if !strategy.compliance_checklist.is_empty() {
            lines.push(format!(
                "Compliance:    {} of {} items need work",
                missing,
                strategy.compliance_checklist.len()
            ));
        }
    }

    lines
}
