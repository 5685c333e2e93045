//! ProcureX command line interface built on clap.
//!
//! Defines [`Cli`] with the [`Command`] subcommands (analyze, health) and the
//! global flags (--api-url, --poll-interval-ms, --verbose).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::ProcurexConfig;
use crate::submitter::CompanyProfile;

/// ProcureX: tender analysis and bid intelligence from the terminal.
#[derive(Debug, Parser)]
#[command(name = "procurex", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Analysis backend base URL. Overrides procurex.toml and PROCUREX_API_URL.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Delay between status polls, in milliseconds.
    #[arg(long, global = true)]
    pub poll_interval_ms: Option<u64>,

    /// Enable verbose (debug) logging on stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Apply the global flags on top of the loaded configuration.
    pub fn apply_to(&self, config: &mut ProcurexConfig) {
        if let Some(url) = &self.api_url {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload a tender PDF and follow the analysis until it finishes.
    Analyze {
        /// Path to the tender document (PDF, max 10MB by default).
        file: PathBuf,

        #[command(flatten)]
        profile: ProfileArgs,

        /// Print the raw result bundle as JSON instead of the summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Check that the analysis backend is reachable.
    Health,
}

/// Company profile overrides. Unset flags keep the configured values.
#[derive(Debug, Default, Args)]
pub struct ProfileArgs {
    #[arg(long)]
    pub company_name: Option<String>,

    /// Comma-separated areas of expertise.
    #[arg(long, value_delimiter = ',')]
    pub domain_expertise: Option<Vec<String>>,

    /// Annual turnover in crore INR.
    #[arg(long)]
    pub annual_turnover_cr: Option<f64>,

    #[arg(long)]
    pub years_in_operation: Option<u32>,

    /// Comma-separated certifications.
    #[arg(long, value_delimiter = ',')]
    pub certifications: Option<Vec<String>>,

    #[arg(long)]
    pub prior_govt_projects: Option<u32>,

    #[arg(long)]
    pub technical_team_size: Option<u32>,

    #[arg(long)]
    pub registered_as: Option<String>,

    #[arg(long)]
    pub msme_registered: Option<bool>,
}

impl ProfileArgs {
    pub fn apply_to(&self, profile: &mut CompanyProfile) {
        if let Some(v) = &self.company_name {
            profile.company_name = v.clone();
        }
        if let Some(v) = &self.domain_expertise {
            profile.domain_expertise = trimmed(v);
        }
        if let Some(v) = self.annual_turnover_cr {
            profile.annual_turnover_cr = v;
        }
        if let Some(v) = self.years_in_operation {
            profile.years_in_operation = v;
        }
        if let Some(v) = &self.certifications {
            profile.certifications = trimmed(v);
        }
        if let Some(v) = self.prior_govt_projects {
            profile.prior_govt_projects = v;
        }
        if let Some(v) = self.technical_team_size {
            profile.technical_team_size = v;
        }
        if let Some(v) = &self.registered_as {
            profile.registered_as = v.clone();
        }
        if let Some(v) = self.msme_registered {
            profile.msme_registered = v;
        }
    }
}

fn trimmed(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
