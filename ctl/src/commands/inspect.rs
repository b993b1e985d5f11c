use std::{io::Write, path::PathBuf};

use cassh_ca::{codec, describe_certificate};
use cassh_common::views::CertificateInfo;
use clap::{Parser, ValueEnum};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Parser)]
pub struct InspectParams {
    /// Certificate file to describe, e.g. `~/.ssh/id_ed25519-cert.pub`.
    pub certificate: PathBuf,

    #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn inspect(
    InspectParams {
        certificate,
        format,
    }: InspectParams,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let line = std::fs::read_to_string(&certificate)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", certificate.display(), e))?;
    let info = describe_certificate(&codec::parse_certificate(&line)?);

    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&info)?)?,
        OutputFormat::Text => write!(out, "{}", render_text(&info))?,
    }

    Ok(())
}

fn render_text(info: &CertificateInfo) -> String {
    let status = if info.is_expired {
        "expired".to_string()
    } else {
        format!("valid, {} left", format_remaining(info.time_left_secs))
    };

    format!(
        "Serial:       {}\n\
         Key ID:       {}\n\
         Principals:   {}\n\
         Valid after:  {}\n\
         Valid before: {}\n\
         Status:       {}\n",
        info.serial,
        info.key_id,
        info.principals.join(", "),
        info.valid_after.to_rfc3339(),
        info.valid_before.to_rfc3339(),
        status,
    )
}

fn format_remaining(secs: i64) -> String {
    let secs = secs.max(0);
    let (hours, minutes) = (secs / 3600, secs % 3600 / 60);

    match (hours, minutes) {
        (0, 0) => "less than a minute".to_string(),
        (0, m) => format!("{}m", m),
        (h, m) => format!("{}h {}m", h, m),
    }
}
