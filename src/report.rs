use crate::constants::report::{CHECKPOINT_MARKER, MAX_REPORT_BYTES};
use crate::errors::ToolError;
use crate::utils::text::truncate_utf8_prefix;

/// Closed status-label vocabulary. Downstream consumers pattern-match these
/// exact strings; extending the set is a deliberate act.
pub mod labels {
    pub const OK: &str = "[OK]";
    pub const WARN: &str = "[WARN]";
    pub const CRIT: &str = "[CRIT]";
    pub const ERR: &str = "[ERR]";
    pub const INFO: &str = "[INFO]";
    pub const UP: &str = "[UP]";
    pub const DN: &str = "[DN]";
    pub const AP: &str = "[AP]";
    pub const SW: &str = "[SW]";
    pub const GW: &str = "[GW]";
    pub const DEV: &str = "[DEV]";
    pub const STATS: &str = "[STATS]";
    pub const TREND: &str = "[TREND]";
    pub const DATA: &str = "[DATA]";
    pub const NET: &str = "[NET]";
    pub const VPN: &str = "[VPN]";
    pub const SEC: &str = "[SEC]";
    pub const HEALTH: &str = "[HEALTH]";
    pub const ASYNC: &str = "[ASYNC]";
}

/// IEC units with one decimal above bytes.
pub fn bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB", "TiB", "PiB"];
    if n < 1024 {
        return format!("{} B", n);
    }
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// `Nd Nh Nm` with zero segments elided; zero seconds renders as `0m`.
pub fn uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if parts.is_empty() {
        return "0m".to_string();
    }
    parts.join(" ")
}

pub fn percent(value: f64) -> String {
    format!("{:.1}%", value)
}

#[derive(Debug, Clone)]
struct Section {
    lines: Vec<String>,
    hidden: usize,
}

#[derive(Debug, Clone)]
struct Fact {
    label: String,
    value: String,
}

/// Ordered text segments plus the verification-checkpoint facts.
///
/// Facts are echoed verbatim in a rigid footer so a paraphrasing consumer
/// can be audited against the numbers the tool actually returned.
#[derive(Debug, Clone)]
pub struct Report {
    sections: Vec<Section>,
    facts: Vec<Fact>,
}

impl Report {
    pub fn new() -> Self {
        Self {
            sections: vec![Section {
                lines: Vec::new(),
                hidden: 0,
            }],
            facts: Vec::new(),
        }
    }

    /// Append a line to the current section.
    pub fn line(&mut self, text: impl Into<String>) -> &mut Self {
        if let Some(section) = self.sections.last_mut() {
            section.lines.push(text.into());
        }
        self
    }

    /// Start a new section. A no-op when the current one is still empty.
    pub fn section(&mut self) -> &mut Self {
        if self
            .sections
            .last()
            .map(|s| !s.lines.is_empty())
            .unwrap_or(false)
        {
            self.sections.push(Section {
                lines: Vec::new(),
                hidden: 0,
            });
        }
        self
    }

    /// Record a checkpoint fact. The value must also appear verbatim in the
    /// report body; handlers are responsible for that echo.
    pub fn fact(&mut self, label: impl Into<String>, value: impl ToString) -> &mut Self {
        self.facts.push(Fact {
            label: label.into(),
            value: value.to_string(),
        });
        self
    }

    /// Record a total fact after validating it equals the sum of the named
    /// component facts. Catches handlers reporting inconsistent numbers
    /// before a model ever sees them.
    pub fn total_fact(
        &mut self,
        label: impl Into<String>,
        total: u64,
        components: &[&str],
    ) -> Result<&mut Self, ToolError> {
        let label = label.into();
        let mut sum: u64 = 0;
        for component in components {
            let value = self
                .facts
                .iter()
                .find(|fact| fact.label == *component)
                .and_then(|fact| fact.value.parse::<u64>().ok())
                .ok_or_else(|| {
                    ToolError::internal(format!(
                        "Checkpoint component '{}' is missing or non-numeric",
                        component
                    ))
                })?;
            sum += value;
        }
        if sum != total {
            return Err(ToolError::internal(format!(
                "Checkpoint total '{}' is {} but components sum to {}",
                label, total, sum
            )));
        }
        Ok(self.fact(label, total))
    }

    pub fn has_facts(&self) -> bool {
        !self.facts.is_empty()
    }

    /// Render the final text, enforcing the size bound by truncating the
    /// tail of the longest section until the report fits.
    pub fn render(mut self) -> String {
        let mut truncated = false;
        loop {
            let text = self.assemble(truncated);
            if text.len() <= MAX_REPORT_BYTES {
                return text;
            }
            if self.truncate_longest_section() {
                truncated = true;
                continue;
            }
            return truncate_utf8_prefix(&self.assemble(true), MAX_REPORT_BYTES);
        }
    }

    fn assemble(&self, truncated: bool) -> String {
        let mut blocks: Vec<String> = Vec::new();
        for section in &self.sections {
            if section.lines.is_empty() && section.hidden == 0 {
                continue;
            }
            let mut lines = section.lines.clone();
            if section.hidden > 0 {
                lines.push(format!("… +{} more", section.hidden));
            }
            blocks.push(lines.join("\n"));
        }
        if truncated {
            blocks.push(format!("{} Truncated", labels::INFO));
        }
        if !self.facts.is_empty() {
            let mut footer = vec![CHECKPOINT_MARKER.to_string()];
            for fact in &self.facts {
                footer.push(format!("{}: {}", fact.label, fact.value));
            }
            blocks.push(footer.join("\n"));
        }
        blocks.join("\n\n")
    }

    fn truncate_longest_section(&mut self) -> bool {
        let Some((index, len)) = self
            .sections
            .iter()
            .enumerate()
            .map(|(i, s)| (i, s.lines.len()))
            .max_by_key(|(_, len)| *len)
        else {
            return false;
        };
        if len <= 2 {
            return false;
        }
        let keep = (len / 2).max(1);
        let removed = len - keep;
        let section = &mut self.sections[index];
        section.lines.truncate(keep);
        section.hidden += removed;
        true
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_laws() {
        assert_eq!(uptime(0), "0m");
        assert_eq!(uptime(86_400 + 3_600 + 60), "1d 1h 1m");
        assert_eq!(uptime(3_600), "1h");
        assert_eq!(uptime(90_061), "1d 1h 1m");
    }

    #[test]
    fn bytes_is_monotone_on_unit_boundaries() {
        assert_eq!(bytes(0), "0 B");
        assert_eq!(bytes(1023), "1023 B");
        assert_eq!(bytes(1024), "1.0 KiB");
        assert_eq!(bytes(1_536), "1.5 KiB");
        assert_eq!(bytes(1024 * 1024), "1.0 MiB");
        assert_eq!(bytes(5 * 1024 * 1024 * 1024), "5.0 GiB");
    }

    #[test]
    fn percent_has_one_decimal() {
        assert_eq!(percent(5.0), "5.0%");
        assert_eq!(percent(99.95), "99.9%");
    }

    #[test]
    fn checkpoint_lists_facts_in_insertion_order() {
        let mut report = Report::new();
        report.line("[DEV] two devices seen: 2");
        report.fact("Total devices", 2);
        report.fact("Online", 1);
        let text = report.render();
        let marker = text.find(CHECKPOINT_MARKER).expect("marker present");
        let footer = &text[marker..];
        let total = footer.find("Total devices: 2").expect("total fact");
        let online = footer.find("Online: 1").expect("online fact");
        assert!(total < online);
    }

    #[test]
    fn total_fact_validates_component_sum() {
        let mut report = Report::new();
        report.fact("Up", 3).fact("Down", 2);
        assert!(report.total_fact("Total", 5, &["Up", "Down"]).is_ok());

        let mut bad = Report::new();
        bad.fact("Up", 3).fact("Down", 2);
        let err = bad.total_fact("Total", 6, &["Up", "Down"]).unwrap_err();
        assert!(err.message.contains("components sum"));
    }

    #[test]
    fn oversized_reports_are_truncated_under_the_bound() {
        let mut report = Report::new();
        report.line("[SW] interface status");
        report.section();
        for i in 0..600 {
            report.line(format!("  [UP] 1/1/{} connected to access segment {}", i, i));
        }
        report.fact("Total ports", 600);
        let text = report.render();
        assert!(text.len() <= MAX_REPORT_BYTES);
        assert!(text.contains("more"));
        assert!(text.contains("[INFO] Truncated"));
        assert!(text.contains(CHECKPOINT_MARKER));
        let truncated_pos = text.find("[INFO] Truncated").expect("truncation note");
        let marker_pos = text.find(CHECKPOINT_MARKER).expect("marker");
        assert!(truncated_pos < marker_pos);
    }

    #[test]
    fn small_reports_are_left_alone() {
        let mut report = Report::new();
        report.line("[OK] all good");
        let text = report.render();
        assert!(!text.contains("Truncated"));
        assert!(!text.contains(CHECKPOINT_MARKER));
    }
}
