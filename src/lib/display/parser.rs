use regex::Regex;

use super::DisplayStatus;

lazy_static! {
    static ref SCALE_REGEX: Regex = Regex::new(r"scale: ([\d.]+)").unwrap();
    static ref ROTATION_REGEX: Regex = Regex::new(r"rotation: (\w+)").unwrap();
}

/// Extract connection state and mode information from the topology tool's
/// human-readable report.
///
/// The report has no formal grammar, so this relies on positional heuristics:
/// a `logical monitor` header is followed within two lines by `scale:` and
/// `rotation:` tokens, and the connector's mode list is an indented block
/// where the active mode line is marked with `*+`. Unrecognized text leaves
/// fields at `"unknown"` — parsing is total and never fails.
pub fn parse(raw: &str, output: &str) -> DisplayStatus {
    let mut status = DisplayStatus::default();
    let lines: Vec<&str> = raw.lines().collect();

    for (index, line) in lines.iter().enumerate() {
        if line.contains("logical monitor") {
            for detail in lines.iter().skip(index).take(3) {
                if status.scale == "unknown" {
                    if let Some(captures) = SCALE_REGEX.captures(detail) {
                        status.scale = captures[1].to_string();
                    }
                }
                if status.rotation == "unknown" {
                    if let Some(captures) = ROTATION_REGEX.captures(detail) {
                        status.rotation = captures[1].to_string();
                    }
                }
            }
        }

        if line.contains(output) {
            status.connected = true;
            parse_active_mode(&mut status, &lines[index + 1..]);
        }
    }

    status
}

/// Scan the indented mode list following a connector line. The first line
/// carrying the `*+` active-mode marker is split on whitespace: token 0 is
/// the resolution, and the starred token (stripped) is the refresh rate.
/// The list ends at the first blank or non-indented line.
fn parse_active_mode(status: &mut DisplayStatus, mode_lines: &[&str]) {
    for mode_line in mode_lines {
        if mode_line.contains("*+") {
            let parts: Vec<&str> = mode_line.split_whitespace().collect();
            if parts.len() >= 2 {
                status.resolution = parts[0].to_string();
                for part in &parts[1..] {
                    if part.contains("*+") {
                        status.refresh_rate = part.trim_end_matches(['*', '+']).to_string();
                        break;
                    }
                }
            }
            return;
        }
        if mode_line.trim().is_empty() || !mode_line.starts_with(char::is_whitespace) {
            return;
        }
    }
}
