use std::ops::RangeInclusive;

const FALLBACK_STATUS: u16 = 200;

/// A parsed textual status expectation.
///
/// Accepts a single code (`201`), a comma list (`200, 201, 204`) or an
/// inclusive range (`200-299`). Anything else falls back to accepting `200`
/// only and sets `fallback`, so callers can report that the written intent
/// was not understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSpec {
    accepted: StatusSet,
    pub fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StatusSet {
    List(Vec<u16>),
    Range(RangeInclusive<u16>),
}

impl StatusSpec {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match parse_set(text) {
            Some(accepted) => Self {
                accepted,
                fallback: false,
            },
            None => {
                tracing::warn!(
                    "Unparseable status expectation '{}'; accepting {} only.",
                    text,
                    FALLBACK_STATUS
                );
                Self {
                    accepted: StatusSet::List(vec![FALLBACK_STATUS]),
                    fallback: true,
                }
            }
        }
    }

    #[must_use]
    pub fn accepts(&self, status: u16) -> bool {
        match &self.accepted {
            StatusSet::List(codes) => codes.contains(&status),
            StatusSet::Range(range) => range.contains(&status),
        }
    }

    #[must_use]
    pub fn describe(&self) -> String {
        match &self.accepted {
            StatusSet::List(codes) => codes
                .iter()
                .map(u16::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            StatusSet::Range(range) => format!("{}-{}", range.start(), range.end()),
        }
    }
}

fn parse_set(text: &str) -> Option<StatusSet> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if text.contains(',') {
        let codes = text
            .split(',')
            .map(|part| part.trim().parse::<u16>().ok())
            .collect::<Option<Vec<u16>>>()?;
        return Some(StatusSet::List(codes));
    }
    if let Some((min, max)) = text.split_once('-') {
        let min = min.trim().parse::<u16>().ok()?;
        let max = max.trim().parse::<u16>().ok()?;
        if min > max {
            return None;
        }
        return Some(StatusSet::Range(min..=max));
    }
    text.parse::<u16>().ok().map(|code| StatusSet::List(vec![code]))
}
