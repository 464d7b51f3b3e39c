//! Numeric claim extraction from free text
//!
//! A claim is a number (with optional currency, scale suffix or percent
//! sign) that sits within `proximity_chars` of a known metric keyword.
//! "ACME generated $150M in FY2024" yields one claim:
//! `revenue_total = 150_000_000 USD` for period `FY2024`.

use regex::Regex;
use serde::Serialize;

const NUMBER_PATTERN: &str = r"(?i)(?:^|[^\w\-./])(?P<claim>(?P<currency>\$|€|£|usd\s*|eur\s*|gbp\s*)?(?P<number>\d+(?:,\d{3})*(?:\.\d+)?)(?:\s*(?P<scale>trillion|billion|million|thousand|tn|bn|mm|b|m|k)\b)?(?P<percent>\s*%|\s+percent\b)?)";

const PERIOD_PATTERN: &str =
    r"(?i)\b(?:fy\s?(?P<fy>\d{4})|(?P<quarter>q[1-4])\s?(?P<qyear>\d{4})|(?P<year>(?:19|20)\d{2}))\b";

/// Keyword patterns, the metric each one names and whether the phrase
/// reports the metric as a loss
///
/// Longer phrases come first so "operating loss" is not read as a bare
/// "loss".
const METRIC_KEYWORDS: &[(&str, &str, bool)] = &[
    (r"operating\s+income", "operating_income", false),
    (r"operating\s+loss(?:es)?", "operating_income", true),
    (r"net\s+(?:income|profit)|profits?|earnings", "net_income", false),
    (r"net\s+loss(?:es)?|loss(?:es)?", "net_income", true),
    (r"gross\s+margin", "gross_margin", false),
    (r"ebitda", "ebitda", false),
    (r"market\s+cap(?:italization)?|valuation|valued\s+at", "market_cap", false),
    (r"raised|funding", "funding_total", false),
    (r"revenues?|sales|turnover|top[\s-]line|generated|brought\s+in", "revenue_total", false),
    (r"employees|headcount|staff|workforce", "headcount", false),
];

/// Metric named by a keyword match
#[derive(Debug, Clone, Copy)]
struct Keyword {
    metric: &'static str,
    loss: bool,
}

/// A numeric assertion found in text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedClaim {
    /// The matched text, e.g. `$150M`
    pub text: String,
    /// Metric the claim is about
    pub metric: String,
    /// Claimed value after applying the scale suffix; negative when the
    /// text reports a loss
    pub value: f64,
    /// Currency or `%`, when the text states one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Reporting period named nearest to the number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    /// Byte offset of the claim in the text
    pub offset: usize,
}

#[derive(Debug)]
struct Span {
    start: usize,
    end: usize,
}

impl Span {
    fn distance(&self, other: &Span) -> usize {
        if self.end <= other.start {
            other.start - self.end
        } else if other.end <= self.start {
            self.start - other.end
        } else {
            0
        }
    }

    fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Pattern-based claim extractor
///
/// # Examples
///
/// ```
/// use groundtruth_mcp::ClaimExtractor;
///
/// let extractor = ClaimExtractor::new(80).unwrap();
/// let claims = extractor.extract("ACME generated $150M in FY2024");
///
/// assert_eq!(claims.len(), 1);
/// assert_eq!(claims[0].metric, "revenue_total");
/// assert_eq!(claims[0].value, 150_000_000.0);
/// assert_eq!(claims[0].period.as_deref(), Some("FY2024"));
/// ```
#[derive(Debug, Clone)]
pub struct ClaimExtractor {
    number: Regex,
    period: Regex,
    keywords: Vec<(Regex, Keyword)>,
    proximity_chars: usize,
}

impl ClaimExtractor {
    /// Create an extractor linking numbers to keywords at most
    /// `proximity_chars` apart
    pub fn new(proximity_chars: usize) -> Result<Self, regex::Error> {
        let keywords = METRIC_KEYWORDS
            .iter()
            .map(|&(pattern, metric, loss)| {
                Regex::new(&format!(r"(?i)\b(?:{pattern})\b")).map(|re| (re, Keyword { metric, loss }))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            number: Regex::new(NUMBER_PATTERN)?,
            period: Regex::new(PERIOD_PATTERN)?,
            keywords,
            proximity_chars,
        })
    }

    /// Maximum distance between a number and its metric keyword
    pub fn proximity_chars(&self) -> usize {
        self.proximity_chars
    }

    /// Extract every claim in `text`, in order of appearance
    pub fn extract(&self, text: &str) -> Vec<ExtractedClaim> {
        let periods: Vec<(Span, String)> = self
            .period
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let label = if let Some(year) = caps.name("fy") {
                    format!("FY{}", year.as_str())
                } else if let (Some(q), Some(year)) = (caps.name("quarter"), caps.name("qyear")) {
                    format!("{}-{}", year.as_str(), q.as_str().to_uppercase())
                } else {
                    format!("FY{}", caps.name("year")?.as_str())
                };
                Some((Span { start: whole.start(), end: whole.end() }, label))
            })
            .collect();

        let keywords: Vec<(Span, Keyword)> = self
            .keywords
            .iter()
            .flat_map(|(re, keyword)| {
                re.find_iter(text)
                    .map(move |m| (Span { start: m.start(), end: m.end() }, *keyword))
            })
            .collect();

        let mut claims = Vec::new();
        for caps in self.number.captures_iter(text) {
            let (Some(claim), Some(number)) = (caps.name("claim"), caps.name("number")) else {
                continue;
            };
            let span = Span { start: claim.start(), end: claim.end() };

            // Years inside period labels are not claims
            if periods.iter().any(|(p, _)| p.overlaps(&span)) {
                continue;
            }

            let Some(keyword) = nearest(&keywords, &span, self.proximity_chars) else {
                continue;
            };
            let Ok(base) = number.as_str().replace(',', "").parse::<f64>() else {
                continue;
            };

            let scale = caps.name("scale").map(|s| scale_factor(s.as_str())).unwrap_or(1.0);
            let sign = if keyword.loss { -1.0 } else { 1.0 };
            let unit = if caps.name("percent").is_some() {
                Some("%".to_string())
            } else {
                caps.name("currency").map(|c| currency_code(c.as_str()))
            };
            let period = periods
                .iter()
                .min_by_key(|(p, _)| p.distance(&span))
                .map(|(_, label)| label.clone());

            claims.push(ExtractedClaim {
                text: claim.as_str().trim().to_string(),
                metric: keyword.metric.to_string(),
                value: sign * base * scale,
                unit,
                period,
                offset: span.start,
            });
        }

        tracing::debug!(claims = claims.len(), "Extracted claims");
        claims
    }
}

/// Closest keyword within range; ties go to the keyword before the number
fn nearest(keywords: &[(Span, Keyword)], span: &Span, max: usize) -> Option<Keyword> {
    keywords
        .iter()
        .filter(|(k, _)| !k.overlaps(span))
        .map(|(k, keyword)| (k.distance(span), k.start > span.start, *keyword))
        .filter(|(distance, _, _)| *distance <= max)
        .min_by_key(|(distance, after, _)| (*distance, *after))
        .map(|(_, _, keyword)| keyword)
}

fn scale_factor(suffix: &str) -> f64 {
    match suffix.to_ascii_lowercase().as_str() {
        "trillion" | "tn" => 1e12,
        "billion" | "bn" | "b" => 1e9,
        "million" | "mm" | "m" => 1e6,
        "thousand" | "k" => 1e3,
        _ => 1.0,
    }
}

fn currency_code(symbol: &str) -> String {
    match symbol.trim().to_ascii_lowercase().as_str() {
        "€" | "eur" => "EUR".to_string(),
        "£" | "gbp" => "GBP".to_string(),
        _ => "USD".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<ExtractedClaim> {
        ClaimExtractor::new(80).unwrap().extract(text)
    }

    #[test]
    fn test_revenue_claim_with_scale() {
        let claims = extract("ACME generated $150M in FY2024");
        assert_eq!(claims.len(), 1);

        let claim = &claims[0];
        assert_eq!(claim.text, "$150M");
        assert_eq!(claim.metric, "revenue_total");
        assert_eq!(claim.value, 150_000_000.0);
        assert_eq!(claim.unit.as_deref(), Some("USD"));
        assert_eq!(claim.period.as_deref(), Some("FY2024"));
    }

    #[test]
    fn test_identifier_digits_are_not_claims() {
        let claims = extract("ACME-CIK-001 reported revenue of $100 million for FY2024");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].value, 100_000_000.0);
    }

    #[test]
    fn test_scale_words_and_commas() {
        let claims = extract("Sales reached 1.2 billion dollars. Net income was $12,500,000.");
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].metric, "revenue_total");
        assert_eq!(claims[0].value, 1.2e9);
        assert_eq!(claims[0].unit, None);
        assert_eq!(claims[1].metric, "net_income");
        assert_eq!(claims[1].value, 12_500_000.0);
    }

    #[test]
    fn test_percent_and_headcount() {
        let claims = extract("Gross margin hit 42% while the company has 500 employees.");
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].metric, "gross_margin");
        assert_eq!(claims[0].unit.as_deref(), Some("%"));
        assert_eq!(claims[0].value, 42.0);
        assert_eq!(claims[1].metric, "headcount");
        assert_eq!(claims[1].value, 500.0);
    }

    #[test]
    fn test_quarter_and_bare_year_periods() {
        let claims = extract("Revenue of $30M in Q3 2024");
        assert_eq!(claims[0].period.as_deref(), Some("2024-Q3"));

        let claims = extract("In 2023 the firm raised €5m");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].metric, "funding_total");
        assert_eq!(claims[0].unit.as_deref(), Some("EUR"));
        assert_eq!(claims[0].period.as_deref(), Some("FY2023"));
    }

    #[test]
    fn test_proximity_limit() {
        let filler = "x".repeat(100);
        let text = format!("Revenue {filler} $150M");
        assert!(ClaimExtractor::new(80).unwrap().extract(&text).is_empty());
        assert_eq!(ClaimExtractor::new(200).unwrap().extract(&text).len(), 1);
    }

    #[test]
    fn test_no_claims() {
        assert!(extract("The weather was pleasant.").is_empty());
        assert!(extract("Revenue grew strongly").is_empty());
        assert!(extract("").is_empty());
    }

    #[test]
    fn test_loss_is_negative_income() {
        let claims = extract("LOSSCO posted a net loss of $5M in FY2024");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].metric, "net_income");
        assert_eq!(claims[0].value, -5_000_000.0);

        let claims = extract("an operating loss of $2M");
        assert_eq!(claims[0].metric, "operating_income");
        assert_eq!(claims[0].value, -2_000_000.0);

        let claims = extract("Net income was $3M");
        assert_eq!(claims[0].value, 3_000_000.0);
    }

    #[test]
    fn test_nearest_keyword_wins() {
        let claims = extract("Revenue was flat; headcount 250");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].metric, "headcount");
    }
}
