//! Human-readable formatting shared by the text report and the dashboard.

use retention_data::loader::LoadSummary;
use retention_engine::{
    compare::ComparisonResult,
    report::{Finding, Recommendation},
};

/// `0.4482` → `44.82%`
pub fn percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

/// Signed percentage points: `-0.0059` → `-0.59 pp`
pub fn points(diff: f64) -> String {
    format!("{:+.2} pp", diff * 100.0)
}

/// `200 loaded, 3 dropped, 0 duplicate user ids`
pub fn load_summary(load: &LoadSummary) -> String {
    format!(
        "{} loaded, {} dropped, {} duplicate user ids",
        load.rows, load.dropped, load.duplicate_user_ids
    )
}

pub fn lift(result: &ComparisonResult) -> String {
    result
        .lift_percent()
        .map_or_else(|| "undefined".to_owned(), |lift| format!("{lift:+.2}%"))
}

pub fn p_value(p: f64) -> String {
    if p < 1e-4 {
        "< 0.0001".to_owned()
    } else {
        format!("{p:.4}")
    }
}

pub fn confidence_interval(result: &ComparisonResult) -> String {
    let ci = &result.confidence_interval;
    format!(
        "{:.0}% CI [{}, {}]",
        ci.level * 100.0,
        points(ci.lower),
        points(ci.upper)
    )
}

pub fn finding(result: &ComparisonResult, finding: Finding) -> String {
    let metric = result.metric;
    let second = &result.second.group;
    let first = &result.first.group;
    match finding {
        Finding::SignificantIncrease => format!(
            "{second} shows a significant {metric} increase over {first} (p = {})",
            p_value(result.p_value)
        ),
        Finding::SignificantDecrease => format!(
            "{second} shows a significant {metric} decrease against {first} (p = {})",
            p_value(result.p_value)
        ),
        Finding::NoSignificantDifference => format!(
            "No significant {metric} difference between {first} and {second} (p = {}, alpha = {})",
            p_value(result.p_value),
            result.alpha
        ),
    }
}

pub fn recommendation(recommendation: &Recommendation) -> String {
    match recommendation {
        Recommendation::RollOut {
            group,
            additional_retained,
        } => format!(
            "Roll out {group}: about {additional_retained:.0} more users retained on day 7 per cohort of this size"
        ),
        Recommendation::KeepBaseline { group } => {
            format!("Keep {group}: the alternative retains significantly worse on day 7")
        }
        Recommendation::Inconclusive => {
            "Inconclusive: no significant day-7 difference; keep collecting data".to_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers() {
        assert_eq!(percent(0.4482), "44.82%");
        assert_eq!(points(-0.0059), "-0.59 pp");
        assert_eq!(points(0.15), "+15.00 pp");
        assert_eq!(p_value(0.033_672), "0.0337");
        assert_eq!(p_value(1e-9), "< 0.0001");
    }

    #[test]
    fn test_recommendation_text() {
        let text = recommendation(&Recommendation::RollOut {
            group: "gate_40".to_owned(),
            additional_retained: 1234.4,
        });
        assert!(text.starts_with("Roll out gate_40"));
        assert!(text.contains("1234"));
        assert!(recommendation(&Recommendation::Inconclusive).starts_with("Inconclusive"));
    }
}
