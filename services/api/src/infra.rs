use chrono::NaiveDate;
use lendmarket::marketplace::{EmploymentStatus, HousingType};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_housing(raw: &str) -> Result<HousingType, String> {
    let wanted = normalise_label(raw);
    HousingType::ALL
        .into_iter()
        .find(|housing| housing.label() == wanted)
        .ok_or_else(|| {
            format!(
                "unknown housing '{raw}' (expected one of: {})",
                labels(HousingType::ALL.iter().map(|housing| housing.label()))
            )
        })
}

pub(crate) fn parse_employment(raw: &str) -> Result<EmploymentStatus, String> {
    let wanted = normalise_label(raw);
    EmploymentStatus::ALL
        .into_iter()
        .find(|status| status.label() == wanted)
        .ok_or_else(|| {
            format!(
                "unknown employment '{raw}' (expected one of: {})",
                labels(EmploymentStatus::ALL.iter().map(|status| status.label()))
            )
        })
}

fn normalise_label(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

fn labels<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_accept_cli_spellings() {
        assert_eq!(parse_housing("Owned"), Ok(HousingType::Owned));
        assert_eq!(
            parse_employment("self-employed"),
            Ok(EmploymentStatus::SelfEmployed)
        );
        let error = parse_housing("castle").expect_err("unknown housing");
        assert!(error.contains("mortgaged"));
    }

    #[test]
    fn dates_use_iso_format() {
        assert_eq!(
            parse_date(" 2025-06-01 "),
            Ok(NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date"))
        );
        assert!(parse_date("01/06/2025").is_err());
    }
}
