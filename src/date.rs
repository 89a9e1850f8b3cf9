/// 예약/가용일에 사용하는 달력 날짜 값
/// 시각(time-of-day)을 버리고 UTC 기준 하루 단위로만 비교한다.
// region:    --- Imports
use chrono::NaiveDate;
use serde::Deserialize;

// endregion: --- Imports

// region:    --- CalendarDateInput

/// 클라이언트 입력 스키마
/// "YYYY-MM-DD" 문자열 또는 {year, month, day} 오브젝트만 허용한다.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CalendarDateInput {
    Text(String),
    Parts { year: i32, month: u32, day: u32 },
}

impl CalendarDateInput {
    /// 내부 표현(NaiveDate)으로 정규화. 실패하면 None.
    pub fn normalize(&self) -> Option<NaiveDate> {
        match self {
            CalendarDateInput::Text(s) => date_from_str(s),
            CalendarDateInput::Parts { year, month, day } => date_from_ymd(*year, *month, *day),
        }
    }
}

// endregion: --- CalendarDateInput

// region:    --- 정규화

/// 불기(พ.ศ.) 연도를 서기로 변환하고 허용 범위를 검사한다.
fn normalize_year(year: i32) -> Option<i32> {
    let year = if year >= 2400 { year - 543 } else { year };
    (1900..=2100).contains(&year).then_some(year)
}

pub fn date_from_ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let year = normalize_year(year)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// 엄격한 "YYYY-MM-DD" 파싱 (다른 형식은 전부 거부)
pub fn date_from_str(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    let bytes = s.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| matches!(i, 4 | 7) || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }

    let year: i32 = s[0..4].parse().ok()?;
    let month: u32 = s[5..7].parse().ok()?;
    let day: u32 = s[8..10].parse().ok()?;
    date_from_ymd(year, month, day)
}

// endregion: --- 정규화

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_iso_date() {
        assert_eq!(
            date_from_str("2025-09-15"),
            NaiveDate::from_ymd_opt(2025, 9, 15)
        );
        assert_eq!(
            date_from_str("  2025-01-02  "),
            NaiveDate::from_ymd_opt(2025, 1, 2)
        );
    }

    #[test]
    fn test_converts_buddhist_era_year() {
        // พ.ศ. 2568 == 서기 2025
        assert_eq!(
            date_from_str("2568-09-15"),
            NaiveDate::from_ymd_opt(2025, 9, 15)
        );
        assert_eq!(
            date_from_ymd(2568, 9, 15),
            NaiveDate::from_ymd_opt(2025, 9, 15)
        );
    }

    #[test]
    fn test_rejects_out_of_range_years() {
        assert_eq!(date_from_str("1899-01-01"), None);
        assert_eq!(date_from_str("2101-01-01"), None);
        // 2400 - 543 = 1857 → 범위 밖
        assert_eq!(date_from_ymd(2400, 1, 1), None);
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert_eq!(date_from_str("2025/09/15"), None);
        assert_eq!(date_from_str("2025-9-15"), None);
        assert_eq!(date_from_str("2025-13-01"), None);
        assert_eq!(date_from_str("2025-02-30"), None);
        assert_eq!(date_from_str("not a date"), None);
        assert_eq!(date_from_str(""), None);
    }

    #[test]
    fn test_untagged_input_forms() {
        let text: CalendarDateInput = serde_json::from_str(r#""2025-09-15""#).unwrap();
        let parts: CalendarDateInput =
            serde_json::from_str(r#"{"year": 2025, "month": 9, "day": 15}"#).unwrap();
        assert_eq!(text.normalize(), NaiveDate::from_ymd_opt(2025, 9, 15));
        assert_eq!(parts.normalize(), NaiveDate::from_ymd_opt(2025, 9, 15));
    }
}
