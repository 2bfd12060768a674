// 🧾 Expense Entity - a single tracked transaction
//
// The record is a plain value: id is identity (assigned once, never changes),
// everything else is replaced wholesale on update.

use chrono::{Datelike, DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CATEGORY
// ============================================================================

/// Fixed set of categories offered by the entry form.
///
/// The store itself keeps `Expense::category` as free text, so values outside
/// this set survive a save/load cycle untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Food,
    Transportation,
    Entertainment,
    Utilities,
    Shopping,
    Healthcare,
    Education,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Food,
        Category::Transportation,
        Category::Entertainment,
        Category::Utilities,
        Category::Shopping,
        Category::Healthcare,
        Category::Education,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Transportation => "Transportation",
            Category::Entertainment => "Entertainment",
            Category::Utilities => "Utilities",
            Category::Shopping => "Shopping",
            Category::Healthcare => "Healthcare",
            Category::Education => "Education",
            Category::Other => "Other",
        }
    }

    /// Position in `ALL`, used to cycle through categories in the form.
    pub fn index(&self) -> usize {
        Category::ALL
            .iter()
            .position(|c| c == self)
            .unwrap_or(Category::ALL.len() - 1)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown category: {}", wanted))
    }
}

// ============================================================================
// EXPENSE
// ============================================================================

/// Expense record as held by the store and written to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,

    /// Non-finite values are written as "NaN" / "Infinity" / "-Infinity".
    #[serde(with = "amount_format")]
    pub amount: f64,
    pub description: String,
    pub category: String,

    /// Decoded leniently (RFC 3339, `YYYY-MM-DD`, or epoch millis) and written
    /// back as an RFC 3339 UTC timestamp, or as epoch millis outside years
    /// 0000..=9999.
    #[serde(with = "date_format")]
    pub date: DateTime<Utc>,
}

impl Expense {
    pub fn new(
        id: impl Into<String>,
        amount: f64,
        description: impl Into<String>,
        category: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Expense {
            id: id.into(),
            amount,
            description: description.into(),
            category: category.into(),
            date,
        }
    }

    /// Same record with the date cut to the millisecond precision storage keeps.
    pub fn normalized(mut self) -> Self {
        self.date = self.date.trunc_subsecs(3);
        self
    }

    /// Calendar day of the expense (UTC).
    pub fn day(&self) -> NaiveDate {
        self.date.date_naive()
    }

    /// The category as a known `Category`, if it is one.
    pub fn known_category(&self) -> Option<Category> {
        self.category.parse().ok()
    }
}

/// Fresh identifier for a newly created record.
pub fn new_expense_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Midnight UTC on the given day.
pub fn midnight_utc(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn seed_date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, day)
        .map(midnight_utc)
        .unwrap_or_default()
}

/// Sample records used when nothing has been saved yet or the saved blob is
/// unusable.
pub fn seed_expenses() -> Vec<Expense> {
    vec![
        Expense::new("1", 45.99, "Grocery shopping", "Food", seed_date(2024, 4, 25)),
        Expense::new("2", 10.5, "Movie ticket", "Entertainment", seed_date(2024, 4, 24)),
        Expense::new("3", 28.75, "Gas", "Transportation", seed_date(2024, 4, 23)),
        Expense::new("4", 120.0, "Electricity bill", "Utilities", seed_date(2024, 4, 22)),
        Expense::new("5", 65.3, "New t-shirt", "Shopping", seed_date(2024, 4, 21)),
    ]
}

// ============================================================================
// DATE ENCODING
// ============================================================================

/// Parse the textual date forms accepted on input.
pub fn parse_date(text: &str) -> Result<DateTime<Utc>, String> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(day) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(midnight_utc(day));
    }

    Err(format!("Invalid date: {:?}", text))
}

pub mod date_format {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDate {
        Millis(i64),
        FractionalMillis(f64),
        Text(String),
    }

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // RFC 3339 only has four-digit years
        if (0..=9999).contains(&date.year()) {
            serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true))
        } else {
            serializer.serialize_i64(date.timestamp_millis())
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawDate::deserialize(deserializer)?;
        let millis = match raw {
            RawDate::Text(text) => return parse_date(&text).map_err(serde::de::Error::custom),
            RawDate::Millis(ms) => ms,
            RawDate::FractionalMillis(ms) if ms.is_finite() => ms.trunc() as i64,
            RawDate::FractionalMillis(ms) => {
                return Err(serde::de::Error::custom(format!("Invalid timestamp: {}", ms)))
            }
        };

        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| serde::de::Error::custom(format!("Timestamp out of range: {}", millis)))
    }
}

pub mod amount_format {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if amount.is_nan() {
            serializer.serialize_str("NaN")
        } else if amount.is_infinite() && *amount > 0.0 {
            serializer.serialize_str("Infinity")
        } else if amount.is_infinite() {
            serializer.serialize_str("-Infinity")
        } else {
            serializer.serialize_f64(*amount)
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        // `null` is what plain JSON encoders emit for non-finite numbers
        match Option::<RawAmount>::deserialize(deserializer)? {
            None => Ok(f64::NAN),
            Some(RawAmount::Number(amount)) => Ok(amount),
            Some(RawAmount::Text(text)) => match text.trim() {
                "NaN" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                other => other
                    .parse::<f64>()
                    .map_err(|_| serde::de::Error::custom(format!("Invalid amount: {:?}", other))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_seed_set_has_five_records() {
        let seed = seed_expenses();

        assert_eq!(seed.len(), 5);
        let ids: Vec<&str> = seed.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
        assert_eq!(seed[0].description, "Grocery shopping");
        assert_eq!(seed[0].day(), NaiveDate::from_ymd_opt(2024, 4, 25).unwrap());
        assert_eq!(seed[4].amount, 65.3);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("food".parse::<Category>(), Ok(Category::Food));
        assert_eq!(" Healthcare ".parse::<Category>(), Ok(Category::Healthcare));
        assert!("Groceries".parse::<Category>().is_err());

        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
            assert_eq!(Category::ALL[category.index()], category);
        }
    }

    #[test]
    fn test_date_serialized_as_rfc3339_millis() {
        let expense = Expense::new(
            "x",
            12.5,
            "Coffee",
            "Food",
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        );

        let json = serde_json::to_value(&expense).unwrap();
        assert_eq!(json["date"], "2024-05-01T00:00:00.000Z");
        assert_eq!(json["amount"], 12.5);
        assert_eq!(json["category"], "Food");
    }

    #[test]
    fn test_date_decoding_is_lenient() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

        for raw in [
            r#""2024-05-01T00:00:00.000Z""#,
            r#""2024-05-01T02:00:00+02:00""#,
            r#""2024-05-01""#,
            r#""2024-05-01T00:00:00""#,
            "1714521600000",
            "1714521600000.0",
        ] {
            let json = format!(
                r#"{{"id":"x","amount":1.0,"description":"abc","category":"Food","date":{}}}"#,
                raw
            );
            let expense: Expense = serde_json::from_str(&json).unwrap();
            assert_eq!(expense.date, expected, "input {}", raw);
        }
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        let json = r#"{"id":"x","amount":1.0,"description":"abc","category":"Food","date":"yesterday"}"#;
        assert!(serde_json::from_str::<Expense>(json).is_err());

        let json = r#"{"id":"x","amount":1.0,"description":"abc","category":"Food","date":true}"#;
        assert!(serde_json::from_str::<Expense>(json).is_err());
    }

    #[test]
    fn test_unknown_category_round_trips() {
        let expense = Expense::new("q", 3.0, "Mystery", "Pets", seed_date(2024, 1, 2));
        assert_eq!(expense.known_category(), None);

        let json = serde_json::to_string(&expense).unwrap();
        let back: Expense = serde_json::from_str(&json).unwrap();
        assert_eq!(back, expense);
    }

    #[test]
    fn test_non_finite_amounts_round_trip() {
        for amount in [f64::INFINITY, f64::NEG_INFINITY] {
            let expense = Expense::new("q", amount, "Odd", "Food", seed_date(2024, 1, 2));
            let json = serde_json::to_string(&expense).unwrap();
            let back: Expense = serde_json::from_str(&json).unwrap();
            assert_eq!(back, expense);
        }

        let expense = Expense::new("q", f64::NAN, "Odd", "Food", seed_date(2024, 1, 2));
        let json = serde_json::to_value(&expense).unwrap();
        assert_eq!(json["amount"], "NaN");
        let back: Expense = serde_json::from_value(json).unwrap();
        assert!(back.amount.is_nan());

        let json = r#"{"id":"q","amount":null,"description":"abc","category":"Food","date":"2024-01-02"}"#;
        assert!(serde_json::from_str::<Expense>(json).unwrap().amount.is_nan());
    }

    #[test]
    fn test_years_beyond_rfc3339_round_trip() {
        let far = NaiveDate::from_ymd_opt(10000, 1, 1).map(midnight_utc).unwrap();
        let ancient = NaiveDate::from_ymd_opt(-5, 6, 7).map(midnight_utc).unwrap();

        for date in [far, ancient] {
            let expense = Expense::new("q", 1.0, "Odd", "Food", date);
            let json = serde_json::to_value(&expense).unwrap();
            assert!(json["date"].is_i64());
            let back: Expense = serde_json::from_value(json).unwrap();
            assert_eq!(back.date, date);
        }
    }

    #[test]
    fn test_normalized_drops_sub_millisecond_precision() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
            + chrono::Duration::microseconds(1234);
        let expense = Expense::new("q", 1.0, "Odd", "Food", date).normalized();

        assert_eq!(expense.date.timestamp_subsec_micros(), 1000);
        let json = serde_json::to_string(&expense).unwrap();
        assert_eq!(serde_json::from_str::<Expense>(&json).unwrap(), expense);
    }

    #[test]
    fn test_new_ids_are_unique() {
        assert_ne!(new_expense_id(), new_expense_id());
    }
}
