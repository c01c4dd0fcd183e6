use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use super::slot_time::{normalize_slot, slot_bounds};
use crate::errors::{AppError, AppResult};

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// One slot of a weekday template.
///
/// `is_booked`, `bound_booking_id` and `bound_date` cache whichever date last
/// bound the slot. The booking ledger stays authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlotDefinition {
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub is_booked: bool,
    #[serde(default)]
    pub bound_booking_id: Option<String>,
    #[serde(default)]
    pub bound_date: Option<NaiveDate>,
}

impl SlotDefinition {
    pub fn new(start_time: &str, end_time: &str, price: Option<f64>) -> AppResult<Self> {
        let (start_time, end_time) = normalize_slot(start_time, end_time)?;
        if let Some(p) = price {
            validate_price(p)?;
        }
        Ok(Self {
            start_time,
            end_time,
            price,
            is_booked: false,
            bound_booking_id: None,
            bound_date: None,
        })
    }

    pub fn bounds(&self) -> AppResult<(u32, u32)> {
        slot_bounds(&self.start_time, &self.end_time)
    }

    pub fn matches(&self, start_time: &str, end_time: &str) -> bool {
        self.start_time == start_time && self.end_time == end_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayTemplate {
    pub weekday: Weekday,
    pub is_open: bool,
    pub slots: Vec<SlotDefinition>,
}

impl DayTemplate {
    pub fn closed(weekday: Weekday) -> Self {
        Self {
            weekday,
            is_open: false,
            slots: Vec::new(),
        }
    }

    /// Normalize slot times and reject duplicate `(start, end)` pairs.
    pub fn validate(mut self) -> AppResult<Self> {
        let mut seen = HashSet::new();
        let mut slots = Vec::with_capacity(self.slots.len());
        for slot in self.slots {
            let normalized = SlotDefinition::new(&slot.start_time, &slot.end_time, slot.price)?;
            if !seen.insert((normalized.start_time.clone(), normalized.end_time.clone())) {
                return Err(AppError::Validation(format!(
                    "duplicate slot {}-{} on {}",
                    normalized.start_time, normalized.end_time, self.weekday
                )));
            }
            slots.push(normalized);
        }
        self.slots = slots;
        Ok(self)
    }

    pub fn find_slot(&self, start_time: &str, end_time: &str) -> Option<&SlotDefinition> {
        self.slots.iter().find(|s| s.matches(start_time, end_time))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turf {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub base_price: f64,
    pub advance_booking_days: i64,
    pub days: Vec<DayTemplate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Turf {
    pub fn day(&self, weekday: Weekday) -> Option<&DayTemplate> {
        self.days.iter().find(|d| d.weekday == weekday)
    }

    /// Price per hour for a slot: the slot's own price, else the base price.
    pub fn resolve_price(&self, slot: &SlotDefinition) -> f64 {
        slot.price.unwrap_or(self.base_price)
    }
}

/// Owner-supplied weekly template, keyed by weekday name.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WeekTemplate {
    #[serde(default)]
    pub days: Vec<DayTemplate>,
}

impl WeekTemplate {
    pub fn from_json(s: &str) -> AppResult<Self> {
        let template: WeekTemplate = serde_json::from_str(s)
            .map_err(|e| AppError::Validation(format!("invalid template: {e}")))?;
        template.validate()
    }

    /// Validate every day and fill missing weekdays as closed.
    pub fn validate(self) -> AppResult<Self> {
        let mut days = Vec::with_capacity(7);
        for weekday in WEEKDAYS {
            let mut matching = self.days.iter().filter(|d| d.weekday == weekday);
            let day = matching.next().cloned();
            if matching.next().is_some() {
                return Err(AppError::Validation(format!(
                    "weekday {weekday} appears more than once"
                )));
            }
            days.push(day.unwrap_or_else(|| DayTemplate::closed(weekday)).validate()?);
        }
        Ok(Self { days })
    }
}

pub fn weekday_index(weekday: Weekday) -> u8 {
    weekday.num_days_from_monday() as u8
}

pub fn weekday_from_index(index: u8) -> AppResult<Weekday> {
    WEEKDAYS
        .get(index as usize)
        .copied()
        .ok_or_else(|| AppError::Validation(format!("invalid weekday index: {index}")))
}

pub fn parse_weekday(s: &str) -> AppResult<Weekday> {
    s.trim()
        .parse::<Weekday>()
        .map_err(|_| AppError::Validation(format!("invalid weekday: {s}")))
}

pub fn validate_price(price: f64) -> AppResult<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::Validation(format!("invalid price: {price}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_json() {
        let json = r#"{"days":[{"weekday":"mon","is_open":true,"slots":[{"start_time":"6 pm","end_time":"7 pm","price":800}]}]}"#;
        let template = WeekTemplate::from_json(json).unwrap();
        assert_eq!(template.days.len(), 7);

        let monday = &template.days[0];
        assert_eq!(monday.weekday, Weekday::Mon);
        assert!(monday.is_open);
        assert_eq!(monday.slots[0].start_time, "18:00");
        assert_eq!(monday.slots[0].end_time, "19:00");
        assert_eq!(monday.slots[0].price, Some(800.0));

        assert!(!template.days[6].is_open);
        assert!(template.days[6].slots.is_empty());
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(WeekTemplate::from_json("not json").is_err());
    }

    #[test]
    fn test_duplicate_slot_rejected() {
        let json = r#"{"days":[{"weekday":"tue","is_open":true,"slots":[
            {"start_time":"18:00","end_time":"19:00"},
            {"start_time":"6pm","end_time":"7pm"}
        ]}]}"#;
        let err = WeekTemplate::from_json(json).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_duplicate_weekday_rejected() {
        let json = r#"{"days":[
            {"weekday":"mon","is_open":true,"slots":[]},
            {"weekday":"Monday","is_open":false,"slots":[]}
        ]}"#;
        assert!(WeekTemplate::from_json(json).is_err());
    }

    #[test]
    fn test_negative_price_rejected() {
        assert!(SlotDefinition::new("18:00", "19:00", Some(-1.0)).is_err());
        assert!(SlotDefinition::new("18:00", "19:00", Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_resolve_price_falls_back_to_base() {
        let now = chrono::Utc::now().naive_utc();
        let turf = Turf {
            id: "t1".into(),
            owner_id: "o1".into(),
            name: "Field".into(),
            base_price: 600.0,
            advance_booking_days: 30,
            days: vec![],
            created_at: now,
            updated_at: now,
        };
        let priced = SlotDefinition::new("18:00", "19:00", Some(800.0)).unwrap();
        let unpriced = SlotDefinition::new("19:00", "20:00", None).unwrap();
        assert_eq!(turf.resolve_price(&priced), 800.0);
        assert_eq!(turf.resolve_price(&unpriced), 600.0);
    }

    #[test]
    fn test_weekday_index_roundtrip() {
        for (i, day) in WEEKDAYS.iter().enumerate() {
            assert_eq!(weekday_index(*day) as usize, i);
            assert_eq!(weekday_from_index(i as u8).unwrap(), *day);
        }
        assert!(weekday_from_index(7).is_err());
        assert_eq!(parse_weekday("friday").unwrap(), Weekday::Fri);
    }
}
