use jiff::{SignedDuration, Timestamp};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Serialize, Clone, Copy, PartialEq, Eq, Default, JsonSchema)]
pub struct TimeWindow {
    start: Option<Timestamp>,
    end: Option<Timestamp>,
}

impl TimeWindow {
    pub fn new(start: Option<Timestamp>, end: Option<Timestamp>) -> Self {
        TimeWindow { start, end }
    }

    pub fn from_iso(start: Option<&str>, end: Option<&str>) -> Result<Self, jiff::Error> {
        let start = start.map(str::parse).transpose()?;
        let end = end.map(str::parse).transpose()?;
        Ok(TimeWindow { start, end })
    }

    pub fn start(&self) -> Option<Timestamp> {
        self.start
    }

    pub fn end(&self) -> Option<Timestamp> {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn is_satisfied(&self, arrival: Timestamp) -> bool {
        match self.end {
            Some(end) => arrival <= end,
            None => true,
        }
    }

    /// Earliest moment service can begin when arriving at `arrival`.
    pub fn service_start(&self, arrival: Timestamp) -> Timestamp {
        match self.start {
            Some(start) if start > arrival => start,
            _ => arrival,
        }
    }

    pub fn lateness(&self, service_start: Timestamp) -> SignedDuration {
        match self.end {
            Some(end) if service_start > end => service_start.duration_since(end),
            _ => SignedDuration::ZERO,
        }
    }
}

#[derive(Default)]
pub struct TimeWindowBuilder {
    start: Option<Timestamp>,
    end: Option<Timestamp>,
}

impl TimeWindowBuilder {
    pub fn with_start(mut self, start: Timestamp) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: Timestamp) -> Self {
        self.end = Some(end);
        self
    }

    pub fn build(self) -> TimeWindow {
        TimeWindow {
            start: self.start,
            end: self.end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let start: Timestamp = "2025-06-10T08:00:00+02:00".parse().unwrap();
        let end: Timestamp = "2025-06-10T10:00:00+02:00".parse().unwrap();
        let time_window = TimeWindowBuilder::default()
            .with_start(start)
            .with_end(end)
            .build();

        assert_eq!(time_window.start().unwrap(), start);
        assert_eq!(time_window.end().unwrap(), end);
    }

    #[test]
    fn test_from_iso_rejects_garbage() {
        assert!(TimeWindow::from_iso(Some("not a timestamp"), None).is_err());
    }

    #[test]
    fn test_waits_for_window_start() {
        let window = TimeWindow::from_iso(
            Some("2025-06-10T08:00:00Z"),
            Some("2025-06-10T10:00:00Z"),
        )
        .unwrap();
        let early: Timestamp = "2025-06-10T07:30:00Z".parse().unwrap();

        assert_eq!(window.service_start(early), window.start().unwrap());
        assert_eq!(window.lateness(window.service_start(early)), SignedDuration::ZERO);
    }

    #[test]
    fn test_lateness_after_window_end() {
        let window = TimeWindow::new(None, Some("2025-06-10T10:00:00Z".parse().unwrap()));
        let late: Timestamp = "2025-06-10T10:15:00Z".parse().unwrap();

        assert!(!window.is_satisfied(late));
        assert_eq!(window.lateness(late), SignedDuration::from_mins(15));
    }
}
