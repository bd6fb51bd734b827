//! Human-friendly names for locations and services.

use std::collections::HashMap;

/// Looks up display names. A miss is not an error.
pub trait NameResolver: Send + Sync {
    /// Name of a location (company), if known.
    fn location_name(&self, id: u64) -> Option<&str>;

    /// Name of a service, if known.
    fn service_name(&self, id: u64) -> Option<&str>;
}

/// Static name tables.
#[derive(Debug, Clone, Default)]
pub struct StaticNames {
    locations: HashMap<u64, String>,
    services: HashMap<u64, String>,
}

impl StaticNames {
    /// Creates empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables with the names shipped with slotwatch.
    pub fn builtin() -> Self {
        Self::new()
            .with_location(780413, "Неваляшка")
            .with_service(15728488, "Город с инструктором")
    }

    /// Builder: add or replace a location name.
    pub fn with_location(mut self, id: u64, name: impl Into<String>) -> Self {
        self.locations.insert(id, name.into());
        self
    }

    /// Builder: add or replace a service name.
    pub fn with_service(mut self, id: u64, name: impl Into<String>) -> Self {
        self.services.insert(id, name.into());
        self
    }

    /// Merges entries from string-keyed maps (as read from configuration).
    ///
    /// Keys that are not numeric are ignored.
    pub fn extend_from(
        mut self,
        locations: &HashMap<String, String>,
        services: &HashMap<String, String>,
    ) -> Self {
        for (id, name) in locations {
            if let Ok(id) = id.trim().parse() {
                self.locations.insert(id, name.clone());
            }
        }
        for (id, name) in services {
            if let Ok(id) = id.trim().parse() {
                self.services.insert(id, name.clone());
            }
        }
        self
    }
}

impl NameResolver for StaticNames {
    fn location_name(&self, id: u64) -> Option<&str> {
        self.locations.get(&id).map(String::as_str)
    }

    fn service_name(&self, id: u64) -> Option<&str> {
        self.services.get(&id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names() {
        let names = StaticNames::builtin();
        assert_eq!(names.location_name(780413), Some("Неваляшка"));
        assert_eq!(names.service_name(15728488), Some("Город с инструктором"));
        assert_eq!(names.service_name(1), None);
    }

    #[test]
    fn extend_from_config_maps() {
        let mut locations = HashMap::new();
        locations.insert("42".to_string(), "Downtown".to_string());
        locations.insert("not-a-number".to_string(), "Ignored".to_string());
        let mut services = HashMap::new();
        services.insert(" 7 ".to_string(), "Lesson".to_string());

        let names = StaticNames::new().extend_from(&locations, &services);
        assert_eq!(names.location_name(42), Some("Downtown"));
        assert_eq!(names.service_name(7), Some("Lesson"));
    }
}
